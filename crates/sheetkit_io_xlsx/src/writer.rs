//! Worksheet writer that renders record slices into a workbook.
//!
//! Sheets are declared with [`SheetBuilder`] and collected by [`XlsxWriter`];
//! nothing touches the workbook until [`XlsxWriter::materialize`].

use std::collections::BTreeMap;
use std::path::Path;
use std::rc::Rc;

use chrono::Timelike;
use log::{debug, warn};
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook, Worksheet};

use crate::binding::{RecordSchema, SheetRecord};
use crate::coerce::IntoCellValue;
use crate::conf::{C_NUM_FORMAT_DATE, C_NUM_FORMAT_DATETIME, EnumFmtKey, derive_default_xlsx_format};
use crate::error::{XlsxMapError, XlsxMapResult};
use crate::spec::{
    EnumAutofitColumnsRule, EnumCellValue, EnumColumnPostRender, SpecAutofitCellsPolicy,
    SpecCellFormat, SpecSheetReport, SpecSheetStyle,
};
use crate::util::{cast_col_num, cast_row_num, estimate_unicode_string_width, sanitize_sheet_name};

////////////////////////////////////////////////////////////////////////////////
// #region ColumnSpecification

type FnCellSelector<'a, T> = Box<dyn Fn(&T) -> EnumCellValue + 'a>;
type FnRecordFormat<'a, T> = Box<dyn Fn(&T) -> SpecCellFormat + 'a>;

/// One rendered column: header text, value selector and format hooks.
pub struct SpecColumnRender<'a, T> {
    header: String,
    selector: FnCellSelector<'a, T>,
    fmt_header: Option<SpecCellFormat>,
    fmt_cell: Option<SpecCellFormat>,
    fmt_cell_by_record: Option<FnRecordFormat<'a, T>>,
    l_post_render: Vec<EnumColumnPostRender>,
}

impl<'a, T> SpecColumnRender<'a, T> {
    /// Column rendering `selector(record)` under `header`.
    pub fn new<V, F>(header: impl Into<String>, selector: F) -> Self
    where
        V: IntoCellValue,
        F: Fn(&T) -> V + 'a,
    {
        Self::from_cell_selector(header, move |record: &T| selector(record).to_cell_value())
    }

    /// Column from a selector that already yields cell values.
    pub fn from_cell_selector(
        header: impl Into<String>,
        selector: impl Fn(&T) -> EnumCellValue + 'a,
    ) -> Self {
        Self {
            header: header.into(),
            selector: Box::new(selector),
            fmt_header: None,
            fmt_cell: None,
            fmt_cell_by_record: None,
            l_post_render: Vec::new(),
        }
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    /// Header cell format, applied over the sheet-level header format.
    pub fn with_header_format(mut self, fmt: SpecCellFormat) -> Self {
        self.fmt_header = Some(fmt);
        self
    }

    /// Data cell format, applied over the sheet-level cell format.
    pub fn with_cell_format(mut self, fmt: SpecCellFormat) -> Self {
        self.fmt_cell = Some(fmt);
        self
    }

    /// Conditional data cell format computed per record, applied last.
    pub fn with_cell_format_by(mut self, fmt_by: impl Fn(&T) -> SpecCellFormat + 'a) -> Self {
        self.fmt_cell_by_record = Some(Box::new(fmt_by));
        self
    }

    /// Fit width to content after all rows are written.
    pub fn autofit(mut self, policy: SpecAutofitCellsPolicy) -> Self {
        self.l_post_render.push(EnumColumnPostRender::Autofit(policy));
        self
    }

    /// Fixed width in character units.
    pub fn with_width(mut self, width: f64) -> Self {
        self.l_post_render.push(EnumColumnPostRender::Width(width));
        self
    }

    pub fn hidden(mut self) -> Self {
        self.l_post_render.push(EnumColumnPostRender::Hidden);
        self
    }
}

/// One merged title row above the header.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecTitleRow {
    /// Title text.
    pub text: String,
    /// Row format, applied over the sheet-level title format.
    pub fmt: Option<SpecCellFormat>,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetBuilder

/// Fluent declaration of one worksheet.
pub struct SheetBuilder<'a, T> {
    name: String,
    rows: &'a [T],
    l_columns: Vec<SpecColumnRender<'a, T>>,
    l_columns_auto: Vec<SpecColumnRender<'a, T>>,
    l_titles: Vec<SpecTitleRow>,
    if_header_row: bool,
    if_freeze_header: bool,
    style: SpecSheetStyle,
}

impl<'a, T> SheetBuilder<'a, T> {
    /// Sheet with explicit columns only.
    pub fn new(name: impl Into<String>, rows: &'a [T]) -> Self {
        Self {
            name: name.into(),
            rows,
            l_columns: Vec::new(),
            l_columns_auto: Vec::new(),
            l_titles: Vec::new(),
            if_header_row: true,
            if_freeze_header: false,
            style: SpecSheetStyle::default(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Append an explicit column. Explicit columns replace auto-generated ones.
    pub fn with_column<V, F>(self, header: impl Into<String>, selector: F) -> Self
    where
        V: IntoCellValue,
        F: Fn(&T) -> V + 'a,
    {
        self.with_column_spec(SpecColumnRender::new(header, selector))
    }

    /// Append a fully specified column.
    pub fn with_column_spec(mut self, column: SpecColumnRender<'a, T>) -> Self {
        self.l_columns.push(column);
        self
    }

    /// Append a title row.
    pub fn with_title(self, text: impl Into<String>) -> Self {
        self.with_title_row(SpecTitleRow {
            text: text.into(),
            fmt: None,
        })
    }

    /// Append a title row with its own format.
    pub fn with_title_formatted(self, text: impl Into<String>, fmt: SpecCellFormat) -> Self {
        self.with_title_row(SpecTitleRow {
            text: text.into(),
            fmt: Some(fmt),
        })
    }

    pub fn with_title_row(mut self, title: SpecTitleRow) -> Self {
        self.l_titles.push(title);
        self
    }

    /// Do not render the header row.
    pub fn without_header_row(mut self) -> Self {
        self.if_header_row = false;
        self
    }

    /// Sheet-level header cell format.
    pub fn with_header_format(mut self, fmt: SpecCellFormat) -> Self {
        self.style.fmt_header = Some(fmt);
        self
    }

    /// Custom header-row format. Disables the header auto-filter.
    pub fn with_header_row_format(mut self, fmt: SpecCellFormat) -> Self {
        self.style.fmt_header_row = Some(fmt);
        self
    }

    /// Sheet-level data cell format.
    pub fn with_cell_format(mut self, fmt: SpecCellFormat) -> Self {
        self.style.fmt_cell = Some(fmt);
        self
    }

    /// Sheet-level title format.
    pub fn with_title_format(mut self, fmt: SpecCellFormat) -> Self {
        self.style.fmt_title = Some(fmt);
        self
    }

    /// Freeze the rows down to and including the header.
    pub fn with_freeze_header(mut self) -> Self {
        self.if_freeze_header = true;
        self
    }

    /// Autofit every column that declares no post-render hook of its own.
    pub fn with_autofit_columns(mut self, policy: SpecAutofitCellsPolicy) -> Self {
        self.style.policy_autofit = Some(policy);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn columns(&self) -> &[SpecColumnRender<'a, T>] {
        if self.l_columns.is_empty() {
            &self.l_columns_auto
        } else {
            &self.l_columns
        }
    }
}

impl<'a, T: SheetRecord> SheetBuilder<'a, T> {
    /// Sheet named after `T`'s schema, one auto-generated column per field.
    pub fn from_records(rows: &'a [T]) -> XlsxMapResult<Self> {
        let schema = Rc::new(T::schema()?);
        let mut builder = Self::new(schema.sheet_name(), rows);
        builder.l_columns_auto = derive_auto_columns(&schema);
        Ok(builder)
    }
}

impl<T: SheetRecord> SheetBuilder<'static, T> {
    /// Header-only template sheet for `T`.
    pub fn template() -> XlsxMapResult<Self> {
        Self::from_records(&[])
    }
}

fn derive_auto_columns<'a, T: 'static>(schema: &Rc<RecordSchema<T>>) -> Vec<SpecColumnRender<'a, T>> {
    schema
        .fields()
        .iter()
        .enumerate()
        .map(|(n_idx_field, field)| {
            let schema_field = Rc::clone(schema);
            SpecColumnRender::from_cell_selector(field.header_text(), move |record: &T| {
                schema_field.fields()[n_idx_field].extract(record)
            })
        })
        .collect()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Rendering

trait RenderSheet {
    fn style(&self) -> &SpecSheetStyle;

    fn render(&self, workbook: &mut Workbook, style: &SpecSheetStyle) -> XlsxMapResult<SpecSheetReport>;
}

impl<T> RenderSheet for SheetBuilder<'_, T> {
    fn style(&self) -> &SpecSheetStyle {
        &self.style
    }

    fn render(&self, workbook: &mut Workbook, style: &SpecSheetStyle) -> XlsxMapResult<SpecSheetReport> {
        let l_columns = self.columns();
        let n_cols = l_columns.len();
        if n_cols == 0 {
            return Err(XlsxMapError::Configuration(format!(
                "sheet '{}' has no columns",
                self.name
            )));
        }

        let c_sheet_name = sanitize_sheet_name(&self.name, "_");
        let mut report = SpecSheetReport {
            sheet_name: c_sheet_name.clone(),
            n_rows_title: self.l_titles.len(),
            n_rows_data: self.rows.len(),
            n_cols,
            ..Default::default()
        };
        if c_sheet_name != self.name {
            let msg = format!("sheet name '{}' was sanitized to '{c_sheet_name}'", self.name);
            warn!("{msg}");
            report.warn(msg);
        }

        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&c_sheet_name)?;
        let n_col_last = cast_col_num(n_cols - 1)?;

        // Titles.
        let fmt_title_sheet =
            derive_default_xlsx_format(EnumFmtKey::Title).merge_opt(style.fmt_title.as_ref());
        for (n_row, title) in self.l_titles.iter().enumerate() {
            let fmt = derive_rust_xlsx_format(&fmt_title_sheet.merge_opt(title.fmt.as_ref()));
            let n_row_xl = cast_row_num(n_row)?;
            if n_cols > 1 {
                worksheet.merge_range(n_row_xl, 0, n_row_xl, n_col_last, &title.text, &fmt)?;
            } else {
                worksheet.write_string_with_format(n_row_xl, 0, &title.text, &fmt)?;
            }
        }
        let mut n_row = self.l_titles.len();

        // Header.
        let mut l_width_header = vec![0usize; n_cols];
        if self.if_header_row {
            let fmt_header_sheet = derive_default_xlsx_format(EnumFmtKey::Header)
                .merge_opt(style.fmt_header.as_ref())
                .merge_opt(style.fmt_header_row.as_ref());
            for (n_col, column) in l_columns.iter().enumerate() {
                let fmt = derive_rust_xlsx_format(&fmt_header_sheet.merge_opt(column.fmt_header.as_ref()));
                worksheet.write_string_with_format(
                    cast_row_num(n_row)?,
                    cast_col_num(n_col)?,
                    &column.header,
                    &fmt,
                )?;
                l_width_header[n_col] = estimate_unicode_string_width(&column.header);
            }
            report.row_header = Some(n_row);
            n_row += 1;
        }
        report.row_data_start = n_row;

        // Data.
        let fmt_cell_sheet =
            derive_default_xlsx_format(EnumFmtKey::Text).merge_opt(style.fmt_cell.as_ref());
        let l_fmt_spec_by_col: Vec<SpecCellFormat> = l_columns
            .iter()
            .map(|column| fmt_cell_sheet.merge_opt(column.fmt_cell.as_ref()))
            .collect();
        let l_fmt_by_col: Vec<SpecColumnFormats> = l_fmt_spec_by_col
            .iter()
            .map(SpecColumnFormats::from_spec)
            .collect();
        let l_policy_autofit: Vec<Option<SpecAutofitCellsPolicy>> = l_columns
            .iter()
            .map(|column| derive_autofit_policy(column, style))
            .collect::<XlsxMapResult<_>>()?;

        let mut l_width_body = vec![0usize; n_cols];
        for (n_row_local, record) in self.rows.iter().enumerate() {
            let n_row_xl = cast_row_num(n_row + n_row_local)?;
            for (n_col, column) in l_columns.iter().enumerate() {
                let value = (column.selector)(record);
                let n_col_xl = cast_col_num(n_col)?;

                if let Some(policy) = &l_policy_autofit[n_col]
                    && policy
                        .height_body_inferred_max
                        .is_none_or(|n_max| n_row_local < n_max)
                {
                    l_width_body[n_col] = usize::max(l_width_body[n_col], estimate_width_len(&value));
                }

                match &column.fmt_cell_by_record {
                    Some(fmt_by) => {
                        let fmt_spec = l_fmt_spec_by_col[n_col].merge(&fmt_by(record));
                        let fmt_record = SpecColumnFormats::from_spec(&fmt_spec);
                        write_cell_with_format(worksheet, n_row_xl, n_col_xl, &value, &fmt_record)?;
                    }
                    None => {
                        write_cell_with_format(worksheet, n_row_xl, n_col_xl, &value, &l_fmt_by_col[n_col])?;
                    }
                }
            }
        }

        if let Some(n_row_header) = report.row_header {
            if style.fmt_header_row.is_none() {
                worksheet.autofilter(
                    cast_row_num(n_row_header)?,
                    0,
                    cast_row_num(n_row_header + self.rows.len())?,
                    n_col_last,
                )?;
                report.if_autofilter = true;
            }
            if self.if_freeze_header {
                worksheet.set_freeze_panes(cast_row_num(n_row_header + 1)?, 0)?;
            }
        }

        // Post-render hooks.
        for (n_col, column) in l_columns.iter().enumerate() {
            let n_col_xl = cast_col_num(n_col)?;
            if let Some(policy) = &l_policy_autofit[n_col] {
                let n_width = derive_autofit_width(policy, l_width_header[n_col], l_width_body[n_col]);
                worksheet.set_column_width(n_col_xl, n_width as f64)?;
                report.n_cols_autofit += 1;
            }
            for hook in &column.l_post_render {
                match hook {
                    EnumColumnPostRender::Autofit(_) => {}
                    EnumColumnPostRender::Width(width) => {
                        worksheet.set_column_width(n_col_xl, *width)?;
                    }
                    EnumColumnPostRender::Hidden => {
                        worksheet.set_column_hidden(n_col_xl)?;
                    }
                }
            }
        }

        debug!(
            "rendered sheet '{}': {} title row(s), {} data row(s), {} column(s)",
            report.sheet_name, report.n_rows_title, report.n_rows_data, report.n_cols
        );
        Ok(report)
    }
}

/// Column-level autofit wins; the sheet-level policy covers hook-less columns.
fn derive_autofit_policy<T>(
    column: &SpecColumnRender<'_, T>,
    style: &SpecSheetStyle,
) -> XlsxMapResult<Option<SpecAutofitCellsPolicy>> {
    let policy = column
        .l_post_render
        .iter()
        .find_map(|hook| match hook {
            EnumColumnPostRender::Autofit(policy) => Some(policy.clone()),
            _ => None,
        })
        .or_else(|| {
            if column.l_post_render.is_empty() {
                style.policy_autofit.clone()
            } else {
                None
            }
        });
    if let Some(policy) = &policy {
        validate_policy_autofit(policy)?;
    }
    Ok(policy)
}

/// Plain and date formats of one column.
struct SpecColumnFormats {
    fmt: Format,
    fmt_datetime: Format,
    fmt_date: Format,
}

impl SpecColumnFormats {
    fn from_spec(spec: &SpecCellFormat) -> Self {
        let derive_with_num_format = |c_num_format: &str| {
            if spec.num_format.is_some() {
                derive_rust_xlsx_format(spec)
            } else {
                derive_rust_xlsx_format(&spec.with_(SpecCellFormat {
                    num_format: Some(c_num_format.to_string()),
                    ..Default::default()
                }))
            }
        };
        Self {
            fmt: derive_rust_xlsx_format(spec),
            fmt_datetime: derive_with_num_format(C_NUM_FORMAT_DATETIME),
            fmt_date: derive_with_num_format(C_NUM_FORMAT_DATE),
        }
    }
}

fn write_cell_with_format(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &EnumCellValue,
    formats: &SpecColumnFormats,
) -> XlsxMapResult<()> {
    match value {
        EnumCellValue::None => {
            worksheet.write_blank(row, col, &formats.fmt)?;
        }
        EnumCellValue::String(val) | EnumCellValue::Error(val) => {
            worksheet.write_string_with_format(row, col, val, &formats.fmt)?;
        }
        EnumCellValue::Number(val) => {
            worksheet.write_number_with_format(row, col, *val, &formats.fmt)?;
        }
        EnumCellValue::Integer(val) => {
            worksheet.write_number_with_format(row, col, *val as f64, &formats.fmt)?;
        }
        EnumCellValue::Boolean(val) => {
            worksheet.write_boolean_with_format(row, col, *val, &formats.fmt)?;
        }
        EnumCellValue::DateTime(val) => {
            let fmt = if val.num_seconds_from_midnight() == 0 && val.nanosecond() == 0 {
                &formats.fmt_date
            } else {
                &formats.fmt_datetime
            };
            worksheet.write_datetime_with_format(row, col, val, fmt)?;
        }
    }
    Ok(())
}

/// Estimate displayed width units for one cell value.
pub fn estimate_width_len(value: &EnumCellValue) -> usize {
    match value {
        EnumCellValue::None => 0,
        EnumCellValue::String(s) | EnumCellValue::Error(s) => estimate_unicode_string_width(s),
        EnumCellValue::Number(n) => {
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{n:.0}").len()
            } else {
                format!("{n:.4}").len()
            }
        }
        EnumCellValue::Integer(n) => n.to_string().len(),
        EnumCellValue::Boolean(b) => {
            if *b {
                4
            } else {
                5
            }
        }
        EnumCellValue::DateTime(_) => value.to_string().len(),
    }
}

fn derive_autofit_width(policy: &SpecAutofitCellsPolicy, n_width_header: usize, n_width_body: usize) -> usize {
    let n_min = usize::max(1, policy.width_cell_min);
    let n_max = usize::min(255, usize::max(n_min, policy.width_cell_max));
    let n_width_recorded = match policy.rule_columns {
        EnumAutofitColumnsRule::Header => n_width_header,
        EnumAutofitColumnsRule::Body => n_width_body,
        EnumAutofitColumnsRule::All => usize::max(n_width_header, n_width_body),
    };
    usize::min(n_max, usize::max(n_min, n_width_recorded + policy.width_cell_padding))
}

fn validate_policy_autofit(policy_autofit: &SpecAutofitCellsPolicy) -> XlsxMapResult<()> {
    if policy_autofit.width_cell_min == 0 {
        return Err(XlsxMapError::Configuration(
            "policy_autofit.width_cell_min must be >= 1.".to_string(),
        ));
    }
    if policy_autofit.width_cell_max < policy_autofit.width_cell_min {
        return Err(XlsxMapError::Configuration(
            "policy_autofit.width_cell_max must be >= policy_autofit.width_cell_min.".to_string(),
        ));
    }
    Ok(())
}

fn derive_rust_xlsx_format(spec: &SpecCellFormat) -> Format {
    let mut format = Format::new();

    if let Some(val) = &spec.font_name {
        format = format.set_font_name(val.clone());
    }
    if let Some(val) = spec.font_size {
        format = format.set_font_size(val as f64);
    }
    if spec.bold.unwrap_or(false) {
        format = format.set_bold();
    }
    if spec.italic.unwrap_or(false) {
        format = format.set_italic();
    }

    if let Some(val) = &spec.align
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }
    if let Some(val) = &spec.valign
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }

    if let Some(val) = &spec.num_format {
        format = format.set_num_format(val.clone());
    }
    if let Some(val) = &spec.bg_color {
        format = format.set_background_color(val.as_str());
    }
    if let Some(val) = &spec.font_color {
        format = format.set_font_color(val.as_str());
    }

    if let Some(val) = spec.border {
        format = format.set_border(derive_format_border(val));
    }
    for (side, setter) in [
        (spec.top, Format::set_border_top as fn(Format, FormatBorder) -> Format),
        (spec.bottom, Format::set_border_bottom),
        (spec.left, Format::set_border_left),
        (spec.right, Format::set_border_right),
    ] {
        if let Some(val) = side {
            format = setter(format, derive_format_border(val));
        }
    }

    if spec.text_wrap.unwrap_or(false) {
        format = format.set_text_wrap();
    }

    format
}

fn derive_format_border(border: i64) -> FormatBorder {
    match border {
        1 => FormatBorder::Thin,
        2 => FormatBorder::Medium,
        3 => FormatBorder::Dashed,
        4 => FormatBorder::Dotted,
        5 => FormatBorder::Thick,
        6 => FormatBorder::Double,
        7 => FormatBorder::Hair,
        8 => FormatBorder::MediumDashed,
        9 => FormatBorder::DashDot,
        10 => FormatBorder::MediumDashDot,
        11 => FormatBorder::DashDotDot,
        12 => FormatBorder::MediumDashDotDot,
        13 => FormatBorder::SlantDashDot,
        _ => FormatBorder::None,
    }
}

fn derive_format_align(align: &str) -> Option<FormatAlign> {
    match align.trim().to_ascii_lowercase().as_str() {
        "general" => Some(FormatAlign::General),
        "left" => Some(FormatAlign::Left),
        "center" => Some(FormatAlign::Center),
        "right" => Some(FormatAlign::Right),
        "fill" => Some(FormatAlign::Fill),
        "justify" => Some(FormatAlign::Justify),
        "center_across" => Some(FormatAlign::CenterAcross),
        "distributed" => Some(FormatAlign::Distributed),
        "top" => Some(FormatAlign::Top),
        "bottom" => Some(FormatAlign::Bottom),
        "vcenter" | "vertical_center" => Some(FormatAlign::VerticalCenter),
        "vjustify" | "vertical_justify" => Some(FormatAlign::VerticalJustify),
        "vdistributed" | "vertical_distributed" => Some(FormatAlign::VerticalDistributed),
        _ => None,
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Workbook

/// Workbook builder collecting sheet declarations in order.
///
/// Each sheet inherits the header, cell and title formats of the previous
/// sheet unless it sets its own. Named styles start with the `Text`,
/// `Header`, `Title` and `DateTime` presets.
pub struct XlsxWriter<'a> {
    l_sheets: Vec<Box<dyn RenderSheet + 'a>>,
    map_styles: BTreeMap<String, SpecCellFormat>,
}

impl Default for XlsxWriter<'_> {
    fn default() -> Self {
        let map_styles = [
            ("Text", EnumFmtKey::Text),
            ("Header", EnumFmtKey::Header),
            ("Title", EnumFmtKey::Title),
            ("DateTime", EnumFmtKey::DateTime),
        ]
        .into_iter()
        .map(|(name, key)| (name.to_string(), derive_default_xlsx_format(key)))
        .collect();
        Self {
            l_sheets: Vec::new(),
            map_styles,
        }
    }
}

impl<'a> XlsxWriter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a named style.
    pub fn with_named_style(mut self, name: impl Into<String>, fmt: SpecCellFormat) -> XlsxMapResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(XlsxMapError::Configuration(
                "style name must not be blank".to_string(),
            ));
        }
        self.map_styles.insert(name, fmt);
        Ok(self)
    }

    /// Look up a named style.
    pub fn named_style(&self, name: &str) -> XlsxMapResult<&SpecCellFormat> {
        self.map_styles
            .get(name)
            .ok_or_else(|| XlsxMapError::DocumentStructure(format!("style '{name}' does not exist")))
    }

    /// Append a sheet.
    pub fn add_sheet<T: 'a>(mut self, sheet: SheetBuilder<'a, T>) -> Self {
        self.l_sheets.push(Box::new(sheet));
        self
    }

    /// Append `records` as a sheet with auto-generated columns.
    pub fn add_records<T: SheetRecord>(self, records: &'a [T]) -> XlsxMapResult<Self> {
        Ok(self.add_sheet(SheetBuilder::from_records(records)?))
    }

    /// Append a header-only template sheet for `T`.
    pub fn write_template<T: SheetRecord>(self) -> XlsxMapResult<Self> {
        Ok(self.add_sheet(SheetBuilder::<T>::template()?))
    }

    /// Number of declared sheets.
    pub fn len(&self) -> usize {
        self.l_sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.l_sheets.is_empty()
    }

    /// Render every declared sheet into a new workbook.
    pub fn materialize(self) -> XlsxMapResult<XlsxWorkbook> {
        let mut workbook = Workbook::new();
        let mut l_reports = Vec::with_capacity(self.l_sheets.len());
        let mut style_prev = SpecSheetStyle::default();

        for sheet in &self.l_sheets {
            let style = sheet.style().inherit(&style_prev);
            l_reports.push(sheet.render(&mut workbook, &style)?);
            style_prev = style;
        }

        Ok(XlsxWorkbook {
            workbook,
            l_reports,
        })
    }

    /// Materialize and serialize to an in-memory XLSX buffer.
    pub fn save_to_buffer(self) -> XlsxMapResult<Vec<u8>> {
        self.materialize()?.save_to_buffer()
    }

    /// Materialize and write to `path`.
    pub fn save(self, path: impl AsRef<Path>) -> XlsxMapResult<Vec<SpecSheetReport>> {
        let mut workbook = self.materialize()?;
        workbook.save(path)?;
        Ok(workbook.l_reports)
    }
}

/// Rendered workbook ready for serialization.
pub struct XlsxWorkbook {
    workbook: Workbook,
    l_reports: Vec<SpecSheetReport>,
}

impl XlsxWorkbook {
    /// Per-sheet layout reports, in sheet order.
    pub fn reports(&self) -> &[SpecSheetReport] {
        &self.l_reports
    }

    /// Underlying engine workbook, for features this layer does not wrap.
    pub fn workbook_mut(&mut self) -> &mut Workbook {
        &mut self.workbook
    }

    pub fn save_to_buffer(&mut self) -> XlsxMapResult<Vec<u8>> {
        Ok(self.workbook.save_to_buffer()?)
    }

    pub fn save(&mut self, path: impl AsRef<Path>) -> XlsxMapResult<()> {
        self.workbook.save(path.as_ref())?;
        debug!("saved workbook to {}", path.as_ref().display());
        Ok(())
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
