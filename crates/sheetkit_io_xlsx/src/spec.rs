//! Shared XLSX mapping models and options.

use std::fmt;
use std::ops::Range;

use chrono::{NaiveDateTime, Timelike};

use crate::conf::{C_MSG_CASTING_ERROR_DEFAULT, C_MSG_COLUMN_MISSING_DEFAULT};
use crate::validate::RecordValidator;

////////////////////////////////////////////////////////////////////////////////
// #region CellValue

/// Tagged cell value exchanged between the engines and the mapping layer.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EnumCellValue {
    /// Missing/blank value.
    #[default]
    None,
    /// Text value.
    String(String),
    /// Floating point value.
    Number(f64),
    /// Integral value.
    Integer(i64),
    /// Boolean value.
    Boolean(bool),
    /// Date/time value.
    DateTime(NaiveDateTime),
    /// Cell error literal (`#N/A`, `#DIV/0!`, ...).
    Error(String),
}

impl EnumCellValue {
    /// Blank cell or empty text.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::None => true,
            Self::String(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Short variant label used in diagnostics.
    pub fn type_label(&self) -> &'static str {
        match self {
            Self::None => "empty",
            Self::String(_) => "text",
            Self::Number(_) => "number",
            Self::Integer(_) => "integer",
            Self::Boolean(_) => "boolean",
            Self::DateTime(_) => "datetime",
            Self::Error(_) => "error",
        }
    }
}

impl fmt::Display for EnumCellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => Ok(()),
            Self::String(s) => write!(f, "{s}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Self::DateTime(dt) => {
                if dt.num_seconds_from_midnight() == 0 && dt.nanosecond() == 0 {
                    write!(f, "{}", dt.format("%Y-%m-%d"))
                } else {
                    write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S"))
                }
            }
            Self::Error(e) => write!(f, "{e}"),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellFormatSpecification

/// Cell format patch. `None` fields leave the underlying format untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SpecCellFormat {
    /// Font family name.
    pub font_name: Option<String>,
    /// Font size in points.
    pub font_size: Option<i64>,
    /// Bold style.
    pub bold: Option<bool>,
    /// Italic style.
    pub italic: Option<bool>,

    /// Horizontal alignment.
    pub align: Option<String>,
    /// Vertical alignment.
    pub valign: Option<String>,
    /// Border style for all sides.
    pub border: Option<i64>,
    /// Text wrap.
    pub text_wrap: Option<bool>,

    /// Top border override.
    pub top: Option<i64>,
    /// Bottom border override.
    pub bottom: Option<i64>,
    /// Left border override.
    pub left: Option<i64>,
    /// Right border override.
    pub right: Option<i64>,

    /// Number format code.
    pub num_format: Option<String>,
    /// Background fill color.
    pub bg_color: Option<String>,
    /// Font color.
    pub font_color: Option<String>,
}

impl SpecCellFormat {
    /// Return a new format by overlaying `patch` onto `self`.
    pub fn with_(&self, patch: SpecCellFormat) -> SpecCellFormat {
        self.merge(&patch)
    }

    /// Merge two formats with right-side non-`None` overwrite semantics.
    pub fn merge(&self, other: &SpecCellFormat) -> SpecCellFormat {
        SpecCellFormat {
            font_name: other.font_name.clone().or_else(|| self.font_name.clone()),
            font_size: other.font_size.or(self.font_size),
            bold: other.bold.or(self.bold),
            italic: other.italic.or(self.italic),
            align: other.align.clone().or_else(|| self.align.clone()),
            valign: other.valign.clone().or_else(|| self.valign.clone()),
            border: other.border.or(self.border),
            text_wrap: other.text_wrap.or(self.text_wrap),
            top: other.top.or(self.top),
            bottom: other.bottom.or(self.bottom),
            left: other.left.or(self.left),
            right: other.right.or(self.right),
            num_format: other.num_format.clone().or_else(|| self.num_format.clone()),
            bg_color: other.bg_color.clone().or_else(|| self.bg_color.clone()),
            font_color: other.font_color.clone().or_else(|| self.font_color.clone()),
        }
    }

    /// Merge an optional patch.
    pub fn merge_opt(&self, other: Option<&SpecCellFormat>) -> SpecCellFormat {
        match other {
            Some(patch) => self.merge(patch),
            None => self.clone(),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region TableRegion

/// Rectangular table bounds over a worksheet (absolute, 0-based, inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecTableRegion {
    /// First row (the header row when `if_has_header_row`).
    pub n_row_start: usize,
    /// First column.
    pub n_col_start: usize,
    /// Last row (the totals row when `if_has_totals_row`).
    pub n_row_end: usize,
    /// Last column.
    pub n_col_end: usize,
    /// First row holds column headers.
    pub if_has_header_row: bool,
    /// Last row holds totals.
    pub if_has_totals_row: bool,
}

impl SpecTableRegion {
    /// Number of columns.
    pub fn width(&self) -> usize {
        self.n_col_end + 1 - self.n_col_start
    }

    /// Absolute row index of the header row, if any.
    pub fn header_row(&self) -> Option<usize> {
        self.if_has_header_row.then_some(self.n_row_start)
    }

    /// Absolute data row indices (header/totals rows excluded).
    pub fn rows_data(&self) -> Range<usize> {
        let n_start = self.n_row_start + usize::from(self.if_has_header_row);
        let n_end_exclusive = (self.n_row_end + 1).saturating_sub(usize::from(self.if_has_totals_row));
        n_start..usize::max(n_start, n_end_exclusive)
    }

    /// Number of data rows.
    pub fn height_data(&self) -> usize {
        self.rows_data().len()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ErrorPayloads

/// Details of one failed cell coercion.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecConversionError {
    /// Target field/property name.
    pub property_name: String,
    /// Header text of the source column (column letters when headerless).
    pub column_name: String,
    /// Expected target type.
    pub expected_type: String,
    /// Raw cell value that failed to convert.
    pub raw_value: EnumCellValue,
    /// A1-style cell address.
    pub cell_address: String,
    /// Why coercion failed.
    pub reason: String,
}

/// One failed coercion before it is tied to a cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecCoerceFailure {
    /// Expected target type.
    pub expected: &'static str,
    /// Human-readable reason.
    pub reason: String,
}

impl SpecCoerceFailure {
    pub fn new(expected: &'static str, reason: impl Into<String>) -> Self {
        Self {
            expected,
            reason: reason.into(),
        }
    }
}

/// One field-level validation violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecFieldViolation {
    /// Offending field.
    pub field: String,
    /// Violation message.
    pub message: String,
}

impl SpecFieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for SpecFieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ReadOptions

/// Interception hook invoked with the built record and its 1-based worksheet row.
pub type FnRowBuilt<T> = Box<dyn Fn(&mut T, usize)>;

/// Options for read operations.
pub struct SpecReadOptions<T> {
    /// First row of the region holds column headers.
    pub if_has_header_row: bool,
    /// Last row of the region holds totals and is not data.
    pub if_has_totals_row: bool,
    /// Leave fields at their default on coercion failure instead of aborting.
    pub if_skip_casting_errors: bool,
    /// Do not run the validator.
    pub if_skip_validation_errors: bool,
    /// Leading rows skipped before the header row (e.g. title rows).
    pub n_rows_skip: usize,
    /// Message template for cast errors.
    ///
    /// Placeholders: `{property}`, `{column}`, `{expected}`, `{value}`, `{address}`.
    pub casting_error_message_template: String,
    /// Message template for unresolved columns. Placeholder: `{name}`.
    pub column_missing_message_template: String,
    /// Validation bridge.
    pub validator: Option<Box<dyn RecordValidator<T>>>,
    /// Interception hook.
    pub on_row_built: Option<FnRowBuilt<T>>,
}

impl<T> Default for SpecReadOptions<T> {
    fn default() -> Self {
        Self {
            if_has_header_row: true,
            if_has_totals_row: false,
            if_skip_casting_errors: false,
            if_skip_validation_errors: false,
            n_rows_skip: 0,
            casting_error_message_template: C_MSG_CASTING_ERROR_DEFAULT.to_string(),
            column_missing_message_template: C_MSG_COLUMN_MISSING_DEFAULT.to_string(),
            validator: None,
            on_row_built: None,
        }
    }
}

impl<T> SpecReadOptions<T> {
    /// Attach a validator.
    pub fn with_validator(mut self, validator: impl RecordValidator<T> + 'static) -> Self {
        self.validator = Some(Box::new(validator));
        self
    }

    /// Attach an interception hook.
    pub fn with_on_row_built(mut self, hook: impl Fn(&mut T, usize) + 'static) -> Self {
        self.on_row_built = Some(Box::new(hook));
        self
    }
}

impl<T> fmt::Debug for SpecReadOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpecReadOptions")
            .field("if_has_header_row", &self.if_has_header_row)
            .field("if_has_totals_row", &self.if_has_totals_row)
            .field("if_skip_casting_errors", &self.if_skip_casting_errors)
            .field("if_skip_validation_errors", &self.if_skip_validation_errors)
            .field("n_rows_skip", &self.n_rows_skip)
            .field("validator", &self.validator.is_some())
            .field("on_row_built", &self.on_row_built.is_some())
            .finish()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region WriteOptions

/// Autofit rule for column width inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumAutofitColumnsRule {
    /// Infer width from header cells only.
    Header,
    /// Infer width from body cells only.
    Body,
    /// Infer width from both header and body cells (default).
    #[default]
    All,
}

/// Autofit policy for one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecAutofitCellsPolicy {
    /// Autofit width inference rule.
    pub rule_columns: EnumAutofitColumnsRule,
    /// Max body rows inspected when body-based inference is active.
    pub height_body_inferred_max: Option<usize>,
    /// Minimum final width.
    pub width_cell_min: usize,
    /// Maximum final width.
    pub width_cell_max: usize,
    /// Width padding added after inference.
    pub width_cell_padding: usize,
}

impl Default for SpecAutofitCellsPolicy {
    fn default() -> Self {
        Self {
            rule_columns: EnumAutofitColumnsRule::All,
            height_body_inferred_max: Some(20_000),
            width_cell_min: 8,
            width_cell_max: 60,
            width_cell_padding: 2,
        }
    }
}

/// Column hook applied after all rows are written.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumColumnPostRender {
    /// Fit width to content.
    Autofit(SpecAutofitCellsPolicy),
    /// Fixed width in character units.
    Width(f64),
    /// Hide the column.
    Hidden,
}

/// Sheet-level formats and column hooks inherited by the next sheet of the
/// same workbook.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecSheetStyle {
    /// Header cells, applied before column-level header formats.
    pub fmt_header: Option<SpecCellFormat>,
    /// Custom header-row format; disables the header auto-filter.
    pub fmt_header_row: Option<SpecCellFormat>,
    /// Data cells, applied before column-level cell formats.
    pub fmt_cell: Option<SpecCellFormat>,
    /// Title rows.
    pub fmt_title: Option<SpecCellFormat>,
    /// Autofit for columns without a post-render hook of their own.
    pub policy_autofit: Option<SpecAutofitCellsPolicy>,
}

impl SpecSheetStyle {
    /// Fill unset formats and hooks from `previous`.
    pub fn inherit(&self, previous: &SpecSheetStyle) -> SpecSheetStyle {
        SpecSheetStyle {
            fmt_header: self.fmt_header.clone().or_else(|| previous.fmt_header.clone()),
            fmt_header_row: self
                .fmt_header_row
                .clone()
                .or_else(|| previous.fmt_header_row.clone()),
            fmt_cell: self.fmt_cell.clone().or_else(|| previous.fmt_cell.clone()),
            fmt_title: self.fmt_title.clone().or_else(|| previous.fmt_title.clone()),
            policy_autofit: self
                .policy_autofit
                .clone()
                .or_else(|| previous.policy_autofit.clone()),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ReportSpecification

/// Layout of one rendered worksheet (0-based rows).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecSheetReport {
    /// Actual sheet name in workbook.
    pub sheet_name: String,
    /// Number of title rows at the top.
    pub n_rows_title: usize,
    /// Header row index, if rendered.
    pub row_header: Option<usize>,
    /// First data row index.
    pub row_data_start: usize,
    /// Number of data rows.
    pub n_rows_data: usize,
    /// Number of columns.
    pub n_cols: usize,
    /// Header auto-filter was applied.
    pub if_autofilter: bool,
    /// Number of auto-fitted columns.
    pub n_cols_autofit: usize,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
}

impl SpecSheetReport {
    /// Add a warning message.
    pub fn warn(&mut self, msg: impl AsRef<str>) {
        self.warnings.push(msg.as_ref().to_string());
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    fn derive_region(if_has_header_row: bool, if_has_totals_row: bool) -> SpecTableRegion {
        SpecTableRegion {
            n_row_start: 2,
            n_col_start: 1,
            n_row_end: 7,
            n_col_end: 3,
            if_has_header_row,
            if_has_totals_row,
        }
    }

    #[test]
    fn test_region_excludes_header_and_totals_rows() {
        let region = derive_region(true, true);
        assert_eq!(region.width(), 3);
        assert_eq!(region.header_row(), Some(2));
        assert_eq!(region.rows_data(), 3..7);
        assert_eq!(region.height_data(), 4);

        let region = derive_region(false, false);
        assert_eq!(region.header_row(), None);
        assert_eq!(region.rows_data(), 2..8);
    }

    #[test]
    fn test_region_with_header_only_has_no_data_rows() {
        let region = SpecTableRegion {
            n_row_end: 2,
            ..derive_region(true, true)
        };
        assert_eq!(region.height_data(), 0);
    }

    #[test]
    fn test_format_merge_right_side_wins() {
        let base = SpecCellFormat {
            bold: Some(true),
            font_size: Some(11),
            ..Default::default()
        };
        let patch = SpecCellFormat {
            font_size: Some(14),
            bg_color: Some("#FFFF00".to_string()),
            ..Default::default()
        };
        let merged = base.merge(&patch);
        assert_eq!(merged.bold, Some(true));
        assert_eq!(merged.font_size, Some(14));
        assert_eq!(merged.bg_color.as_deref(), Some("#FFFF00"));
        assert_eq!(base.merge_opt(None), base);
    }

    #[test]
    fn test_sheet_style_inherits_unset_formats() {
        let fmt_bold = SpecCellFormat {
            bold: Some(true),
            ..Default::default()
        };
        let previous = SpecSheetStyle {
            fmt_header: Some(fmt_bold.clone()),
            fmt_cell: Some(fmt_bold.clone()),
            ..Default::default()
        };
        let current = SpecSheetStyle {
            fmt_cell: Some(SpecCellFormat::default()),
            ..Default::default()
        };
        let style = current.inherit(&previous);
        assert_eq!(style.fmt_header, Some(fmt_bold));
        assert_eq!(style.fmt_cell, Some(SpecCellFormat::default()));
        assert_eq!(style.fmt_title, None);
    }

    #[test]
    fn test_sheet_style_inherits_autofit_policy() {
        let policy = SpecAutofitCellsPolicy {
            width_cell_max: 40,
            ..Default::default()
        };
        let previous = SpecSheetStyle {
            policy_autofit: Some(policy.clone()),
            ..Default::default()
        };
        let style = SpecSheetStyle::default().inherit(&previous);
        assert_eq!(style.policy_autofit, Some(policy));

        let own = SpecAutofitCellsPolicy::default();
        let style = SpecSheetStyle {
            policy_autofit: Some(own.clone()),
            ..Default::default()
        }
        .inherit(&previous);
        assert_eq!(style.policy_autofit, Some(own));
    }

    #[test]
    fn test_cell_value_display_and_emptiness() {
        assert!(EnumCellValue::None.is_empty());
        assert!(EnumCellValue::String(String::new()).is_empty());
        assert!(!EnumCellValue::Integer(0).is_empty());
        assert_eq!(EnumCellValue::Boolean(true).to_string(), "TRUE");
        let dt = chrono::NaiveDate::from_ymd_opt(2024, 3, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .expect("valid datetime");
        assert_eq!(EnumCellValue::DateTime(dt).to_string(), "2024-03-01");
    }
}
