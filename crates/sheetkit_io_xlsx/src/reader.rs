//! Lazy row-to-record reader.
//!
//! A read pass resolves the column bindings first (failing before any row is
//! touched) and then streams one record per data row, top to bottom. The
//! first unskippable error is yielded once and ends the pass.

use std::iter::FusedIterator;
use std::ops::Range;

use log::{debug, trace};

use crate::binding::{RecordSchema, SheetRecord};
use crate::document::{SheetGrid, SpecNamedTable};
use crate::error::{XlsxMapError, XlsxMapResult};
use crate::resolve::{SpecColumnBinding, resolve_column_bindings};
use crate::spec::{
    EnumCellValue, SpecCoerceFailure, SpecConversionError, SpecReadOptions, SpecTableRegion,
};
use crate::util::{derive_cell_address, derive_column_letters, format_message_template};

////////////////////////////////////////////////////////////////////////////////
// #region ReadPlan

/// Schema, resolved bindings and row bounds of one read pass.
struct ReadPlan<T> {
    schema: RecordSchema<T>,
    l_bindings: Vec<SpecColumnBinding>,
    /// Source column text per binding (header text or column letters).
    l_column_names: Vec<String>,
    n_col_start: usize,
    rows_data: Range<usize>,
}

impl<T: SheetRecord> ReadPlan<T> {
    fn from_grid(grid: &SheetGrid, options: &SpecReadOptions<T>) -> XlsxMapResult<Self> {
        let region = grid.region(
            options.if_has_header_row,
            options.n_rows_skip,
            options.if_has_totals_row,
        );
        let l_headers = match &region {
            Some(region) => grid.header_texts(region),
            None => options.if_has_header_row.then(Vec::new),
        };
        Self::build(region, l_headers, options)
    }

    fn from_table(table: &SpecNamedTable, options: &SpecReadOptions<T>) -> XlsxMapResult<Self> {
        let mut region = table.region(options.if_has_totals_row);
        if region.is_none() {
            // Header-only table: resolve against the header, stream nothing.
            let (n_row_origin, n_col_origin) = table.grid.origin();
            region = Some(SpecTableRegion {
                n_row_start: n_row_origin,
                n_col_start: n_col_origin,
                n_row_end: n_row_origin,
                n_col_end: n_col_origin + table.columns.len().max(1) - 1,
                if_has_header_row: true,
                if_has_totals_row: false,
            });
        }
        Self::build(region, Some(table.columns.clone()), options)
    }

    fn build(
        region: Option<SpecTableRegion>,
        l_headers: Option<Vec<String>>,
        options: &SpecReadOptions<T>,
    ) -> XlsxMapResult<Self> {
        let schema = T::schema()?;
        let n_width = region.as_ref().map_or(0, SpecTableRegion::width);
        let l_bindings = resolve_column_bindings(
            &schema,
            l_headers.as_deref(),
            n_width,
            &options.column_missing_message_template,
        )?;

        let n_col_start = region.as_ref().map_or(0, |region| region.n_col_start);
        let l_column_names = l_bindings
            .iter()
            .map(|binding| {
                l_headers
                    .as_ref()
                    .and_then(|headers| headers.get(binding.n_idx_col))
                    .filter(|header| !header.is_empty())
                    .cloned()
                    .unwrap_or_else(|| derive_column_letters(n_col_start + binding.n_idx_col))
            })
            .collect();
        let rows_data = region.as_ref().map_or(0..0, SpecTableRegion::rows_data);

        debug!(
            "reading {} row(s) into {}",
            rows_data.len(),
            schema.type_name()
        );
        Ok(Self {
            schema,
            l_bindings,
            l_column_names,
            n_col_start,
            rows_data,
        })
    }

    /// Coerce every bound cell of `row` into a fresh record.
    ///
    /// Returns the record plus the conversion failures that were not skipped.
    fn build_record(
        &self,
        grid: &SheetGrid,
        row: usize,
        options: &SpecReadOptions<T>,
        if_stop_on_error: bool,
    ) -> (T, Vec<XlsxMapError>) {
        let mut record = T::default();
        let mut l_errors = Vec::new();

        for (binding, c_column) in self.l_bindings.iter().zip(&self.l_column_names) {
            let n_col = self.n_col_start + binding.n_idx_col;
            let value = grid.get(row, n_col);
            let field = &self.schema.fields()[binding.n_idx_field];
            let Err(failure) = field.apply(&mut record, value) else {
                continue;
            };

            let c_address = derive_cell_address(row, n_col);
            if options.if_skip_casting_errors {
                trace!(
                    "skipped casting error at {c_address} for '{}': {}",
                    binding.property, failure.reason
                );
                continue;
            }
            l_errors.push(derive_cast_error(
                &options.casting_error_message_template,
                binding.property,
                c_column,
                value.clone(),
                c_address,
                failure,
            ));
            if if_stop_on_error {
                break;
            }
        }
        (record, l_errors)
    }
}

fn derive_cast_error(
    template: &str,
    property: &str,
    column: &str,
    raw_value: EnumCellValue,
    cell_address: String,
    failure: SpecCoerceFailure,
) -> XlsxMapError {
    let c_value = raw_value.to_string();
    let message = format_message_template(
        template,
        &[
            ("property", property),
            ("column", column),
            ("expected", failure.expected),
            ("value", &c_value),
            ("address", &cell_address),
        ],
    );
    XlsxMapError::Cast {
        message,
        detail: Box::new(SpecConversionError {
            property_name: property.to_string(),
            column_name: column.to_string(),
            expected_type: failure.expected.to_string(),
            raw_value,
            cell_address,
            reason: failure.reason,
        }),
    }
}

fn validate_record<T>(record: &T, row: usize, options: &SpecReadOptions<T>) -> XlsxMapResult<()> {
    if options.if_skip_validation_errors {
        return Ok(());
    }
    if let Some(validator) = &options.validator {
        let l_violations = validator.validate(record);
        if !l_violations.is_empty() {
            return Err(XlsxMapError::Validation {
                row: row + 1,
                violations: l_violations,
            });
        }
    }
    Ok(())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region TableReader

/// Single-pass, forward-only record iterator.
pub struct TableReader<'a, T> {
    grid: &'a SheetGrid,
    options: &'a SpecReadOptions<T>,
    plan: ReadPlan<T>,
    rows: Range<usize>,
    if_aborted: bool,
}

impl<T: SheetRecord> TableReader<'_, T> {
    fn read_row(&self, row: usize) -> XlsxMapResult<T> {
        let (mut record, l_errors) = self.plan.build_record(self.grid, row, self.options, true);
        if let Some(err) = l_errors.into_iter().next() {
            return Err(err);
        }
        validate_record(&record, row, self.options)?;
        if let Some(hook) = &self.options.on_row_built {
            hook(&mut record, row + 1);
        }
        Ok(record)
    }

    /// Bindings resolved for this pass.
    pub fn bindings(&self) -> &[SpecColumnBinding] {
        &self.plan.l_bindings
    }
}

impl<T: SheetRecord> Iterator for TableReader<'_, T> {
    type Item = XlsxMapResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.if_aborted {
            return None;
        }
        let row = self.rows.next()?;
        let result = self.read_row(row);
        if result.is_err() {
            self.if_aborted = true;
        }
        Some(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.if_aborted {
            (0, Some(0))
        } else {
            (0, Some(self.rows.len()))
        }
    }
}

impl<T: SheetRecord> FusedIterator for TableReader<'_, T> {}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region EntryPoints

/// Resolve `T` against a worksheet grid and return the lazy reader.
///
/// Resolution errors surface here, before any row is read.
pub fn read_records<'a, T: SheetRecord>(
    grid: &'a SheetGrid,
    options: &'a SpecReadOptions<T>,
) -> XlsxMapResult<TableReader<'a, T>> {
    let plan = ReadPlan::from_grid(grid, options)?;
    Ok(TableReader {
        grid,
        options,
        rows: plan.rows_data.clone(),
        plan,
        if_aborted: false,
    })
}

/// Resolve `T` against a named table and return the lazy reader.
///
/// The table's own header is used; `n_rows_skip` and `if_has_header_row`
/// do not apply.
pub fn read_table<'a, T: SheetRecord>(
    table: &'a SpecNamedTable,
    options: &'a SpecReadOptions<T>,
) -> XlsxMapResult<TableReader<'a, T>> {
    let plan = ReadPlan::from_table(table, options)?;
    Ok(TableReader {
        grid: &table.grid,
        options,
        rows: plan.rows_data.clone(),
        plan,
        if_aborted: false,
    })
}

/// Outcome of a collecting read.
#[derive(Debug)]
pub struct SpecReadReport<T> {
    /// Records that converted and validated cleanly, in row order.
    pub records: Vec<T>,
    /// Every conversion and validation error, in row order.
    pub errors: Vec<XlsxMapError>,
}

impl<T> SpecReadReport<T> {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Read every row without aborting, collecting all errors.
///
/// Rows with any error are left out of `records`. Resolution errors are
/// still returned as `Err`.
pub fn validate_records<T: SheetRecord>(
    grid: &SheetGrid,
    options: &SpecReadOptions<T>,
) -> XlsxMapResult<SpecReadReport<T>> {
    let plan = ReadPlan::from_grid(grid, options)?;
    let mut report = SpecReadReport {
        records: Vec::new(),
        errors: Vec::new(),
    };

    for row in plan.rows_data.clone() {
        let (mut record, l_errors) = plan.build_record(grid, row, options, false);
        if !l_errors.is_empty() {
            report.errors.extend(l_errors);
            continue;
        }
        if let Err(err) = validate_record(&record, row, options) {
            report.errors.push(err);
            continue;
        }
        if let Some(hook) = &options.on_row_built {
            hook(&mut record, row + 1);
        }
        report.records.push(record);
    }

    debug!(
        "validated {} row(s): {} record(s), {} error(s)",
        plan.rows_data.len(),
        report.records.len(),
        report.errors.len()
    );
    Ok(report)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
