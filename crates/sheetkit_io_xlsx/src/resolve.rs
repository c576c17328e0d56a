//! Column resolution: schema fields to table column positions.

use log::debug;

use crate::binding::RecordSchema;
use crate::conf::C_MSG_NO_COLUMN_BOUND;
use crate::error::{XlsxMapError, XlsxMapResult};
use crate::util::{format_message_template, humanize_property_name, is_same_text_ignore_case};

/// Resolved position of one column-bound field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecColumnBinding {
    /// Index into [`RecordSchema::fields`].
    pub n_idx_field: usize,
    /// 0-based column position inside the table region.
    pub n_idx_col: usize,
    /// Field property name.
    pub property: &'static str,
    /// Explicit column name from the attribute, if any.
    pub declared_name: Option<String>,
}

/// Position of the first header (left to right) equal to `name` ignoring case.
pub fn find_header_position(headers: &[String], name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|header| is_same_text_ignore_case(header, name))
}

/// Bind every column-bound field of `schema` to a table column.
///
/// `headers` is `None` for headerless tables, in which case only index-bound
/// fields can resolve. Bindings keep field declaration order.
pub fn resolve_column_bindings<T>(
    schema: &RecordSchema<T>,
    headers: Option<&[String]>,
    width: usize,
    column_missing_message_template: &str,
) -> XlsxMapResult<Vec<SpecColumnBinding>> {
    let mut l_bindings = Vec::new();

    for (n_idx_field, field) in schema.column_fields() {
        let Some(attr) = field.attr() else {
            continue;
        };

        let n_idx_col = if let Some(n_index) = attr.index() {
            if n_index > width {
                return Err(XlsxMapError::Resolution(format!(
                    "column index {n_index} of '{}' is outside the table (width {width})",
                    field.property()
                )));
            }
            n_index - 1
        } else {
            let c_name_lookup = attr.name().unwrap_or(field.property());
            let n_found = headers.and_then(|l_headers| {
                find_header_position(l_headers, c_name_lookup).or_else(|| {
                    // Auto-generated headers carry the humanized property name.
                    if attr.name().is_none() {
                        find_header_position(l_headers, &humanize_property_name(field.property()))
                    } else {
                        None
                    }
                })
            });
            match n_found {
                Some(n_idx) => n_idx,
                None => {
                    return Err(XlsxMapError::Resolution(format_message_template(
                        column_missing_message_template,
                        &[("name", c_name_lookup)],
                    )));
                }
            }
        };

        l_bindings.push(SpecColumnBinding {
            n_idx_field,
            n_idx_col,
            property: field.property(),
            declared_name: attr.name().map(ToString::to_string),
        });
    }

    if l_bindings.is_empty() {
        return Err(XlsxMapError::Resolution(C_MSG_NO_COLUMN_BOUND.to_string()));
    }

    debug!(
        "resolved {} column binding(s) for {}",
        l_bindings.len(),
        schema.type_name()
    );
    Ok(l_bindings)
}
