//! XLSX constants, default messages and default format presets.

use crate::spec::SpecCellFormat;

/// Excel worksheet maximum row count.
pub const N_NROWS_EXCEL_MAX: usize = 1_048_576;
/// Excel worksheet maximum column count.
pub const N_NCOLS_EXCEL_MAX: usize = 16_384;
/// Excel sheet name maximum length.
pub const N_LEN_EXCEL_SHEET_NAME_MAX: usize = 31;
/// Characters not allowed in sheet names.
pub const TUP_EXCEL_ILLEGAL: [&str; 7] = ["*", ":", "?", "/", "\\", "[", "]"];

/// Default cast error message.
pub const C_MSG_CASTING_ERROR_DEFAULT: &str = "The expected type of '{property}' property is \
     '{expected}', but the cell [{address}] contains an invalid value '{value}'.";
/// Default unresolved column message.
pub const C_MSG_COLUMN_MISSING_DEFAULT: &str = "{name} column could not be found";
/// Message for schemas without any column-bound field.
pub const C_MSG_NO_COLUMN_BOUND: &str = "type has no column-bound properties";

/// Number format applied to date/time cells without an explicit one.
pub const C_NUM_FORMAT_DATETIME: &str = "yyyy-mm-dd hh:mm:ss";
/// Number format applied to midnight date/time cells without an explicit one.
pub const C_NUM_FORMAT_DATE: &str = "yyyy-mm-dd";

/// Locale-invariant date-time layouts accepted for text cells.
pub const TUP_DATETIME_FORMATS_INVARIANT: [&str; 9] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

/// Locale-invariant date layouts accepted for text cells.
pub const TUP_DATE_FORMATS_INVARIANT: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

/// Canonical format preset keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumFmtKey {
    /// Data cell format.
    Text,
    /// Header cell format.
    Header,
    /// Title row format.
    Title,
    /// Date/time cell format.
    DateTime,
}

/// Base format every preset starts from.
pub fn derive_base_xlsx_format() -> SpecCellFormat {
    SpecCellFormat {
        font_name: Some("Calibri".to_string()),
        font_size: Some(11),
        valign: Some("vcenter".to_string()),
        ..Default::default()
    }
}

/// Default preset used by [`crate::writer::XlsxWriter`] for `key`.
pub fn derive_default_xlsx_format(key: EnumFmtKey) -> SpecCellFormat {
    let cfg_base_fmt_spec = derive_base_xlsx_format();

    match key {
        EnumFmtKey::Text => cfg_base_fmt_spec,
        EnumFmtKey::Header => cfg_base_fmt_spec.with_(SpecCellFormat {
            bold: Some(true),
            align: Some("center".to_string()),
            bottom: Some(1),
            ..Default::default()
        }),
        EnumFmtKey::Title => cfg_base_fmt_spec.with_(SpecCellFormat {
            bold: Some(true),
            font_size: Some(14),
            align: Some("center".to_string()),
            ..Default::default()
        }),
        EnumFmtKey::DateTime => cfg_base_fmt_spec.with_(SpecCellFormat {
            num_format: Some(C_NUM_FORMAT_DATETIME.to_string()),
            ..Default::default()
        }),
    }
}
