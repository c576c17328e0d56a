//! Stateless helper utilities shared by the reader and writer.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

use crate::conf::{N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX, TUP_EXCEL_ILLEGAL};
use crate::error::{XlsxMapError, XlsxMapResult};

////////////////////////////////////////////////////////////////////////////////
// #region SheetNormalization

/// Replace invalid chars and trim to valid Excel sheet name.
pub fn sanitize_sheet_name(name: &str, replace_to: &str) -> String {
    let mut c_name = name.to_string();
    for c_illegal in TUP_EXCEL_ILLEGAL {
        c_name = c_name.replace(c_illegal, replace_to);
    }
    c_name = c_name.trim().to_string();
    if c_name.is_empty() {
        c_name = "Sheet".to_string();
    }

    c_name.chars().take(N_LEN_EXCEL_SHEET_NAME_MAX).collect()
}

/// Last path segment of a Rust type name (`crate::mod::Person` -> `Person`).
pub fn derive_short_type_name(type_name: &str) -> String {
    let c_base = type_name.split('<').next().unwrap_or(type_name);
    c_base.rsplit("::").next().unwrap_or(c_base).to_string()
}

/// Turn a property identifier into header text.
///
/// `first_name` and `FirstName` both become `First Name`.
pub fn humanize_property_name(name: &str) -> String {
    let mut l_words: Vec<String> = Vec::new();
    let mut c_word = String::new();
    let mut chr_prev: Option<char> = None;

    for chr in name.chars() {
        if chr == '_' || chr == '-' || chr.is_whitespace() {
            if !c_word.is_empty() {
                l_words.push(std::mem::take(&mut c_word));
            }
            chr_prev = None;
            continue;
        }
        let if_boundary = match chr_prev {
            Some(prev) => {
                (chr.is_uppercase() && prev.is_lowercase())
                    || (chr.is_ascii_digit() && !prev.is_ascii_digit())
            }
            None => false,
        };
        if if_boundary && !c_word.is_empty() {
            l_words.push(std::mem::take(&mut c_word));
        }
        c_word.push(chr);
        chr_prev = Some(chr);
    }
    if !c_word.is_empty() {
        l_words.push(c_word);
    }

    l_words
        .iter()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Case-insensitive text equality.
pub fn is_same_text_ignore_case(lhs: &str, rhs: &str) -> bool {
    lhs.trim().to_lowercase() == rhs.trim().to_lowercase()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellAddressing

/// Zero-based column index to letters (`0` -> `A`, `27` -> `AB`).
pub fn derive_column_letters(col_idx: usize) -> String {
    let mut n_rest = col_idx + 1;
    let mut l_chars = Vec::new();
    while n_rest > 0 {
        let n_rem = (n_rest - 1) % 26;
        l_chars.push((b'A' + n_rem as u8) as char);
        n_rest = (n_rest - 1) / 26;
    }
    l_chars.iter().rev().collect()
}

/// Zero-based coordinates to an A1 address.
pub fn derive_cell_address(row_idx: usize, col_idx: usize) -> String {
    format!("{}{}", derive_column_letters(col_idx), row_idx + 1)
}

pub fn cast_row_num(value: usize) -> XlsxMapResult<u32> {
    if value >= N_NROWS_EXCEL_MAX {
        return Err(XlsxMapError::Configuration(format!(
            "row index overflow: {value}"
        )));
    }
    u32::try_from(value)
        .map_err(|_| XlsxMapError::Configuration(format!("row index overflow: {value}")))
}

pub fn cast_col_num(value: usize) -> XlsxMapResult<u16> {
    if value >= N_NCOLS_EXCEL_MAX {
        return Err(XlsxMapError::Configuration(format!(
            "column index overflow: {value}"
        )));
    }
    u16::try_from(value)
        .map_err(|_| XlsxMapError::Configuration(format!("column index overflow: {value}")))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Messages

/// Substitute `{key}` placeholders in `template`.
///
/// Single left-to-right pass; substituted values are never rescanned and
/// unknown placeholders are kept verbatim.
pub fn format_message_template(template: &str, pairs: &[(&str, &str)]) -> String {
    let mut c_msg = String::with_capacity(template.len());
    let mut c_rest = template;
    while let Some(n_open) = c_rest.find('{') {
        c_msg.push_str(&c_rest[..n_open]);
        let c_tail = &c_rest[n_open..];
        let found = c_tail.find('}').and_then(|n_close| {
            let c_key = &c_tail[1..n_close];
            pairs
                .iter()
                .find(|(key, _)| *key == c_key)
                .map(|(_, value)| (*value, n_close))
        });
        match found {
            Some((value, n_close)) => {
                c_msg.push_str(value);
                c_rest = &c_tail[n_close + 1..];
            }
            None => {
                c_msg.push('{');
                c_rest = &c_tail[1..];
            }
        }
    }
    c_msg.push_str(c_rest);
    c_msg
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Dates

/// Excel 1900-system serial number to date-time.
///
/// Serials below 61 account for the phantom 1900-02-29.
pub fn convert_excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let date_epoch = if serial < 61.0 {
        NaiveDate::from_ymd_opt(1899, 12, 31)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    };
    let n_millis = (serial * 86_400_000.0).round();
    if n_millis > i64::MAX as f64 {
        return None;
    }
    date_epoch
        .and_hms_opt(0, 0, 0)?
        .checked_add_signed(TimeDelta::try_milliseconds(n_millis as i64)?)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ColumnWidth

/// Display width of text, counting non-ASCII chars as wider glyphs.
pub fn estimate_unicode_string_width(s: &str) -> usize {
    let n_ascii = s.chars().filter(|chr| chr.is_ascii()).count();
    let n_non_ascii = s.chars().count().saturating_sub(n_ascii);
    n_ascii + (n_non_ascii as f64 * 1.6).round() as usize
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
