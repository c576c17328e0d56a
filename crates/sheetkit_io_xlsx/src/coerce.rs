//! Conversion between tagged cell values and typed record fields.
//!
//! Each target kind has one conversion function matching every source
//! variant, so the full (source, target) table is visible in one place.
//! Target types without a [`FromCellValue`] impl cannot be registered on a
//! schema at all.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::conf::{TUP_DATE_FORMATS_INVARIANT, TUP_DATETIME_FORMATS_INVARIANT};
use crate::spec::{EnumCellValue, SpecCoerceFailure};
use crate::util::convert_excel_serial_to_datetime;

/// Typed field value readable from a cell.
pub trait FromCellValue: Sized {
    /// Target type name reported in conversion errors.
    const TYPE_NAME: &'static str;

    fn from_cell_value(value: &EnumCellValue) -> Result<Self, SpecCoerceFailure>;
}

/// Typed field value writable to a cell.
pub trait IntoCellValue {
    fn to_cell_value(&self) -> EnumCellValue;
}

////////////////////////////////////////////////////////////////////////////////
// #region ConversionTable

fn coerce_to_i64(value: &EnumCellValue, expected: &'static str) -> Result<i64, SpecCoerceFailure> {
    match value {
        EnumCellValue::Integer(n) => Ok(*n),
        EnumCellValue::Number(n) => coerce_f64_to_i64(*n, expected),
        EnumCellValue::Boolean(b) => Ok(i64::from(*b)),
        EnumCellValue::String(s) => {
            let c_trimmed = s.trim();
            if let Ok(n) = c_trimmed.parse::<i64>() {
                return Ok(n);
            }
            match c_trimmed.parse::<f64>() {
                Ok(n) => coerce_f64_to_i64(n, expected),
                Err(_) => Err(SpecCoerceFailure::new(expected, format!("{s:?} is not a number"))),
            }
        }
        EnumCellValue::None => Err(SpecCoerceFailure::new(expected, "cell is empty")),
        EnumCellValue::DateTime(_) | EnumCellValue::Error(_) => Err(SpecCoerceFailure::new(
            expected,
            format!("{} cannot be converted to a number", value.type_label()),
        )),
    }
}

fn coerce_f64_to_i64(n: f64, expected: &'static str) -> Result<i64, SpecCoerceFailure> {
    if !n.is_finite() {
        return Err(SpecCoerceFailure::new(expected, format!("{n} is not finite")));
    }
    let n_rounded = n.round_ties_even();
    if n_rounded < i64::MIN as f64 || n_rounded >= i64::MAX as f64 {
        return Err(SpecCoerceFailure::new(expected, format!("{n} is out of range")));
    }
    Ok(n_rounded as i64)
}

fn coerce_to_f64(value: &EnumCellValue, expected: &'static str) -> Result<f64, SpecCoerceFailure> {
    match value {
        EnumCellValue::Number(n) => Ok(*n),
        EnumCellValue::Integer(n) => Ok(*n as f64),
        EnumCellValue::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
        EnumCellValue::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| SpecCoerceFailure::new(expected, format!("{s:?} is not a number"))),
        EnumCellValue::None => Err(SpecCoerceFailure::new(expected, "cell is empty")),
        EnumCellValue::DateTime(_) | EnumCellValue::Error(_) => Err(SpecCoerceFailure::new(
            expected,
            format!("{} cannot be converted to a number", value.type_label()),
        )),
    }
}

fn coerce_to_bool(value: &EnumCellValue) -> Result<bool, SpecCoerceFailure> {
    match value {
        EnumCellValue::Boolean(b) => Ok(*b),
        EnumCellValue::Integer(n) => Ok(*n != 0),
        EnumCellValue::Number(n) => Ok(*n != 0.0),
        EnumCellValue::String(s) => {
            let c_value = s.trim();
            if c_value.eq_ignore_ascii_case("true") {
                Ok(true)
            } else if c_value.eq_ignore_ascii_case("false") {
                Ok(false)
            } else {
                Err(SpecCoerceFailure::new(
                    bool::TYPE_NAME,
                    format!("{s:?} is not a boolean"),
                ))
            }
        }
        EnumCellValue::None => Err(SpecCoerceFailure::new(bool::TYPE_NAME, "cell is empty")),
        EnumCellValue::DateTime(_) | EnumCellValue::Error(_) => Err(SpecCoerceFailure::new(
            bool::TYPE_NAME,
            format!("{} cannot be converted to a boolean", value.type_label()),
        )),
    }
}

fn coerce_to_datetime(
    value: &EnumCellValue,
    expected: &'static str,
) -> Result<NaiveDateTime, SpecCoerceFailure> {
    match value {
        EnumCellValue::DateTime(dt) => Ok(*dt),
        EnumCellValue::Number(n) => convert_excel_serial_to_datetime(*n)
            .ok_or_else(|| SpecCoerceFailure::new(expected, format!("{n} is not a date serial"))),
        EnumCellValue::Integer(n) => convert_excel_serial_to_datetime(*n as f64)
            .ok_or_else(|| SpecCoerceFailure::new(expected, format!("{n} is not a date serial"))),
        EnumCellValue::String(s) => parse_datetime_invariant(s)
            .ok_or_else(|| SpecCoerceFailure::new(expected, format!("{s:?} is not a date"))),
        EnumCellValue::None => Err(SpecCoerceFailure::new(expected, "cell is empty")),
        EnumCellValue::Boolean(_) | EnumCellValue::Error(_) => Err(SpecCoerceFailure::new(
            expected,
            format!("{} cannot be converted to a date", value.type_label()),
        )),
    }
}

/// Parse text with the locale-invariant layouts.
pub fn parse_datetime_invariant(text: &str) -> Option<NaiveDateTime> {
    let c_text = text.trim();
    for c_fmt in TUP_DATETIME_FORMATS_INVARIANT {
        if let Ok(dt) = NaiveDateTime::parse_from_str(c_text, c_fmt) {
            return Some(dt);
        }
    }
    for c_fmt in TUP_DATE_FORMATS_INVARIANT {
        if let Ok(date) = NaiveDate::parse_from_str(c_text, c_fmt) {
            return Some(date.and_time(NaiveTime::MIN));
        }
    }
    None
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Primitives

impl IntoCellValue for EnumCellValue {
    fn to_cell_value(&self) -> EnumCellValue {
        self.clone()
    }
}

impl FromCellValue for String {
    const TYPE_NAME: &'static str = "String";

    fn from_cell_value(value: &EnumCellValue) -> Result<Self, SpecCoerceFailure> {
        Ok(value.to_string())
    }
}

impl IntoCellValue for String {
    fn to_cell_value(&self) -> EnumCellValue {
        EnumCellValue::String(self.clone())
    }
}

impl FromCellValue for bool {
    const TYPE_NAME: &'static str = "bool";

    fn from_cell_value(value: &EnumCellValue) -> Result<Self, SpecCoerceFailure> {
        coerce_to_bool(value)
    }
}

impl IntoCellValue for bool {
    fn to_cell_value(&self) -> EnumCellValue {
        EnumCellValue::Boolean(*self)
    }
}

macro_rules! impl_cell_integer {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromCellValue for $ty {
                const TYPE_NAME: &'static str = stringify!($ty);

                fn from_cell_value(value: &EnumCellValue) -> Result<Self, SpecCoerceFailure> {
                    let n = coerce_to_i64(value, Self::TYPE_NAME)?;
                    <$ty>::try_from(n).map_err(|_| {
                        SpecCoerceFailure::new(Self::TYPE_NAME, format!("{n} is out of range"))
                    })
                }
            }

            impl IntoCellValue for $ty {
                fn to_cell_value(&self) -> EnumCellValue {
                    match i64::try_from(*self) {
                        Ok(n) => EnumCellValue::Integer(n),
                        Err(_) => EnumCellValue::Number(*self as f64),
                    }
                }
            }
        )*
    };
}

impl_cell_integer!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl FromCellValue for f64 {
    const TYPE_NAME: &'static str = "f64";

    fn from_cell_value(value: &EnumCellValue) -> Result<Self, SpecCoerceFailure> {
        coerce_to_f64(value, Self::TYPE_NAME)
    }
}

impl IntoCellValue for f64 {
    fn to_cell_value(&self) -> EnumCellValue {
        EnumCellValue::Number(*self)
    }
}

impl FromCellValue for f32 {
    const TYPE_NAME: &'static str = "f32";

    fn from_cell_value(value: &EnumCellValue) -> Result<Self, SpecCoerceFailure> {
        let n = coerce_to_f64(value, Self::TYPE_NAME)?;
        if n.is_finite() && n.abs() > f32::MAX as f64 {
            return Err(SpecCoerceFailure::new(
                Self::TYPE_NAME,
                format!("{n} is out of range"),
            ));
        }
        Ok(n as f32)
    }
}

impl IntoCellValue for f32 {
    fn to_cell_value(&self) -> EnumCellValue {
        EnumCellValue::Number(f64::from(*self))
    }
}

impl FromCellValue for NaiveDateTime {
    const TYPE_NAME: &'static str = "NaiveDateTime";

    fn from_cell_value(value: &EnumCellValue) -> Result<Self, SpecCoerceFailure> {
        coerce_to_datetime(value, Self::TYPE_NAME)
    }
}

impl IntoCellValue for NaiveDateTime {
    fn to_cell_value(&self) -> EnumCellValue {
        EnumCellValue::DateTime(*self)
    }
}

impl FromCellValue for NaiveDate {
    const TYPE_NAME: &'static str = "NaiveDate";

    fn from_cell_value(value: &EnumCellValue) -> Result<Self, SpecCoerceFailure> {
        coerce_to_datetime(value, Self::TYPE_NAME).map(|dt| dt.date())
    }
}

impl IntoCellValue for NaiveDate {
    fn to_cell_value(&self) -> EnumCellValue {
        EnumCellValue::DateTime(self.and_time(NaiveTime::MIN))
    }
}

impl<T: FromCellValue> FromCellValue for Option<T> {
    const TYPE_NAME: &'static str = T::TYPE_NAME;

    fn from_cell_value(value: &EnumCellValue) -> Result<Self, SpecCoerceFailure> {
        if value.is_empty() {
            return Ok(None);
        }
        T::from_cell_value(value).map(Some)
    }
}

impl<T: IntoCellValue> IntoCellValue for Option<T> {
    fn to_cell_value(&self) -> EnumCellValue {
        match self {
            Some(value) => value.to_cell_value(),
            None => EnumCellValue::None,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Enums

/// Enum readable by member name or by numeric code.
///
/// Pair with [`impl_cell_enum!`](crate::impl_cell_enum) to make it usable as a
/// record field.
pub trait SheetEnum: Copy + PartialEq + 'static {
    /// `(member name, numeric code, member)` in declaration order.
    const MEMBERS: &'static [(&'static str, i64, Self)];

    /// Member name.
    fn member_name(&self) -> &'static str {
        Self::MEMBERS
            .iter()
            .find(|(_, _, member)| member == self)
            .map_or("", |(name, _, _)| *name)
    }

    /// Member code.
    fn member_code(&self) -> Option<i64> {
        Self::MEMBERS
            .iter()
            .find(|(_, _, member)| member == self)
            .map(|(_, code, _)| *code)
    }
}

/// Coerce a cell to an enum member.
///
/// Text matches member names case-insensitively; numbers must equal a code.
pub fn coerce_enum<E: SheetEnum>(
    value: &EnumCellValue,
    expected: &'static str,
) -> Result<E, SpecCoerceFailure> {
    match value {
        EnumCellValue::String(s) => {
            let c_name = s.trim();
            if let Some((_, _, member)) = E::MEMBERS
                .iter()
                .find(|(name, _, _)| name.eq_ignore_ascii_case(c_name))
            {
                return Ok(*member);
            }
            // numeric text ("2") falls back to code lookup
            if let Ok(n) = c_name.parse::<i64>() {
                return find_enum_by_code(n, expected);
            }
            Err(SpecCoerceFailure::new(
                expected,
                format!("{s:?} is not a member name"),
            ))
        }
        EnumCellValue::Integer(_) | EnumCellValue::Number(_) | EnumCellValue::Boolean(_) => {
            let n = coerce_to_i64(value, expected)?;
            find_enum_by_code(n, expected)
        }
        EnumCellValue::None => Err(SpecCoerceFailure::new(expected, "cell is empty")),
        EnumCellValue::DateTime(_) | EnumCellValue::Error(_) => Err(SpecCoerceFailure::new(
            expected,
            format!("{} cannot be converted to an enum", value.type_label()),
        )),
    }
}

fn find_enum_by_code<E: SheetEnum>(code: i64, expected: &'static str) -> Result<E, SpecCoerceFailure> {
    E::MEMBERS
        .iter()
        .find(|(_, n, _)| *n == code)
        .map(|(_, _, member)| *member)
        .ok_or_else(|| SpecCoerceFailure::new(expected, format!("{code} is not a member code")))
}

/// Implement [`FromCellValue`] and [`IntoCellValue`] for a [`SheetEnum`].
///
/// Enums are written by member name.
#[macro_export]
macro_rules! impl_cell_enum {
    ($ty:ty) => {
        impl $crate::coerce::FromCellValue for $ty {
            const TYPE_NAME: &'static str = stringify!($ty);

            fn from_cell_value(
                value: &$crate::spec::EnumCellValue,
            ) -> Result<Self, $crate::spec::SpecCoerceFailure> {
                $crate::coerce::coerce_enum::<$ty>(value, Self::TYPE_NAME)
            }
        }

        impl $crate::coerce::IntoCellValue for $ty {
            fn to_cell_value(&self) -> $crate::spec::EnumCellValue {
                $crate::spec::EnumCellValue::String(
                    $crate::coerce::SheetEnum::member_name(self).to_string(),
                )
            }
        }
    };
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
