//! Validation bridge invoked on every built record.

use regex::Regex;

use crate::coerce::IntoCellValue;
use crate::error::{XlsxMapError, XlsxMapResult};
use crate::spec::{EnumCellValue, SpecFieldViolation};

/// Record-level validator. An empty result means the record is valid.
pub trait RecordValidator<T> {
    fn validate(&self, record: &T) -> Vec<SpecFieldViolation>;
}

impl<T, F> RecordValidator<T> for F
where
    F: Fn(&T) -> Vec<SpecFieldViolation>,
{
    fn validate(&self, record: &T) -> Vec<SpecFieldViolation> {
        self(record)
    }
}

type FnFieldRule<T> = Box<dyn Fn(&T) -> Option<String>>;

/// Declarative per-field rules (required, range, length, pattern, custom).
///
/// Range, length and pattern rules ignore empty values; combine them with
/// [`SpecRuleValidator::required`] to reject blanks.
pub struct SpecRuleValidator<T> {
    l_rules: Vec<(String, FnFieldRule<T>)>,
}

impl<T: 'static> SpecRuleValidator<T> {
    pub fn new() -> Self {
        Self {
            l_rules: Vec::new(),
        }
    }

    /// Reject empty values.
    pub fn required<V, G>(self, field: &str, get: G) -> Self
    where
        V: IntoCellValue + 'static,
        G: Fn(&T) -> &V + 'static,
    {
        self.rule(field, move |record: &T| {
            get(record)
                .to_cell_value()
                .is_empty()
                .then(|| "is required".to_string())
        })
    }

    /// Numeric value must lie in `[min, max]`.
    pub fn range<V, G>(self, field: &str, get: G, min: f64, max: f64) -> Self
    where
        V: IntoCellValue + 'static,
        G: Fn(&T) -> &V + 'static,
    {
        self.rule(field, move |record: &T| {
            let n_value = match get(record).to_cell_value() {
                EnumCellValue::Integer(n) => n as f64,
                EnumCellValue::Number(n) => n,
                EnumCellValue::None => return None,
                other => return Some(format!("must be numeric, got {}", other.type_label())),
            };
            (n_value < min || n_value > max).then(|| format!("must be between {min} and {max}"))
        })
    }

    /// Text length (in chars) must lie in `[min, max]`.
    pub fn length<G>(self, field: &str, get: G, min: usize, max: usize) -> Self
    where
        G: Fn(&T) -> &str + 'static,
    {
        self.rule(field, move |record: &T| {
            let c_value = get(record);
            if c_value.is_empty() {
                return None;
            }
            let n_len = c_value.chars().count();
            (n_len < min || n_len > max)
                .then(|| format!("length must be between {min} and {max}, got {n_len}"))
        })
    }

    /// Text must match `pattern` in full.
    pub fn pattern<G>(self, field: &str, get: G, pattern: &str) -> XlsxMapResult<Self>
    where
        G: Fn(&T) -> &str + 'static,
    {
        let regex = Regex::new(&format!("^(?:{pattern})$")).map_err(|e| {
            XlsxMapError::Configuration(format!("invalid pattern for '{field}': {e}"))
        })?;
        let c_pattern = pattern.to_string();
        Ok(self.rule(field, move |record: &T| {
            let c_value = get(record);
            (!c_value.is_empty() && !regex.is_match(c_value))
                .then(|| format!("does not match pattern '{c_pattern}'"))
        }))
    }

    /// Custom rule returning a violation message.
    pub fn rule(mut self, field: &str, check: impl Fn(&T) -> Option<String> + 'static) -> Self {
        self.l_rules.push((field.to_string(), Box::new(check)));
        self
    }
}

impl<T: 'static> Default for SpecRuleValidator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RecordValidator<T> for SpecRuleValidator<T> {
    fn validate(&self, record: &T) -> Vec<SpecFieldViolation> {
        self.l_rules
            .iter()
            .filter_map(|(field, check)| {
                check(record).map(|message| SpecFieldViolation::new(field.clone(), message))
            })
            .collect()
    }
}
