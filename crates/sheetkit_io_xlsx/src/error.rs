//! Error taxonomy for mapping, reading and rendering.

use thiserror::Error;

use crate::spec::{SpecConversionError, SpecFieldViolation};

/// Result alias used across the crate.
pub type XlsxMapResult<T> = Result<T, XlsxMapError>;

/// Top-level error for every read/write/configuration call.
#[derive(Debug, Error)]
pub enum XlsxMapError {
    /// Invalid column attribute, schema or writer declaration.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A declared column is missing, or the schema binds no column.
    #[error("{0}")]
    Resolution(String),

    /// A cell value cannot be coerced to its field type.
    #[error("{message}")]
    Cast {
        /// Rendered message template.
        message: String,
        /// Failed cell details.
        detail: Box<SpecConversionError>,
    },

    /// A built record was rejected by the validator.
    #[error("row {row} failed validation: {}", join_violations(.violations))]
    Validation {
        /// 1-based worksheet row.
        row: usize,
        /// Field-level violations.
        violations: Vec<SpecFieldViolation>,
    },

    /// Unknown worksheet or table.
    #[error("{0}")]
    DocumentStructure(String),

    /// Workbook parsing failed.
    #[error("xlsx read error: {0}")]
    Read(#[from] calamine::XlsxError),

    /// Workbook rendering or serialization failed.
    #[error("xlsx write error: {0}")]
    Write(#[from] rust_xlsxwriter::XlsxError),

    /// Filesystem access failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl XlsxMapError {
    /// Conversion details of a cast error.
    pub fn conversion(&self) -> Option<&SpecConversionError> {
        match self {
            Self::Cast { detail, .. } => Some(detail),
            _ => None,
        }
    }
}

fn join_violations(violations: &[SpecFieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
