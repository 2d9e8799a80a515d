//! Errors raised while normalizing a legacy step.

use thiserror::Error;

/// A defect in the options of a single legacy step.
///
/// Normalization errors never abort a whole model: the offending step is
/// dropped and the error is reported as a warning.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("required option not found: {0}")]
    MissingField(&'static str),

    #[error("option `{field}` is not a number: `{value}`")]
    InvalidNumber { field: &'static str, value: String },

    #[error("option `{field}` is not a color: `{value}`")]
    InvalidColor { field: &'static str, value: String },

    #[error("unsupported geometry: {0}")]
    UnsupportedGeometry(String),
}
