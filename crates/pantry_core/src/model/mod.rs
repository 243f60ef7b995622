//! Recipe-domain model.
//!
//! # Responsibility
//! - Define the records persisted by the repositories.
//! - Enforce application-level invariants through `validate()`.
//!
//! # Invariants
//! - Every top-level record is identified by a stable UUID.
//! - Names shown to the user are never blank.
//! - Quantities and conversion rates are finite and strictly positive.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod ingredient;
pub mod meal;
pub mod measure;
pub mod recipe;
pub mod shopping;

/// Model invariant violation detected before a write or after a read.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A required text field is empty after trimming.
    BlankField(&'static str),
    /// A numeric field must be finite and greater than zero.
    NotPositive { field: &'static str, value: f64 },
    /// A numeric field is outside its allowed range.
    OutOfRange {
        field: &'static str,
        message: String,
    },
    /// A conversion cannot map a measure onto itself.
    SelfConversion,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankField(field) => write!(f, "{field} must not be blank"),
            Self::NotPositive { field, value } => {
                write!(f, "{field} must be a positive finite number, got {value}")
            }
            Self::OutOfRange { field, message } => write!(f, "{field} out of range: {message}"),
            Self::SelfConversion => write!(f, "conversion source and target must differ"),
        }
    }
}

impl Error for ValidationError {}

pub(crate) fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::BlankField(field));
    }
    Ok(())
}

pub(crate) fn require_positive(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ValidationError::NotPositive { field, value });
    }
    Ok(())
}
