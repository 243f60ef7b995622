//! Measures and stored conversion rates.
//!
//! # Invariants
//! - A conversion is keyed by `(from_measure, to_measure)` and never maps a
//!   measure onto itself.
//! - `rate` is finite and strictly positive: `to = from * rate`.

use crate::model::{require_positive, require_text, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type MeasureId = Uuid;

/// A unit of measure such as "gram" / "g".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measure {
    pub id: MeasureId,
    pub name: String,
    pub abbreviation: String,
}

impl Measure {
    pub fn new(name: impl Into<String>, abbreviation: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), name, abbreviation)
    }

    pub fn with_id(
        id: MeasureId,
        name: impl Into<String>,
        abbreviation: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into().trim().to_string(),
            abbreviation: abbreviation.into().trim().to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("measure.name", &self.name)?;
        require_text("measure.abbreviation", &self.abbreviation)
    }
}

/// Stored rate between two measures.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeasureConversion {
    pub from_measure: MeasureId,
    pub to_measure: MeasureId,
    pub rate: f64,
}

impl MeasureConversion {
    pub fn new(from_measure: MeasureId, to_measure: MeasureId, rate: f64) -> Self {
        Self {
            from_measure,
            to_measure,
            rate,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.from_measure == self.to_measure {
            return Err(ValidationError::SelfConversion);
        }
        require_positive("measure_conversion.rate", self.rate)
    }

    /// Converts `amount` expressed in `from_measure` into `to_measure`.
    pub fn apply(&self, amount: f64) -> f64 {
        amount * self.rate
    }

    /// Returns the reciprocal conversion (`to -> from`).
    pub fn inverse(&self) -> Self {
        Self {
            from_measure: self.to_measure,
            to_measure: self.from_measure,
            rate: 1.0 / self.rate,
        }
    }
}
