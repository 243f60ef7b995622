//! Measure conversion lookup.
//!
//! # Responsibility
//! - Convert an amount between two measures using one stored rate.
//!
//! # Invariants
//! - Same source and target is the identity and never touches storage.
//! - Only the directed `(from, to)` row is consulted: no inverse fallback,
//!   no chaining through intermediate measures.

use crate::model::measure::{Measure, MeasureId};
use crate::repo::measure_repo::MeasureRepository;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Conversion lookup failure.
#[derive(Debug)]
pub enum ConversionError {
    /// Amount is NaN or infinite.
    InvalidAmount(f64),
    /// No stored rate for the directed pair.
    MissingRate { from: MeasureId, to: MeasureId },
    /// A measure label did not resolve to a catalog measure.
    UnknownMeasure(String),
    Repo(RepoError),
}

impl Display for ConversionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidAmount(value) => write!(f, "amount must be finite, got {value}"),
            Self::MissingRate { from, to } => {
                write!(f, "no conversion stored from {from} to {to}")
            }
            Self::UnknownMeasure(label) => write!(f, "unknown measure: `{label}`"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ConversionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ConversionError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Converts `amount` from one measure into another using the stored rate.
pub fn convert<M: MeasureRepository + ?Sized>(
    repo: &M,
    amount: f64,
    from: MeasureId,
    to: MeasureId,
) -> Result<f64, ConversionError> {
    if !amount.is_finite() {
        return Err(ConversionError::InvalidAmount(amount));
    }
    if from == to {
        return Ok(amount);
    }

    match repo.get_conversion(from, to)? {
        Some(conversion) => Ok(conversion.apply(amount)),
        None => Err(ConversionError::MissingRate { from, to }),
    }
}

/// Resolves both measures by name/abbreviation, then calls [`convert`].
///
/// Returns the converted amount together with the resolved target measure.
pub fn convert_by_label<M: MeasureRepository + ?Sized>(
    repo: &M,
    amount: f64,
    from_label: &str,
    to_label: &str,
) -> Result<(f64, Measure), ConversionError> {
    let from = resolve_measure(repo, from_label)?;
    let to = resolve_measure(repo, to_label)?;
    let converted = convert(repo, amount, from.id, to.id)?;
    Ok((converted, to))
}

/// Product of the forward and inverse stored rates between `a` and `b`.
///
/// Returns `None` unless both directed rows exist. A consistent catalog
/// yields a value close to `1.0`.
pub fn round_trip_factor<M: MeasureRepository + ?Sized>(
    repo: &M,
    a: MeasureId,
    b: MeasureId,
) -> Result<Option<f64>, ConversionError> {
    if a == b {
        return Ok(Some(1.0));
    }
    let forward = repo.get_conversion(a, b)?;
    let inverse = repo.get_conversion(b, a)?;
    Ok(match (forward, inverse) {
        (Some(forward), Some(inverse)) => Some(forward.rate * inverse.rate),
        _ => None,
    })
}

fn resolve_measure<M: MeasureRepository + ?Sized>(
    repo: &M,
    label: &str,
) -> Result<Measure, ConversionError> {
    repo.find_measure_by_label(label)?
        .ok_or_else(|| ConversionError::UnknownMeasure(label.trim().to_string()))
}
