//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into screen-level aggregates.
//! - Keep UI/FFI layers decoupled from storage details.

use crate::conversion::ConversionError;
use crate::parse::quantity::QuantityParseError;
use crate::repo::{EntityKind, RepoError};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod catalog_service;
pub mod home_service;
pub mod meal_service;
pub mod recipe_service;
pub mod shopping_service;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service error shared by the use-case facades.
#[derive(Debug)]
pub enum ServiceError {
    /// Target record does not exist.
    NotFound { kind: EntityKind, id: Uuid },
    /// Caller input rejected before touching storage.
    InvalidInput(String),
    /// Free-text quantity could not be parsed.
    Parse(QuantityParseError),
    /// Unit conversion failed for a reason other than a missing record.
    Conversion(ConversionError),
    /// Persistence-layer failure.
    Repo(RepoError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { kind, id } => write!(f, "{} not found: {id}", kind.label()),
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
            Self::Parse(err) => write!(f, "{err}"),
            Self::Conversion(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent state: {details}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::Conversion(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { kind, id } => Self::NotFound { kind, id },
            other => Self::Repo(other),
        }
    }
}

impl From<QuantityParseError> for ServiceError {
    fn from(value: QuantityParseError) -> Self {
        Self::Parse(value)
    }
}

impl From<ConversionError> for ServiceError {
    fn from(value: ConversionError) -> Self {
        match value {
            ConversionError::Repo(err) => err.into(),
            other => Self::Conversion(other),
        }
    }
}

pub(crate) fn not_found(kind: EntityKind, id: Uuid) -> ServiceError {
    ServiceError::NotFound { kind, id }
}
