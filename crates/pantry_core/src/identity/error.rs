//! Identity client error type.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub type IdentityResult<T> = Result<T, IdentityError>;

#[derive(Debug)]
pub enum IdentityError {
    /// Input is neither a DNS-style handle nor a DID.
    InvalidHandle(String),
    /// DID has an unsupported method or malformed body.
    InvalidDid(String),
    /// Transport failure before a response was received.
    Http { url: String, message: String },
    /// Non-success HTTP status.
    Status { url: String, status: u16 },
    /// Response body could not be decoded.
    Decode { url: String, message: String },
    /// A required endpoint or document field is absent or malformed.
    MissingService(String),
    /// Authorization server metadata names a different issuer.
    IssuerMismatch { expected: String, actual: String },
    /// Callback `state` differs from the pending session.
    StateMismatch,
    /// Token response `sub` differs from the resolved DID.
    SubjectMismatch { expected: String, actual: String },
    /// Authorization server redirected back with an error.
    Authorization(String),
    /// Secure random source failed.
    Entropy(String),
}

impl Display for IdentityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidHandle(value) => write!(f, "invalid handle: `{value}`"),
            Self::InvalidDid(value) => write!(f, "invalid DID: `{value}`"),
            Self::Http { url, message } => write!(f, "request to {url} failed: {message}"),
            Self::Status { url, status } => write!(f, "{url} responded with status {status}"),
            Self::Decode { url, message } => {
                write!(f, "unexpected response from {url}: {message}")
            }
            Self::MissingService(what) => write!(f, "missing or invalid {what}"),
            Self::IssuerMismatch { expected, actual } => {
                write!(f, "issuer mismatch: expected {expected}, got {actual}")
            }
            Self::StateMismatch => write!(f, "authorization state does not match"),
            Self::SubjectMismatch { expected, actual } => {
                write!(f, "token subject mismatch: expected {expected}, got {actual}")
            }
            Self::Authorization(message) => write!(f, "authorization failed: {message}"),
            Self::Entropy(message) => write!(f, "random source failed: {message}"),
        }
    }
}

impl Error for IdentityError {}
