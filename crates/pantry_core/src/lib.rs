//! Core domain logic for the Pantry recipe manager.
//! This crate is the single source of truth for business invariants.

pub mod config;
pub mod conversion;
pub mod db;
pub mod identity;
pub mod logging;
pub mod model;
pub mod parse;
pub mod repo;
pub mod search;
pub mod service;

pub use config::CoreConfig;
pub use conversion::{convert, convert_by_label, ConversionError};
pub use db::{open_db, open_db_in_memory, open_db_with, DbError, DbResult, OpenOptions};
pub use logging::{default_log_level, init_logging, logging_status};
pub use parse::quantity::{parse_quantity, ParsedQuantity, QuantityParseError};
pub use repo::{EntityKind, RepoError, RepoResult};
pub use search::fts::{search_all, SearchError, SearchHit, SearchKind, SearchQuery, SearchResult};
pub use service::{ServiceError, ServiceResult};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
