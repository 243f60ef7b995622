//! Search module entry points.
//!
//! # Responsibility
//! - Expose keyword search over recipes and ingredients.
//!
//! # See also
//! - `fts.rs` for the FTS5 implementation.

pub mod fts;
