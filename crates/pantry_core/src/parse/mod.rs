//! Free-text input parsers.

pub mod quantity;
