//! Environment-driven runtime configuration.
//!
//! Every value has a default so an empty environment yields a usable config.

use crate::logging::default_log_level;
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "PANTRY_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "PANTRY_LOG_LEVEL";
pub const ENV_PLC_DIRECTORY: &str = "PANTRY_PLC_DIRECTORY";
pub const ENV_OAUTH_CLIENT_ID: &str = "PANTRY_OAUTH_CLIENT_ID";
pub const ENV_OAUTH_REDIRECT_URI: &str = "PANTRY_OAUTH_REDIRECT_URI";
pub const ENV_OAUTH_SCOPE: &str = "PANTRY_OAUTH_SCOPE";

pub const DEFAULT_DB_FILE_NAME: &str = "pantry.sqlite3";
pub const DEFAULT_PLC_DIRECTORY: &str = "https://plc.directory";
pub const DEFAULT_OAUTH_CLIENT_ID: &str = "http://localhost";
pub const DEFAULT_OAUTH_REDIRECT_URI: &str = "http://127.0.0.1/callback";
pub const DEFAULT_OAUTH_SCOPE: &str = "atproto";

/// Resolved runtime settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    pub plc_directory: String,
    pub oauth_client_id: String,
    pub oauth_redirect_uri: String,
    pub oauth_scope: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level().to_string(),
            plc_directory: DEFAULT_PLC_DIRECTORY.to_string(),
            oauth_client_id: DEFAULT_OAUTH_CLIENT_ID.to_string(),
            oauth_redirect_uri: DEFAULT_OAUTH_REDIRECT_URI.to_string(),
            oauth_scope: DEFAULT_OAUTH_SCOPE.to_string(),
        }
    }
}

impl CoreConfig {
    /// Reads the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup; blank values fall back
    /// to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();

        Self {
            db_path: read(ENV_DB_PATH)
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            log_level: read(ENV_LOG_LEVEL).unwrap_or(defaults.log_level),
            plc_directory: read(ENV_PLC_DIRECTORY)
                .map(|value| value.trim_end_matches('/').to_string())
                .unwrap_or(defaults.plc_directory),
            oauth_client_id: read(ENV_OAUTH_CLIENT_ID).unwrap_or(defaults.oauth_client_id),
            oauth_redirect_uri: read(ENV_OAUTH_REDIRECT_URI)
                .unwrap_or(defaults.oauth_redirect_uri),
            oauth_scope: read(ENV_OAUTH_SCOPE).unwrap_or(defaults.oauth_scope),
        }
    }
}
