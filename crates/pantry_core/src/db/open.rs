//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections, creating the parent
//!   directory of a database file when missing.
//! - Configure connection pragmas required by core behavior.
//! - Trigger schema migrations before returning a usable connection.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON`.
//! - Returned connections have migrations fully applied.

use super::migrations::{apply_migrations, reset_schema};
use super::{DbError, DbResult};
use log::{error, info, warn};
use rusqlite::Connection;
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection bootstrap options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenOptions {
    /// Drop every application table and rebuild the schema when the file
    /// carries a schema version newer than this binary understands.
    ///
    /// Data is lost in that case. Off by default.
    pub destructive_fallback: bool,
}

impl OpenOptions {
    /// Options used by the mobile shell: a downgraded app must still start.
    pub fn app_default() -> Self {
        Self {
            destructive_fallback: true,
        }
    }
}

/// Opens a SQLite database file and applies all pending migrations.
///
/// Newer-than-supported schemas are rejected; see [`open_db_with`].
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    open_db_with(path, OpenOptions::default())
}

/// Opens a SQLite database file with explicit bootstrap options.
///
/// # Side effects
/// - Performs connection bootstrap and migration checks.
/// - Emits `db_open` logging events with duration and status.
pub fn open_db_with(path: impl AsRef<Path>, options: OpenOptions) -> DbResult<Connection> {
    let path = path.as_ref();
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode=file");

    ensure_parent_dir(path)?;
    match Connection::open(path) {
        Ok(conn) => finish_open(conn, options, "file", started_at),
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode=file duration_ms={} error_code=db_open_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(err.into())
        }
    }
}

/// Opens an in-memory SQLite database and applies all pending migrations.
pub fn open_db_in_memory() -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode=memory");

    match Connection::open_in_memory() {
        Ok(conn) => finish_open(conn, OpenOptions::default(), "memory", started_at),
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode=memory duration_ms={} error_code=db_open_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(err.into())
        }
    }
}

fn ensure_parent_dir(path: &Path) -> DbResult<()> {
    let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) else {
        return Ok(());
    };
    fs::create_dir_all(parent).map_err(|source| {
        error!("event=db_open module=db status=error mode=file error_code=db_dir_failed");
        DbError::Io {
            path: parent.to_path_buf(),
            source,
        }
    })
}

fn finish_open(
    mut conn: Connection,
    options: OpenOptions,
    mode: &str,
    started_at: Instant,
) -> DbResult<Connection> {
    match bootstrap_connection(&mut conn, options) {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode={} duration_ms={}",
                mode,
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_bootstrap_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn bootstrap_connection(conn: &mut Connection, options: OpenOptions) -> DbResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;

    match apply_migrations(conn) {
        Err(DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        }) if options.destructive_fallback => {
            warn!(
                "event=db_reset module=db status=start reason=schema_newer db_version={} latest_supported={}",
                db_version, latest_supported
            );
            reset_schema(conn)?;
            apply_migrations(conn)?;
            info!("event=db_reset module=db status=ok");
            Ok(())
        }
        other => other,
    }
}
