//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections.
//! - Configure connection pragmas required by core behavior.
//! - Trigger schema migrations before returning a usable connection.
//!
//! # Invariants
//! - Returned connections have migrations fully applied.
//! - Destructive reset only happens when explicitly enabled and no upgrade
//!   route exists; it is always logged.

use super::migrations::{latest_version_of, migrate_to, registry, reset_schema, Migration};
use super::{DbError, DbResult};
use log::{error, info, warn};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

/// Bootstrap options for opening a note database.
#[derive(Debug, Clone, Copy)]
pub struct OpenOptions {
    /// Drop and rebuild the schema when no migration route exists.
    pub allow_destructive_reset: bool,
    /// Migration steps used to upgrade the stored schema.
    pub migrations: &'static [Migration],
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            allow_destructive_reset: false,
            migrations: registry(),
        }
    }
}

/// Opens a SQLite database file and applies all pending migrations.
///
/// # Side effects
/// - Performs connection bootstrap and migration checks.
/// - Emits `db_open` logging events with duration and status.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    open_db_with(path, &OpenOptions::default())
}

/// Opens a SQLite database file using explicit bootstrap options.
pub fn open_db_with(path: impl AsRef<Path>, options: &OpenOptions) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode=file");

    let conn = match Connection::open(path) {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode=file duration_ms={} error_code=db_open_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    finish_open(conn, options, "file", started_at)
}

/// Opens an in-memory SQLite database and applies all pending migrations.
///
/// # Side effects
/// - Performs connection bootstrap and migration checks.
/// - Emits `db_open` logging events with duration and status.
pub fn open_db_in_memory() -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode=memory");

    let conn = match Connection::open_in_memory() {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode=memory duration_ms={} error_code=db_open_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    finish_open(conn, &OpenOptions::default(), "memory", started_at)
}

fn finish_open(
    mut conn: Connection,
    options: &OpenOptions,
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

fn bootstrap_connection(conn: &mut Connection, options: &OpenOptions) -> DbResult<()> {
    conn.busy_timeout(Duration::from_secs(5))?;
    let target = latest_version_of(options.migrations);
    match migrate_to(conn, options.migrations, target) {
        Err(DbError::NoMigrationPath { from, to }) if options.allow_destructive_reset => {
            warn!(
                "event=db_destructive_reset module=db status=start from={} to={}",
                from, to
            );
            reset_schema(conn, options.migrations)
        }
        other => other,
    }
}
