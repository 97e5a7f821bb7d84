//! SQLite storage bootstrap and schema migration entry points.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the note store.
//! - Upgrade persisted schemas through the forward-only migration chain.
//!
//! # Invariants
//! - Schema version is tracked via `PRAGMA user_version`.
//! - Core code must not read/write note data before migrations succeed.
//! - A failed upgrade leaves the database at its previous version.

use rusqlite::ErrorCode;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory, open_db_with, OpenOptions};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// Stored schema is newer than anything this binary knows about.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// No registered migration route leads from `from` to `to`.
    NoMigrationPath {
        from: u32,
        to: u32,
    },
    /// One migration step failed; the whole upgrade was rolled back.
    MigrationFailed {
        from: u32,
        to: u32,
        source: rusqlite::Error,
    },
}

impl DbError {
    /// Returns whether retrying the same operation may succeed.
    ///
    /// Only busy/locked database states and I/O failures qualify. Constraint
    /// violations and schema problems are permanent for the given input.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Sqlite(err) => is_transient_sqlite(err),
            Self::MigrationFailed { source, .. } => is_transient_sqlite(source),
            Self::UnsupportedSchemaVersion { .. } | Self::NoMigrationPath { .. } => false,
        }
    }
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::NoMigrationPath { from, to } => write!(
                f,
                "no migration path from schema version {from} to {to}"
            ),
            Self::MigrationFailed { from, to, source } => write!(
                f,
                "migration {from} -> {to} failed: {source}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::MigrationFailed { source, .. } => Some(source),
            Self::UnsupportedSchemaVersion { .. } => None,
            Self::NoMigrationPath { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

fn is_transient_sqlite(err: &rusqlite::Error) -> bool {
    matches!(
        err.sqlite_error_code(),
        Some(
            ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked
                | ErrorCode::SystemIoFailure
                | ErrorCode::DiskFull
                | ErrorCode::CannotOpen
        )
    )
}

#[cfg(test)]
mod tests {
    use super::DbError;
    use rusqlite::ffi;

    fn sqlite_failure(code: i32) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(ffi::Error::new(code), None)
    }

    #[test]
    fn busy_and_io_failures_are_transient() {
        assert!(DbError::Sqlite(sqlite_failure(ffi::SQLITE_BUSY)).is_transient());
        assert!(DbError::Sqlite(sqlite_failure(ffi::SQLITE_IOERR)).is_transient());
    }

    #[test]
    fn constraint_and_schema_failures_are_permanent() {
        assert!(!DbError::Sqlite(sqlite_failure(ffi::SQLITE_CONSTRAINT)).is_transient());
        assert!(!DbError::NoMigrationPath { from: 2, to: 7 }.is_transient());
        assert!(!DbError::UnsupportedSchemaVersion {
            db_version: 99,
            latest_supported: 7
        }
        .is_transient());
    }
}
