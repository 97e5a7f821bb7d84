//! Shared handle to the note database.
//!
//! # Responsibility
//! - Own the single migrated SQLite connection of one note database.
//! - Run repository work on Tokio's blocking pool.
//! - Publish table invalidations after successful writes.
//!
//! # Invariants
//! - Writes are serialized through one connection lock.
//! - Invalidations are published only after a write returned `Ok`, and are
//!   tied to the blocking task, not to the awaiting caller.
//! - The handle is constructed explicitly and passed to its users; there is
//!   no process-wide instance.

use crate::db::{open_db_in_memory, open_db_with, DbResult, OpenOptions};
use crate::live::{InvalidationTracker, Table};
use crate::repo::RepoResult;
use crate::service::{ServiceError, ServiceResult};
use log::error;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

struct StoreInner {
    conn: Mutex<Connection>,
    tracker: InvalidationTracker,
}

/// Cloneable handle to one note database.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Store {
    /// Opens (and migrates) the database file at `path`.
    pub fn open(path: impl AsRef<Path>, options: &OpenOptions) -> DbResult<Self> {
        Ok(Self::from_connection(open_db_with(path, options)?))
    }

    /// Opens a fresh in-memory database.
    pub fn open_in_memory() -> DbResult<Self> {
        Ok(Self::from_connection(open_db_in_memory()?))
    }

    /// Wraps an already migrated connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                conn: Mutex::new(conn),
                tracker: InvalidationTracker::new(),
            }),
        }
    }

    pub fn tracker(&self) -> &InvalidationTracker {
        &self.inner.tracker
    }

    /// Runs a read-only closure on the blocking pool.
    pub async fn read<T, F>(&self, op: &'static str, work: F) -> ServiceResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> RepoResult<T> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        run_blocking(op, move || {
            let conn = inner.conn.lock().map_err(|_| ServiceError::StoreUnavailable)?;
            work(&conn).map_err(ServiceError::from)
        })
        .await
    }

    /// Runs a mutating closure on the blocking pool and invalidates `tables` once it succeeds.
    pub async fn write<T, F>(
        &self,
        op: &'static str,
        tables: &'static [Table],
        work: F,
    ) -> ServiceResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> RepoResult<T> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        run_blocking(op, move || {
            let mut conn = inner.conn.lock().map_err(|_| ServiceError::StoreUnavailable)?;
            let value = work(&mut conn).map_err(ServiceError::from)?;
            // Still on the blocking task, so a dropped caller cannot skip this.
            inner.tracker.notify(tables);
            Ok(value)
        })
        .await
    }
}

async fn run_blocking<T, F>(op: &'static str, work: F) -> ServiceResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> ServiceResult<T> + Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(result) => result,
        Err(join_err) => {
            error!(
                "event=store_task module=store status=error op={} error={}",
                op, join_err
            );
            Err(ServiceError::Background(join_err.to_string()))
        }
    }
}
