//! Persistence and state synchronization core for NoteVault.
//! This crate is the single source of truth for note storage invariants.

pub mod app;
pub mod clock;
pub mod config;
pub mod db;
pub mod live;
pub mod logging;
pub mod markdown;
pub mod model;
pub mod prefs;
pub mod repo;
pub mod service;
pub mod state;
pub mod store;

pub use app::{AppContext, AppError, AppResult};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::CoreConfig;
pub use db::{open_db, open_db_in_memory, open_db_with, DbError, DbResult, OpenOptions};
pub use live::{InvalidationTracker, LiveQuery, Table};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::category::{Category, CategoryId, NoteCategoryCrossRef};
pub use model::note::{GeoPoint, Note, NoteId};
pub use model::ModelValidationError;
pub use prefs::{NoteFilter, PrefError, PrefResult, PreferenceStore, Profile, StartAction, ThemeMode};
pub use repo::category_repo::{CategoryRepository, SqliteCategoryRepository};
pub use repo::note_repo::{NoteQuery, NoteRepository, SqliteNoteRepository};
pub use repo::{RepoError, RepoResult};
pub use service::category_service::CategoryService;
pub use service::note_service::NoteService;
pub use service::{ServiceError, ServiceResult};
pub use state::{NoteSynchronizer, SyncError, SyncResult};
pub use store::Store;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
