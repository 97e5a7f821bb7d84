//! Application root.
//!
//! # Responsibility
//! - Build the store, preferences, and services from one [`CoreConfig`].
//! - Hand out synchronizers bound to the shared store.
//!
//! # Invariants
//! - The context is built explicitly; there is no global instance.
//! - Opening fails before anything is served if migrations fail.

use crate::clock::{Clock, SystemClock};
use crate::config::CoreConfig;
use crate::db::{DbError, OpenOptions};
use crate::logging::init_logging;
use crate::prefs::{PrefError, PreferenceStore};
use crate::service::category_service::CategoryService;
use crate::service::note_service::NoteService;
use crate::state::NoteSynchronizer;
use crate::store::Store;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub type AppResult<T> = Result<T, AppError>;

/// Failures while building an [`AppContext`].
#[derive(Debug)]
pub enum AppError {
    Io(std::io::Error),
    Db(DbError),
    Prefs(PrefError),
    Logging(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "data directory error: {err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Prefs(err) => write!(f, "{err}"),
            Self::Logging(message) => write!(f, "logging init failed: {message}"),
        }
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Prefs(err) => Some(err),
            Self::Logging(_) => None,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<DbError> for AppError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<PrefError> for AppError {
    fn from(value: PrefError) -> Self {
        Self::Prefs(value)
    }
}

/// Everything a UI layer needs to talk to the note store.
#[derive(Clone)]
pub struct AppContext {
    pub store: Store,
    pub notes: NoteService,
    pub categories: CategoryService,
    pub preferences: Arc<PreferenceStore>,
    pub clock: Arc<dyn Clock>,
}

impl AppContext {
    /// Opens the database and preferences under `config.data_dir`.
    pub fn open(config: &CoreConfig) -> AppResult<Self> {
        if let Some(log_dir) = config.log_dir() {
            init_logging(&config.log_level, log_dir).map_err(AppError::Logging)?;
        }
        std::fs::create_dir_all(&config.data_dir)?;

        let options = OpenOptions {
            allow_destructive_reset: config.allow_destructive_reset,
            ..OpenOptions::default()
        };
        let store = Store::open(config.db_path(), &options)?;
        let preferences = PreferenceStore::open(config.prefs_path())?;
        info!(
            "event=app_open module=app status=ok destructive_reset={}",
            config.allow_destructive_reset
        );
        Ok(Self::assemble(store, preferences, Arc::new(SystemClock)))
    }

    /// Fresh in-memory database and preferences.
    pub fn open_in_memory() -> AppResult<Self> {
        let store = Store::open_in_memory()?;
        Ok(Self::assemble(
            store,
            PreferenceStore::in_memory(),
            Arc::new(SystemClock),
        ))
    }

    /// Replaces the time source used by synchronizers built afterwards.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// New synchronizer for one screen; drop it when the screen goes away.
    pub fn note_synchronizer(&self) -> NoteSynchronizer {
        NoteSynchronizer::new(self.notes.clone(), Arc::clone(&self.clock))
    }

    fn assemble(store: Store, preferences: PreferenceStore, clock: Arc<dyn Clock>) -> Self {
        Self {
            notes: NoteService::new(store.clone()),
            categories: CategoryService::new(store.clone()),
            store,
            preferences: Arc::new(preferences),
            clock,
        }
    }
}
