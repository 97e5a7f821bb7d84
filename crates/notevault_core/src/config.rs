//! Runtime configuration for [`crate::app::AppContext`].

use crate::logging::default_log_level;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_DB_FILE_NAME: &str = "notevault.sqlite3";
pub const DEFAULT_PREFS_FILE_NAME: &str = "preferences.json";

/// Where the store lives and how it is opened.
///
/// Every field except `data_dir` has a default, so a JSON config can be as
/// small as `{"data_dir": "/data/notes"}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CoreConfig {
    pub data_dir: PathBuf,
    #[serde(default = "default_db_file_name")]
    pub db_file_name: String,
    #[serde(default = "default_prefs_file_name")]
    pub prefs_file_name: String,
    #[serde(default = "default_level")]
    pub log_level: String,
    /// File logging starts only when set.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    /// Recreate the schema when a stored version has no upgrade path.
    /// Existing notes are lost.
    #[serde(default)]
    pub allow_destructive_reset: bool,
}

impl CoreConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            db_file_name: default_db_file_name(),
            prefs_file_name: default_prefs_file_name(),
            log_level: default_level(),
            log_dir: None,
            allow_destructive_reset: false,
        }
    }

    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn with_log_dir(mut self, log_dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(log_dir.into());
        self
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(&self.db_file_name)
    }

    pub fn prefs_path(&self) -> PathBuf {
        self.data_dir.join(&self.prefs_file_name)
    }

    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref()
    }
}

fn default_db_file_name() -> String {
    DEFAULT_DB_FILE_NAME.to_string()
}

fn default_prefs_file_name() -> String {
    DEFAULT_PREFS_FILE_NAME.to_string()
}

fn default_level() -> String {
    default_log_level().to_string()
}
