//! UI/session preferences.
//!
//! # Responsibility
//! - Persist small key-value settings independently from the note database.
//! - Offer typed, validated accessors and reactive reads with defaults.
//!
//! # Invariants
//! - Writes are last-write-wins; there is no versioning or migration.
//! - Reading an absent or unparseable value yields the accessor's default.

mod store;
mod types;

pub use store::{PrefValue, PreferenceStore};
pub use types::{NoteFilter, Profile, StartAction, ThemeMode};

use std::error::Error;
use std::fmt::{Display, Formatter};

pub type PrefResult<T> = Result<T, PrefError>;

/// Preference keys as persisted in the preferences file.
pub mod keys {
    pub const ACTIVE_FILTER: &str = "active_filter";
    pub const SELECTED_CATEGORY_ID: &str = "selected_category_id";
    pub const LAST_ROUTE: &str = "last_route";
    pub const THEME_MODE: &str = "theme_mode";
    pub const START_ACTION: &str = "start_action";
    pub const PROFILE_FIRST_NAME: &str = "profile_first_name";
    pub const PROFILE_LAST_NAME: &str = "profile_last_name";
    pub const PROFILE_BIRTH_DATE: &str = "profile_birth_date";
    pub const PROFILE_AVATAR: &str = "profile_avatar";
}

/// Preference persistence and validation failures.
#[derive(Debug)]
pub enum PrefError {
    Io(std::io::Error),
    Serde(serde_json::Error),
    /// Setter input is not an accepted value for `key`.
    InvalidValue { key: &'static str, value: String },
}

impl Display for PrefError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "preferences file error: {err}"),
            Self::Serde(err) => write!(f, "preferences file is malformed: {err}"),
            Self::InvalidValue { key, value } => {
                write!(f, "invalid value `{value}` for preference `{key}`")
            }
        }
    }
}

impl Error for PrefError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Serde(err) => Some(err),
            Self::InvalidValue { .. } => None,
        }
    }
}

impl From<std::io::Error> for PrefError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for PrefError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serde(value)
    }
}
