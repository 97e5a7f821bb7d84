//! Repository layer contracts and SQLite implementations.
//!
//! # Responsibility
//! - Define typed data access contracts for notes and categories.
//! - Isolate SQLite query details from services and state synchronization.
//!
//! # Invariants
//! - Write paths validate records before SQL mutations.
//! - Updates and deletes against missing rows report `NotFound` instead of
//!   silently succeeding.
//! - Read paths reject invalid persisted state instead of masking it.

pub mod category_repo;
pub mod note_repo;

use crate::db::DbError;
use crate::model::category::CategoryId;
use crate::model::note::NoteId;
use crate::model::ModelValidationError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for note/category persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ModelValidationError),
    Db(DbError),
    NoteNotFound(NoteId),
    CategoryNotFound(CategoryId),
    /// Another category already uses this name (ignoring case).
    DuplicateCategory(String),
    InvalidData(String),
}

impl RepoError {
    /// Returns whether the failure is a transient storage condition.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Db(err) => err.is_transient(),
            _ => false,
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NoteNotFound(id) => write!(f, "note not found: {id}"),
            Self::CategoryNotFound(id) => write!(f, "category not found: {id}"),
            Self::DuplicateCategory(name) => write!(f, "category already exists: `{name}`"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NoteNotFound(_) => None,
            Self::CategoryNotFound(_) => None,
            Self::DuplicateCategory(_) => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<ModelValidationError> for RepoError {
    fn from(value: ModelValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

pub(crate) fn int_to_bool(value: i64, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}
