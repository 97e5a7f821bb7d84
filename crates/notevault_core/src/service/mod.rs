//! Async data access services.
//!
//! # Responsibility
//! - Expose typed one-shot reads, writes and reactive streams to callers.
//! - Keep callers off the blocking SQLite connection.
//!
//! # Invariants
//! - Every write goes through `Store::write`, so every stream reading an
//!   affected table re-evaluates.
//! - Services never bypass repository validation.

pub mod category_service;
pub mod note_service;

use crate::db::DbError;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service-level error for data access operations.
#[derive(Debug)]
pub enum ServiceError {
    /// Repository/persistence failure.
    Repo(RepoError),
    /// Connection lock is poisoned by an earlier panic.
    StoreUnavailable,
    /// Background task was cancelled or panicked.
    Background(String),
}

impl ServiceError {
    /// Returns whether the caller may retry the same operation.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Repo(err) => err.is_transient(),
            Self::StoreUnavailable | Self::Background(_) => false,
        }
    }

    /// Returns the repository error, if this is one.
    pub fn as_repo(&self) -> Option<&RepoError> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::StoreUnavailable => write!(f, "note store is unavailable"),
            Self::Background(details) => write!(f, "background task failed: {details}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<DbError> for ServiceError {
    fn from(value: DbError) -> Self {
        Self::Repo(RepoError::Db(value))
    }
}
