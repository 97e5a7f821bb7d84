//! Domain model for notes, categories and their links.
//!
//! # Responsibility
//! - Define canonical data structures used by repositories and services.
//! - Own field-level validation rules shared by every write path.
//!
//! # Invariants
//! - Note and category ids are assigned by storage and never change.
//! - Deletion is a hard delete; there are no tombstones.

pub mod category;
pub mod note;

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Field-level validation failures for notes and categories.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelValidationError {
    /// Location is not a `lat,long` pair within coordinate bounds.
    InvalidLocation(String),
    /// Notification offset must not be negative.
    NegativeNotificationOffset(i64),
    /// Creation timestamp lies after the modification timestamp.
    CreatedAfterModified { created_at: i64, modified_at: i64 },
    /// Category name is empty after trimming.
    BlankCategoryName,
    /// Category emoji is empty after trimming.
    BlankCategoryEmoji,
}

impl Display for ModelValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidLocation(value) => {
                write!(f, "location `{value}` is not a valid `lat,long` pair")
            }
            Self::NegativeNotificationOffset(value) => {
                write!(f, "notification offset must be >= 0, got {value}")
            }
            Self::CreatedAfterModified {
                created_at,
                modified_at,
            } => write!(
                f,
                "created_at ({created_at}) must not be after modified_at ({modified_at})"
            ),
            Self::BlankCategoryName => write!(f, "category name must not be blank"),
            Self::BlankCategoryEmoji => write!(f, "category emoji must not be blank"),
        }
    }
}

impl Error for ModelValidationError {}
