//! Category model and the note/category association.

use crate::db::migrations::DEFAULT_CATEGORY_EMOJI;
use crate::model::note::NoteId;
use crate::model::ModelValidationError;
use serde::{Deserialize, Serialize};

/// Storage-assigned category identifier.
pub type CategoryId = i64;

/// Id carried by categories that have not been inserted yet.
pub const UNSAVED_CATEGORY_ID: CategoryId = 0;

/// A user-defined note category.
///
/// Names are unique ignoring case; repositories enforce this, the schema does not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub category_id: CategoryId,
    pub name: String,
    pub emoji: String,
}

impl Category {
    /// Creates an unsaved category with the default emoji.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            category_id: UNSAVED_CATEGORY_ID,
            name: name.into(),
            emoji: DEFAULT_CATEGORY_EMOJI.to_string(),
        }
    }

    pub fn with_emoji(mut self, emoji: impl Into<String>) -> Self {
        self.emoji = emoji.into();
        self
    }

    /// Trims the name and checks that name and emoji are not blank.
    pub fn normalized(&self) -> Result<Self, ModelValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ModelValidationError::BlankCategoryName);
        }
        let emoji = self.emoji.trim();
        if emoji.is_empty() {
            return Err(ModelValidationError::BlankCategoryEmoji);
        }
        Ok(Self {
            category_id: self.category_id,
            name: name.to_string(),
            emoji: emoji.to_string(),
        })
    }
}

/// One row of the many-to-many `note_category_cross_ref` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NoteCategoryCrossRef {
    pub note_id: NoteId,
    pub category_id: CategoryId,
}

#[cfg(test)]
mod tests {
    use super::Category;
    use crate::db::migrations::DEFAULT_CATEGORY_EMOJI;
    use crate::model::ModelValidationError;

    #[test]
    fn new_category_uses_default_emoji() {
        assert_eq!(Category::new("Work").emoji, DEFAULT_CATEGORY_EMOJI);
    }

    #[test]
    fn normalized_trims_and_rejects_blank_fields() {
        let trimmed = Category::new("  Work ").normalized().unwrap();
        assert_eq!(trimmed.name, "Work");

        assert_eq!(
            Category::new("   ").normalized(),
            Err(ModelValidationError::BlankCategoryName)
        );
        assert_eq!(
            Category::new("Work").with_emoji(" ").normalized(),
            Err(ModelValidationError::BlankCategoryEmoji)
        );
    }
}
