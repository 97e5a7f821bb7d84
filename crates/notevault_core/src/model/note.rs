//! Note domain model.
//!
//! # Responsibility
//! - Define the canonical note record persisted in `notes`.
//! - Validate optional metadata (location, notification offset).
//!
//! # Invariants
//! - `id` is `UNSAVED_NOTE_ID` until storage assigns one, then never changes.
//! - `modified_at` never moves backwards across successful writes.
//! - `location`, when set, is a `lat,long` pair of decimal degrees.

use crate::markdown::{derive_preview, first_image};
use crate::model::ModelValidationError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Storage-assigned note identifier (SQLite rowid).
pub type NoteId = i64;

/// Id carried by notes that have not been inserted yet.
pub const UNSAVED_NOTE_ID: NoteId = 0;

static LOCATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(-?\d{1,3}(?:\.\d+)?)\s*,\s*(-?\d{1,3}(?:\.\d+)?)\s*$")
        .expect("valid location regex")
});

/// A parsed `lat,long` location tag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Parses the persisted `lat,long` form.
    ///
    /// Returns `None` for malformed text or out-of-range coordinates.
    pub fn parse(value: &str) -> Option<Self> {
        let caps = LOCATION_RE.captures(value)?;
        let latitude: f64 = caps.get(1)?.as_str().parse().ok()?;
        let longitude: f64 = caps.get(2)?.as_str().parse().ok()?;
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return None;
        }
        Some(Self {
            latitude,
            longitude,
        })
    }

    /// Formats the point the way it is persisted.
    pub fn to_storage_string(self) -> String {
        format!("{},{}", self.latitude, self.longitude)
    }
}

/// Canonical note record.
///
/// Writes replace the whole record, except the dedicated favorite/markdown/secret
/// flag updates which touch a single column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    /// Body text; Markdown when `is_markdown_enabled`.
    pub content: String,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds. Drives list ordering.
    pub modified_at: i64,
    pub location: Option<String>,
    /// Reminder offset in milliseconds, scheduled by the notification collaborator.
    pub notification_offset: Option<i64>,
    pub is_favorite: bool,
    pub is_markdown_enabled: bool,
    /// Vault membership.
    pub is_secret: bool,
    pub is_notification_persistent: bool,
}

impl Note {
    /// Creates an unsaved note stamped with `now` for both timestamps.
    pub fn new(title: impl Into<String>, content: impl Into<String>, now: i64) -> Self {
        Self {
            id: UNSAVED_NOTE_ID,
            title: title.into(),
            content: content.into(),
            created_at: now,
            modified_at: now,
            location: None,
            notification_offset: None,
            is_favorite: false,
            is_markdown_enabled: false,
            is_secret: false,
            is_notification_persistent: false,
        }
    }

    /// Returns whether storage has assigned an id.
    pub fn is_persisted(&self) -> bool {
        self.id != UNSAVED_NOTE_ID
    }

    /// Checks field constraints enforced on every write.
    ///
    /// Title and content may be empty.
    pub fn validate(&self) -> Result<(), ModelValidationError> {
        if let Some(location) = self.location.as_deref() {
            if GeoPoint::parse(location).is_none() {
                return Err(ModelValidationError::InvalidLocation(location.to_string()));
            }
        }

        if let Some(offset) = self.notification_offset {
            if offset < 0 {
                return Err(ModelValidationError::NegativeNotificationOffset(offset));
            }
        }

        if self.created_at > self.modified_at {
            return Err(ModelValidationError::CreatedAfterModified {
                created_at: self.created_at,
                modified_at: self.modified_at,
            });
        }

        Ok(())
    }

    /// Returns the parsed location tag, if any.
    pub fn geo_point(&self) -> Option<GeoPoint> {
        self.location.as_deref().and_then(GeoPoint::parse)
    }

    /// Returns a short plain-text summary for list rendering.
    pub fn preview_text(&self) -> Option<String> {
        derive_preview(&self.content, self.is_markdown_enabled)
    }

    /// Returns the first embedded image of a Markdown note.
    pub fn cover_image(&self) -> Option<String> {
        if self.is_markdown_enabled {
            first_image(&self.content)
        } else {
            None
        }
    }

    /// Case-insensitive substring match over title or content.
    pub fn matches_query(&self, needle_lowercase: &str) -> bool {
        self.title.to_lowercase().contains(needle_lowercase)
            || self.content.to_lowercase().contains(needle_lowercase)
    }
}
