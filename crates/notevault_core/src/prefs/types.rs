//! Typed preference values.

use crate::model::category::CategoryId;
use crate::repo::note_repo::NoteQuery;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static BIRTH_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").expect("valid birth date regex"));

/// App color scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThemeMode {
    /// Follow the OS setting.
    #[default]
    System,
    Light,
    Dark,
    /// Pure black background for OLED panels.
    OledDark,
}

impl ThemeMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Light => "light",
            Self::Dark => "dark",
            Self::OledDark => "oled_dark",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "system" => Some(Self::System),
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            "oled_dark" | "oled-dark" | "oled" => Some(Self::OledDark),
            _ => None,
        }
    }
}

/// What the app shows on launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartAction {
    #[default]
    ShowList,
    /// Open a blank draft immediately.
    QuickNote,
}

impl StartAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ShowList => "show_list",
            Self::QuickNote => "quick_note",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "show_list" | "show-list" => Some(Self::ShowList),
            "quick_note" | "quick-note" => Some(Self::QuickNote),
            _ => None,
        }
    }
}

/// Active note list filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteFilter {
    #[default]
    All,
    Favorites,
    WithLocation,
    /// Notes in the selected category.
    Category,
    Vault,
}

impl NoteFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Favorites => "favorites",
            Self::WithLocation => "with_location",
            Self::Category => "category",
            Self::Vault => "vault",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all" => Some(Self::All),
            "favorites" => Some(Self::Favorites),
            "with_location" => Some(Self::WithLocation),
            "category" => Some(Self::Category),
            "vault" => Some(Self::Vault),
            _ => None,
        }
    }

    /// Maps the filter to a list query.
    ///
    /// `Category` without a selected category falls back to every note.
    pub fn to_query(self, selected_category: Option<CategoryId>) -> NoteQuery {
        match (self, selected_category) {
            (Self::All, _) => NoteQuery::All,
            (Self::Favorites, _) => NoteQuery::Favorites,
            (Self::WithLocation, _) => NoteQuery::WithLocation,
            (Self::Vault, _) => NoteQuery::Secret,
            (Self::Category, Some(id)) => NoteQuery::CategoryId(id),
            (Self::Category, None) => NoteQuery::All,
        }
    }
}

/// User profile fields shown on the profile screen.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Profile {
    pub first_name: String,
    pub last_name: String,
    /// `YYYY-MM-DD`.
    pub birth_date: Option<String>,
    /// URI or path of the avatar image.
    pub avatar: Option<String>,
}

/// Returns whether `value` is a plausible `YYYY-MM-DD` date.
pub(crate) fn is_valid_birth_date(value: &str) -> bool {
    let Some(caps) = BIRTH_DATE_RE.captures(value) else {
        return false;
    };
    let month: u32 = caps[2].parse().unwrap_or(0);
    let day: u32 = caps[3].parse().unwrap_or(0);
    (1..=12).contains(&month) && (1..=31).contains(&day)
}
