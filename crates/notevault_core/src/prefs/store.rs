//! JSON-file backed preference store.

use super::keys;
use super::types::{is_valid_birth_date, NoteFilter, Profile, StartAction, ThemeMode};
use super::{PrefError, PrefResult};
use crate::live::LiveQuery;
use crate::model::category::CategoryId;
use crate::repo::note_repo::NoteQuery;
use log::{debug, error};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tokio::sync::watch;

type PrefMap = BTreeMap<String, PrefValue>;

/// One stored preference value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrefValue {
    Int(i64),
    Text(String),
}

impl PrefValue {
    fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            Self::Int(_) => None,
        }
    }

    fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            Self::Text(value) => value.trim().parse().ok(),
        }
    }
}

impl From<i64> for PrefValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for PrefValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for PrefValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Key-value preferences with typed accessors.
///
/// # Invariants
/// - A write is visible to readers only after it reached the file.
/// - Observers never see the same value twice in a row.
pub struct PreferenceStore {
    path: Option<PathBuf>,
    values: watch::Sender<PrefMap>,
    write_lock: Mutex<()>,
}

impl PreferenceStore {
    /// Loads preferences from `path`; a missing file starts empty.
    ///
    /// # Errors
    /// - [`PrefError::Io`] when the file exists but cannot be read.
    /// - [`PrefError::Serde`] when the file is not a JSON object of values.
    pub fn open(path: impl AsRef<Path>) -> PrefResult<Self> {
        let path = path.as_ref().to_path_buf();
        let values = match fs::read(&path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => PrefMap::new(),
            Ok(bytes) => serde_json::from_slice::<PrefMap>(&bytes)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => PrefMap::new(),
            Err(err) => return Err(err.into()),
        };
        debug!(
            "event=prefs_open module=prefs status=ok entries={}",
            values.len()
        );
        Ok(Self {
            path: Some(path),
            values: watch::channel(values).0,
            write_lock: Mutex::new(()),
        })
    }

    /// Preferences that live only as long as this value.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            values: watch::channel(PrefMap::new()).0,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self, key: &str) -> Option<PrefValue> {
        self.values.borrow().get(key).cloned()
    }

    /// Stores `value` under `key`, replacing any previous value.
    pub fn set(&self, key: &str, value: impl Into<PrefValue>) -> PrefResult<()> {
        let value = value.into();
        self.mutate(key, |map| {
            if map.get(key) == Some(&value) {
                return false;
            }
            map.insert(key.to_string(), value);
            true
        })
    }

    /// Removes `key`; returns whether it was present.
    pub fn remove(&self, key: &str) -> PrefResult<bool> {
        let mut removed = false;
        self.mutate(key, |map| {
            removed = map.remove(key).is_some();
            removed
        })?;
        Ok(removed)
    }

    pub fn theme_mode(&self) -> ThemeMode {
        theme_mode_of(&self.values.borrow())
    }

    pub fn set_theme_mode(&self, mode: ThemeMode) -> PrefResult<()> {
        self.set(keys::THEME_MODE, mode.as_str())
    }

    /// Parses and stores a raw theme name.
    pub fn set_theme_mode_str(&self, raw: &str) -> PrefResult<ThemeMode> {
        let mode = ThemeMode::parse(raw).ok_or_else(|| invalid(keys::THEME_MODE, raw))?;
        self.set_theme_mode(mode)?;
        Ok(mode)
    }

    pub fn start_action(&self) -> StartAction {
        start_action_of(&self.values.borrow())
    }

    pub fn set_start_action(&self, action: StartAction) -> PrefResult<()> {
        self.set(keys::START_ACTION, action.as_str())
    }

    pub fn set_start_action_str(&self, raw: &str) -> PrefResult<StartAction> {
        let action = StartAction::parse(raw).ok_or_else(|| invalid(keys::START_ACTION, raw))?;
        self.set_start_action(action)?;
        Ok(action)
    }

    pub fn active_filter(&self) -> NoteFilter {
        active_filter_of(&self.values.borrow())
    }

    pub fn set_active_filter(&self, filter: NoteFilter) -> PrefResult<()> {
        self.set(keys::ACTIVE_FILTER, filter.as_str())
    }

    pub fn set_active_filter_str(&self, raw: &str) -> PrefResult<NoteFilter> {
        let filter = NoteFilter::parse(raw).ok_or_else(|| invalid(keys::ACTIVE_FILTER, raw))?;
        self.set_active_filter(filter)?;
        Ok(filter)
    }

    pub fn selected_category_id(&self) -> Option<CategoryId> {
        selected_category_of(&self.values.borrow())
    }

    /// `None` clears the selection.
    pub fn set_selected_category_id(&self, id: Option<CategoryId>) -> PrefResult<()> {
        match id {
            Some(id) => self.set(keys::SELECTED_CATEGORY_ID, id),
            None => self.remove(keys::SELECTED_CATEGORY_ID).map(|_| ()),
        }
    }

    /// Note list query for the active filter and selected category.
    pub fn active_query(&self) -> NoteQuery {
        active_query_of(&self.values.borrow())
    }

    pub fn last_route(&self) -> Option<String> {
        text_of(&self.values.borrow(), keys::LAST_ROUTE)
    }

    pub fn set_last_route(&self, route: &str) -> PrefResult<()> {
        self.set(keys::LAST_ROUTE, route)
    }

    pub fn profile(&self) -> Profile {
        profile_of(&self.values.borrow())
    }

    /// Stores every profile field in one write.
    ///
    /// Blank optional fields are removed rather than stored.
    ///
    /// # Errors
    /// - [`PrefError::InvalidValue`] when the birth date is not `YYYY-MM-DD`.
    pub fn set_profile(&self, profile: &Profile) -> PrefResult<()> {
        let birth_date = non_blank(profile.birth_date.as_deref());
        if let Some(date) = birth_date {
            if !is_valid_birth_date(date) {
                return Err(invalid(keys::PROFILE_BIRTH_DATE, date));
            }
        }
        let avatar = non_blank(profile.avatar.as_deref());
        let first_name = profile.first_name.trim().to_string();
        let last_name = profile.last_name.trim().to_string();

        self.mutate(keys::PROFILE_FIRST_NAME, |map| {
            let before = map.clone();
            map.insert(keys::PROFILE_FIRST_NAME.to_string(), first_name.into());
            map.insert(keys::PROFILE_LAST_NAME.to_string(), last_name.into());
            put_optional(map, keys::PROFILE_BIRTH_DATE, birth_date);
            put_optional(map, keys::PROFILE_AVATAR, avatar);
            *map != before
        })
    }

    pub fn set_birth_date(&self, date: &str) -> PrefResult<()> {
        let date = date.trim();
        if !is_valid_birth_date(date) {
            return Err(invalid(keys::PROFILE_BIRTH_DATE, date));
        }
        self.set(keys::PROFILE_BIRTH_DATE, date)
    }

    pub fn observe_theme_mode(&self) -> LiveQuery<ThemeMode> {
        self.observe_with(theme_mode_of)
    }

    pub fn observe_start_action(&self) -> LiveQuery<StartAction> {
        self.observe_with(start_action_of)
    }

    pub fn observe_active_filter(&self) -> LiveQuery<NoteFilter> {
        self.observe_with(active_filter_of)
    }

    /// Streams the note query that the active filter selects.
    pub fn observe_active_query(&self) -> LiveQuery<NoteQuery> {
        self.observe_with(active_query_of)
    }

    pub fn observe_profile(&self) -> LiveQuery<Profile> {
        self.observe_with(profile_of)
    }

    /// Derives a stream from the whole map. Must run inside a Tokio runtime.
    fn observe_with<T>(&self, project: fn(&PrefMap) -> T) -> LiveQuery<T>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
    {
        let mut source = self.values.subscribe();
        let initial = project(&source.borrow_and_update());
        let (sender, receiver) = watch::channel(initial);
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = sender.closed() => break,
                    changed = source.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
                let value = project(&source.borrow_and_update());
                sender.send_if_modified(|held| {
                    if *held == value {
                        false
                    } else {
                        *held = value;
                        true
                    }
                });
            }
        });
        LiveQuery::from_parts(receiver, task)
    }

    /// Applies `edit` to a copy, persists it, then publishes it.
    ///
    /// `edit` returns whether anything changed; unchanged maps are not written.
    fn mutate<F>(&self, key: &str, edit: F) -> PrefResult<()>
    where
        F: FnOnce(&mut PrefMap) -> bool,
    {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut next = self.values.borrow().clone();
        if !edit(&mut next) {
            return Ok(());
        }
        if let Some(path) = &self.path {
            if let Err(err) = persist(path, &next) {
                error!("event=prefs_write module=prefs status=error key={key} error={err}");
                return Err(err);
            }
        }
        self.values.send_replace(next);
        debug!("event=prefs_write module=prefs status=ok key={key}");
        Ok(())
    }
}

/// Writes through a sibling temp file so a crash never leaves half a file.
fn persist(path: &Path, values: &PrefMap) -> PrefResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let bytes = serde_json::to_vec_pretty(values)?;
    let mut tmp_name = path.as_os_str().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);
    fs::write(&tmp_path, bytes)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

fn invalid(key: &'static str, value: &str) -> PrefError {
    PrefError::InvalidValue {
        key,
        value: value.to_string(),
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn put_optional(map: &mut PrefMap, key: &str, value: Option<&str>) {
    match value {
        Some(value) => {
            map.insert(key.to_string(), value.into());
        }
        None => {
            map.remove(key);
        }
    }
}

fn text_of(map: &PrefMap, key: &str) -> Option<String> {
    map.get(key)
        .and_then(PrefValue::as_text)
        .map(str::to_string)
}

fn theme_mode_of(map: &PrefMap) -> ThemeMode {
    map.get(keys::THEME_MODE)
        .and_then(PrefValue::as_text)
        .and_then(ThemeMode::parse)
        .unwrap_or_default()
}

fn start_action_of(map: &PrefMap) -> StartAction {
    map.get(keys::START_ACTION)
        .and_then(PrefValue::as_text)
        .and_then(StartAction::parse)
        .unwrap_or_default()
}

fn active_filter_of(map: &PrefMap) -> NoteFilter {
    map.get(keys::ACTIVE_FILTER)
        .and_then(PrefValue::as_text)
        .and_then(NoteFilter::parse)
        .unwrap_or_default()
}

fn selected_category_of(map: &PrefMap) -> Option<CategoryId> {
    map.get(keys::SELECTED_CATEGORY_ID)
        .and_then(PrefValue::as_int)
        .filter(|id| *id > 0)
}

fn active_query_of(map: &PrefMap) -> NoteQuery {
    active_filter_of(map).to_query(selected_category_of(map))
}

fn profile_of(map: &PrefMap) -> Profile {
    Profile {
        first_name: text_of(map, keys::PROFILE_FIRST_NAME).unwrap_or_default(),
        last_name: text_of(map, keys::PROFILE_LAST_NAME).unwrap_or_default(),
        birth_date: text_of(map, keys::PROFILE_BIRTH_DATE)
            .filter(|date| is_valid_birth_date(date)),
        avatar: text_of(map, keys::PROFILE_AVATAR),
    }
}

#[cfg(test)]
mod tests {
    use super::{PrefValue, PreferenceStore};
    use crate::prefs::{keys, NoteFilter, PrefError, ThemeMode};
    use crate::repo::note_repo::NoteQuery;

    #[test]
    fn defaults_apply_when_absent() {
        let prefs = PreferenceStore::in_memory();
        assert_eq!(prefs.theme_mode(), ThemeMode::System);
        assert_eq!(prefs.active_filter(), NoteFilter::All);
        assert_eq!(prefs.selected_category_id(), None);
        assert_eq!(prefs.last_route(), None);
    }

    #[test]
    fn unparseable_stored_value_reads_as_default() {
        let prefs = PreferenceStore::in_memory();
        prefs.set(keys::THEME_MODE, "sepia").unwrap();
        prefs.set(keys::ACTIVE_FILTER, 3_i64).unwrap();
        assert_eq!(prefs.theme_mode(), ThemeMode::System);
        assert_eq!(prefs.active_filter(), NoteFilter::All);
    }

    #[test]
    fn invalid_setter_input_leaves_previous_value() {
        let prefs = PreferenceStore::in_memory();
        prefs.set_theme_mode(ThemeMode::Dark).unwrap();
        let err = prefs.set_theme_mode_str("neon").unwrap_err();
        assert!(matches!(
            err,
            PrefError::InvalidValue { key: keys::THEME_MODE, .. }
        ));
        assert_eq!(prefs.theme_mode(), ThemeMode::Dark);
    }

    #[test]
    fn selected_category_accepts_numeric_text() {
        let prefs = PreferenceStore::in_memory();
        prefs
            .set(keys::SELECTED_CATEGORY_ID, PrefValue::Text("7".into()))
            .unwrap();
        prefs.set_active_filter(NoteFilter::Category).unwrap();
        assert_eq!(prefs.active_query(), NoteQuery::CategoryId(7));

        prefs.set_selected_category_id(None).unwrap();
        assert_eq!(prefs.active_query(), NoteQuery::All);
    }

    #[test]
    fn remove_reports_presence() {
        let prefs = PreferenceStore::in_memory();
        prefs.set_last_route("notes/4").unwrap();
        assert!(prefs.remove(keys::LAST_ROUTE).unwrap());
        assert!(!prefs.remove(keys::LAST_ROUTE).unwrap());
    }
}
