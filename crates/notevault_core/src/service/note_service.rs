//! Note data access service.
//!
//! # Responsibility
//! - Async insert/update/delete and flag writes for notes.
//! - Reactive single-note and list streams.
//! - One-shot search.
//!
//! # Invariants
//! - List streams are ordered by modification time, newest first.
//! - A single-note stream emits `None` once the note is deleted.
//! - Deleting a note does not touch its category links.

use crate::live::{LiveQuery, Table};
use crate::model::category::CategoryId;
use crate::model::note::{Note, NoteId};
use crate::repo::note_repo::{NoteQuery, NoteRepository, SqliteNoteRepository};
use crate::service::ServiceResult;
use crate::store::Store;
use log::info;

const NOTES_ONLY: &[Table] = &[Table::Notes];

/// Async facade over [`SqliteNoteRepository`].
#[derive(Clone)]
pub struct NoteService {
    store: Store,
}

impl NoteService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Inserts a note and returns its assigned id.
    pub async fn insert(&self, note: Note) -> ServiceResult<NoteId> {
        let id = self
            .store
            .write("note_insert", NOTES_ONLY, move |conn| {
                SqliteNoteRepository::new(conn).insert_note(&note)
            })
            .await?;
        info!("event=note_insert module=service status=ok note_id={id}");
        Ok(id)
    }

    /// Replaces the stored note with `note`, keyed by id.
    pub async fn update(&self, note: Note) -> ServiceResult<()> {
        let id = note.id;
        self.store
            .write("note_update", NOTES_ONLY, move |conn| {
                SqliteNoteRepository::new(conn).update_note(&note)
            })
            .await?;
        info!("event=note_update module=service status=ok note_id={id}");
        Ok(())
    }

    /// Hard-deletes `note` by id.
    pub async fn delete(&self, note: &Note) -> ServiceResult<()> {
        self.delete_by_id(note.id).await
    }

    pub async fn delete_by_id(&self, id: NoteId) -> ServiceResult<()> {
        self.store
            .write("note_delete", NOTES_ONLY, move |conn| {
                SqliteNoteRepository::new(conn).delete_note(id)
            })
            .await?;
        info!("event=note_delete module=service status=ok note_id={id}");
        Ok(())
    }

    pub async fn get(&self, id: NoteId) -> ServiceResult<Option<Note>> {
        self.store
            .read("note_get", move |conn| SqliteNoteRepository::new(conn).get_note(id))
            .await
    }

    /// One-shot list for `query`.
    pub async fn list(&self, query: NoteQuery) -> ServiceResult<Vec<Note>> {
        self.store
            .read("note_list", move |conn| {
                SqliteNoteRepository::new(conn).list_notes(&query)
            })
            .await
    }

    /// Case-insensitive substring search over title or content.
    ///
    /// The query is matched as given, whitespace included; an empty query returns no notes.
    pub async fn search(&self, text: impl Into<String>) -> ServiceResult<Vec<Note>> {
        let text = text.into();
        self.store
            .read("note_search", move |conn| {
                SqliteNoteRepository::new(conn).search_notes(&text)
            })
            .await
    }

    /// Flips the favorite flag and returns its new value.
    pub async fn toggle_favorite(&self, id: NoteId) -> ServiceResult<bool> {
        self.store
            .write("note_toggle_favorite", NOTES_ONLY, move |conn| {
                SqliteNoteRepository::new(conn).toggle_favorite(id)
            })
            .await
    }

    /// Flips Markdown rendering in one write and returns its new value.
    pub async fn toggle_markdown(&self, id: NoteId) -> ServiceResult<bool> {
        self.store
            .write("note_toggle_markdown", NOTES_ONLY, move |conn| {
                SqliteNoteRepository::new(conn).toggle_markdown(id)
            })
            .await
    }

    pub async fn set_markdown_enabled(&self, id: NoteId, enabled: bool) -> ServiceResult<()> {
        self.store
            .write("note_set_markdown", NOTES_ONLY, move |conn| {
                SqliteNoteRepository::new(conn).set_markdown_enabled(id, enabled)
            })
            .await
    }

    /// Moves a note into or out of the vault.
    pub async fn set_secret(&self, id: NoteId, secret: bool) -> ServiceResult<()> {
        self.store
            .write("note_set_secret", NOTES_ONLY, move |conn| {
                SqliteNoteRepository::new(conn).set_secret(id, secret)
            })
            .await
    }

    /// Streams one note; the value becomes `None` when it is deleted.
    pub async fn observe(&self, id: NoteId) -> ServiceResult<LiveQuery<Option<Note>>> {
        let store = self.store.clone();
        LiveQuery::start(self.store.tracker(), NOTES_ONLY, "note_by_id", move || {
            let store = store.clone();
            async move {
                store
                    .read("note_get", move |conn| {
                        SqliteNoteRepository::new(conn).get_note(id)
                    })
                    .await
            }
        })
        .await
    }

    /// Streams the result of `query`.
    pub async fn observe_list(&self, query: NoteQuery) -> ServiceResult<LiveQuery<Vec<Note>>> {
        let tables = if query.reads_categories() {
            Table::NOTE_CATEGORY_JOIN
        } else {
            NOTES_ONLY
        };
        let store = self.store.clone();
        LiveQuery::start(self.store.tracker(), tables, "note_list", move || {
            let store = store.clone();
            let query = query.clone();
            async move {
                store
                    .read("note_list", move |conn| {
                        SqliteNoteRepository::new(conn).list_notes(&query)
                    })
                    .await
            }
        })
        .await
    }

    pub async fn observe_all(&self) -> ServiceResult<LiveQuery<Vec<Note>>> {
        self.observe_list(NoteQuery::All).await
    }

    pub async fn observe_favorites(&self) -> ServiceResult<LiveQuery<Vec<Note>>> {
        self.observe_list(NoteQuery::Favorites).await
    }

    pub async fn observe_with_location(&self) -> ServiceResult<LiveQuery<Vec<Note>>> {
        self.observe_list(NoteQuery::WithLocation).await
    }

    pub async fn observe_secret(&self) -> ServiceResult<LiveQuery<Vec<Note>>> {
        self.observe_list(NoteQuery::Secret).await
    }

    /// Streams notes linked to the category named `name`, ignoring case.
    ///
    /// Name-based lookup is kept for older callers; prefer [`Self::observe_category`].
    pub async fn observe_by_category(
        &self,
        name: impl Into<String>,
    ) -> ServiceResult<LiveQuery<Vec<Note>>> {
        self.observe_list(NoteQuery::CategoryName(name.into())).await
    }

    pub async fn observe_category(
        &self,
        category_id: CategoryId,
    ) -> ServiceResult<LiveQuery<Vec<Note>>> {
        self.observe_list(NoteQuery::CategoryId(category_id)).await
    }
}
