//! Note repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide full-record CRUD over the `notes` table.
//! - Provide the single-column flag writes (favorite, markdown, secret).
//! - Serve the list queries backing reactive streams.
//!
//! # Invariants
//! - Lists are ordered by `timestamp DESC, id DESC`.
//! - `update_note` never moves the stored modification timestamp backwards.
//! - Deleting a note leaves its `note_category_cross_ref` rows in place.

use crate::model::category::CategoryId;
use crate::model::note::{Note, NoteId, UNSAVED_NOTE_ID};
use crate::repo::{bool_to_int, int_to_bool, RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const NOTE_SELECT_SQL: &str = "SELECT
    id,
    title,
    content,
    timestamp,
    timestamp_init,
    location,
    notification_time,
    is_favorite,
    is_markdown_enabled,
    is_secret,
    is_notification_persistent
FROM notes";

const NOTE_ORDER_SQL: &str = " ORDER BY timestamp DESC, id DESC";

/// List selections served by [`NoteRepository::list_notes`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NoteQuery {
    /// Every stored note.
    All,
    /// Notes with `is_favorite = 1`.
    Favorites,
    /// Notes carrying a location tag.
    WithLocation,
    /// Vault notes (`is_secret = 1`).
    Secret,
    /// Notes linked to the category with this name, ignoring case.
    ///
    /// Kept for callers that still address categories by name; prefer
    /// [`NoteQuery::CategoryId`].
    CategoryName(String),
    /// Notes linked to the category with this id.
    CategoryId(CategoryId),
}

impl NoteQuery {
    /// Returns whether the query joins through category tables.
    pub fn reads_categories(&self) -> bool {
        matches!(self, Self::CategoryName(_) | Self::CategoryId(_))
    }
}

/// Repository interface for note persistence.
pub trait NoteRepository {
    /// Inserts a note and returns its id. Unsaved notes get a generated id.
    fn insert_note(&self, note: &Note) -> RepoResult<NoteId>;
    /// Replaces every column of the row with `note.id`.
    fn update_note(&self, note: &Note) -> RepoResult<()>;
    /// Hard-deletes one note.
    fn delete_note(&self, id: NoteId) -> RepoResult<()>;
    fn get_note(&self, id: NoteId) -> RepoResult<Option<Note>>;
    fn list_notes(&self, query: &NoteQuery) -> RepoResult<Vec<Note>>;
    /// Case-insensitive substring search over title or content.
    fn search_notes(&self, text: &str) -> RepoResult<Vec<Note>>;
    /// Flips the favorite flag and returns the new value.
    fn toggle_favorite(&self, id: NoteId) -> RepoResult<bool>;
    /// Flips `is_markdown_enabled` atomically and returns the new value.
    fn toggle_markdown(&self, id: NoteId) -> RepoResult<bool>;
    fn set_markdown_enabled(&self, id: NoteId, enabled: bool) -> RepoResult<()>;
    fn set_secret(&self, id: NoteId, secret: bool) -> RepoResult<()>;
}

/// SQLite-backed note repository.
pub struct SqliteNoteRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNoteRepository<'conn> {
    /// Wraps a migrated connection.
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl NoteRepository for SqliteNoteRepository<'_> {
    fn insert_note(&self, note: &Note) -> RepoResult<NoteId> {
        note.validate()?;

        let explicit_id = if note.id == UNSAVED_NOTE_ID {
            None
        } else {
            Some(note.id)
        };

        self.conn.execute(
            "INSERT INTO notes (
                id,
                title,
                content,
                timestamp,
                timestamp_init,
                location,
                notification_time,
                is_favorite,
                is_markdown_enabled,
                is_secret,
                is_notification_persistent
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11);",
            params![
                explicit_id,
                note.title.as_str(),
                note.content.as_str(),
                note.modified_at,
                note.created_at,
                note.location.as_deref(),
                note.notification_offset,
                bool_to_int(note.is_favorite),
                bool_to_int(note.is_markdown_enabled),
                bool_to_int(note.is_secret),
                bool_to_int(note.is_notification_persistent),
            ],
        )?;

        Ok(explicit_id.unwrap_or_else(|| self.conn.last_insert_rowid()))
    }

    fn update_note(&self, note: &Note) -> RepoResult<()> {
        note.validate()?;

        let changed = self.conn.execute(
            "UPDATE notes
             SET
                title = ?1,
                content = ?2,
                timestamp = MAX(timestamp, ?3),
                timestamp_init = ?4,
                location = ?5,
                notification_time = ?6,
                is_favorite = ?7,
                is_markdown_enabled = ?8,
                is_secret = ?9,
                is_notification_persistent = ?10
             WHERE id = ?11;",
            params![
                note.title.as_str(),
                note.content.as_str(),
                note.modified_at,
                note.created_at,
                note.location.as_deref(),
                note.notification_offset,
                bool_to_int(note.is_favorite),
                bool_to_int(note.is_markdown_enabled),
                bool_to_int(note.is_secret),
                bool_to_int(note.is_notification_persistent),
                note.id,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NoteNotFound(note.id));
        }

        Ok(())
    }

    fn delete_note(&self, id: NoteId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM notes WHERE id = ?1;", [id])?;

        if changed == 0 {
            return Err(RepoError::NoteNotFound(id));
        }

        Ok(())
    }

    fn get_note(&self, id: NoteId) -> RepoResult<Option<Note>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{NOTE_SELECT_SQL} WHERE id = ?1;"))?;

        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_note_row(row)?));
        }

        Ok(None)
    }

    fn list_notes(&self, query: &NoteQuery) -> RepoResult<Vec<Note>> {
        let mut sql = format!("{NOTE_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        match query {
            NoteQuery::All => {}
            NoteQuery::Favorites => sql.push_str(" AND is_favorite = 1"),
            NoteQuery::WithLocation => sql.push_str(" AND location IS NOT NULL"),
            NoteQuery::Secret => sql.push_str(" AND is_secret = 1"),
            NoteQuery::CategoryName(name) => {
                sql.push_str(
                    " AND id IN (
                        SELECT x.note_id
                        FROM note_category_cross_ref x
                        INNER JOIN categories c ON c.category_id = x.category_id
                        WHERE c.name = ? COLLATE NOCASE
                    )",
                );
                bind_values.push(Value::Text(name.trim().to_string()));
            }
            NoteQuery::CategoryId(category_id) => {
                sql.push_str(
                    " AND id IN (
                        SELECT note_id
                        FROM note_category_cross_ref
                        WHERE category_id = ?
                    )",
                );
                bind_values.push(Value::Integer(*category_id));
            }
        }

        sql.push_str(NOTE_ORDER_SQL);
        query_notes(self.conn, &sql, bind_values)
    }

    fn search_notes(&self, text: &str) -> RepoResult<Vec<Note>> {
        if text.is_empty() {
            return Ok(Vec::new());
        }
        let needle = text.to_lowercase();

        // SQLite `lower()`/`LIKE` only fold ASCII, so matching happens here.
        let all = self.list_notes(&NoteQuery::All)?;
        Ok(all
            .into_iter()
            .filter(|note| note.matches_query(&needle))
            .collect())
    }

    fn toggle_favorite(&self, id: NoteId) -> RepoResult<bool> {
        toggle_flag(self.conn, "is_favorite", id)
    }

    fn toggle_markdown(&self, id: NoteId) -> RepoResult<bool> {
        toggle_flag(self.conn, "is_markdown_enabled", id)
    }

    fn set_markdown_enabled(&self, id: NoteId, enabled: bool) -> RepoResult<()> {
        set_flag(self.conn, "is_markdown_enabled", id, enabled)
    }

    fn set_secret(&self, id: NoteId, secret: bool) -> RepoResult<()> {
        set_flag(self.conn, "is_secret", id, secret)
    }
}

/// Flips a 0/1 column in one statement and returns the stored result.
fn toggle_flag(conn: &Connection, column: &'static str, id: NoteId) -> RepoResult<bool> {
    let flipped: Option<i64> = conn
        .query_row(
            &format!(
                "UPDATE notes
                 SET {column} = 1 - {column}
                 WHERE id = ?1
                 RETURNING {column};"
            ),
            [id],
            |row| row.get(0),
        )
        .optional()?;

    match flipped {
        Some(value) => int_to_bool(value, column),
        None => Err(RepoError::NoteNotFound(id)),
    }
}

fn set_flag(conn: &Connection, column: &'static str, id: NoteId, value: bool) -> RepoResult<()> {
    let changed = conn.execute(
        &format!("UPDATE notes SET {column} = ?1 WHERE id = ?2;"),
        params![bool_to_int(value), id],
    )?;

    if changed == 0 {
        return Err(RepoError::NoteNotFound(id));
    }

    Ok(())
}

fn query_notes(conn: &Connection, sql: &str, bind_values: Vec<Value>) -> RepoResult<Vec<Note>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut notes = Vec::new();
    while let Some(row) = rows.next()? {
        notes.push(parse_note_row(row)?);
    }
    Ok(notes)
}

fn parse_note_row(row: &Row<'_>) -> RepoResult<Note> {
    Ok(Note {
        id: row.get("id")?,
        title: row.get("title")?,
        content: row.get("content")?,
        created_at: row.get("timestamp_init")?,
        modified_at: row.get("timestamp")?,
        location: row.get("location")?,
        notification_offset: row.get("notification_time")?,
        is_favorite: int_to_bool(row.get("is_favorite")?, "notes.is_favorite")?,
        is_markdown_enabled: int_to_bool(
            row.get("is_markdown_enabled")?,
            "notes.is_markdown_enabled",
        )?,
        is_secret: int_to_bool(row.get("is_secret")?, "notes.is_secret")?,
        is_notification_persistent: int_to_bool(
            row.get("is_notification_persistent")?,
            "notes.is_notification_persistent",
        )?,
    })
}
