//! Category repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD over `categories`.
//! - Own link maintenance on `note_category_cross_ref`.
//!
//! # Invariants
//! - Category names are unique ignoring case; enforced here, not by schema.
//! - Linking requires both the note and the category to exist.
//! - Deleting a category removes its links in the same transaction.
//! - `set_note_categories` replaces the whole link set in one transaction.

use crate::model::category::{Category, CategoryId, NoteCategoryCrossRef, UNSAVED_CATEGORY_ID};
use crate::model::note::NoteId;
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeSet;

const CATEGORY_SELECT_SQL: &str = "SELECT category_id, name, emoji FROM categories";

/// Repository interface for categories and note links.
pub trait CategoryRepository {
    fn insert_category(&self, category: &Category) -> RepoResult<CategoryId>;
    /// Renames/re-emojis an existing category.
    fn update_category(&self, category: &Category) -> RepoResult<()>;
    fn delete_category(&self, id: CategoryId) -> RepoResult<()>;
    fn get_category(&self, id: CategoryId) -> RepoResult<Option<Category>>;
    fn find_category_by_name(&self, name: &str) -> RepoResult<Option<Category>>;
    /// All categories sorted by name, ignoring case.
    fn list_categories(&self) -> RepoResult<Vec<Category>>;
    /// Distinct category names sorted ignoring case.
    fn list_category_names(&self) -> RepoResult<Vec<String>>;
    fn link_note(&self, link: NoteCategoryCrossRef) -> RepoResult<()>;
    /// Removes one link. Returns whether a row existed.
    fn unlink_note(&self, link: NoteCategoryCrossRef) -> RepoResult<bool>;
    fn set_note_categories(
        &self,
        note_id: NoteId,
        category_ids: &[CategoryId],
    ) -> RepoResult<()>;
    fn categories_for_note(&self, note_id: NoteId) -> RepoResult<Vec<Category>>;
    fn list_links(&self) -> RepoResult<Vec<NoteCategoryCrossRef>>;
    /// Deletes links whose note or category no longer exists.
    fn purge_orphan_links(&self) -> RepoResult<usize>;
}

/// SQLite-backed category repository.
pub struct SqliteCategoryRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCategoryRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl CategoryRepository for SqliteCategoryRepository<'_> {
    fn insert_category(&self, category: &Category) -> RepoResult<CategoryId> {
        let category = category.normalized()?;
        ensure_name_available(self.conn, &category.name, None)?;

        if category.category_id == UNSAVED_CATEGORY_ID {
            self.conn.execute(
                "INSERT INTO categories (name, emoji) VALUES (?1, ?2);",
                params![category.name, category.emoji],
            )?;
            Ok(self.conn.last_insert_rowid())
        } else {
            self.conn.execute(
                "INSERT INTO categories (category_id, name, emoji) VALUES (?1, ?2, ?3);",
                params![category.category_id, category.name, category.emoji],
            )?;
            Ok(category.category_id)
        }
    }

    fn update_category(&self, category: &Category) -> RepoResult<()> {
        let category = category.normalized()?;
        ensure_name_available(self.conn, &category.name, Some(category.category_id))?;

        let changed = self.conn.execute(
            "UPDATE categories SET name = ?1, emoji = ?2 WHERE category_id = ?3;",
            params![category.name, category.emoji, category.category_id],
        )?;
        if changed == 0 {
            return Err(RepoError::CategoryNotFound(category.category_id));
        }
        Ok(())
    }

    fn delete_category(&self, id: CategoryId) -> RepoResult<()> {
        // Callers hold the store's connection lock, so no transaction is open yet.
        let tx = self.conn.unchecked_transaction()?;
        let changed = tx.execute("DELETE FROM categories WHERE category_id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::CategoryNotFound(id));
        }
        tx.execute(
            "DELETE FROM note_category_cross_ref WHERE category_id = ?1;",
            [id],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn get_category(&self, id: CategoryId) -> RepoResult<Option<Category>> {
        let category = self
            .conn
            .query_row(
                &format!("{CATEGORY_SELECT_SQL} WHERE category_id = ?1;"),
                [id],
                parse_category_row,
            )
            .optional()?;
        Ok(category)
    }

    fn find_category_by_name(&self, name: &str) -> RepoResult<Option<Category>> {
        let category = self
            .conn
            .query_row(
                &format!("{CATEGORY_SELECT_SQL} WHERE name = ?1 COLLATE NOCASE LIMIT 1;"),
                [name.trim()],
                parse_category_row,
            )
            .optional()?;
        Ok(category)
    }

    fn list_categories(&self) -> RepoResult<Vec<Category>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CATEGORY_SELECT_SQL} ORDER BY name COLLATE NOCASE ASC, category_id ASC;"
        ))?;
        let categories = stmt
            .query_map([], parse_category_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(categories)
    }

    fn list_category_names(&self) -> RepoResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT name FROM categories ORDER BY name COLLATE NOCASE ASC;")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    fn link_note(&self, link: NoteCategoryCrossRef) -> RepoResult<()> {
        ensure_link_targets_exist(self.conn, link)?;
        self.conn.execute(
            "INSERT OR IGNORE INTO note_category_cross_ref (note_id, category_id)
             VALUES (?1, ?2);",
            params![link.note_id, link.category_id],
        )?;
        Ok(())
    }

    fn unlink_note(&self, link: NoteCategoryCrossRef) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "DELETE FROM note_category_cross_ref WHERE note_id = ?1 AND category_id = ?2;",
            params![link.note_id, link.category_id],
        )?;
        Ok(changed > 0)
    }

    fn set_note_categories(
        &self,
        note_id: NoteId,
        category_ids: &[CategoryId],
    ) -> RepoResult<()> {
        let unique: BTreeSet<CategoryId> = category_ids.iter().copied().collect();
        // Callers hold the store's connection lock, so no transaction is open yet.
        let tx = self.conn.unchecked_transaction()?;

        if !row_exists(&tx, "SELECT EXISTS(SELECT 1 FROM notes WHERE id = ?1);", note_id)? {
            return Err(RepoError::NoteNotFound(note_id));
        }
        for category_id in &unique {
            if !row_exists(
                &tx,
                "SELECT EXISTS(SELECT 1 FROM categories WHERE category_id = ?1);",
                *category_id,
            )? {
                return Err(RepoError::CategoryNotFound(*category_id));
            }
        }

        tx.execute(
            "DELETE FROM note_category_cross_ref WHERE note_id = ?1;",
            [note_id],
        )?;
        for category_id in &unique {
            tx.execute(
                "INSERT INTO note_category_cross_ref (note_id, category_id) VALUES (?1, ?2);",
                params![note_id, category_id],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn categories_for_note(&self, note_id: NoteId) -> RepoResult<Vec<Category>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.category_id, c.name, c.emoji
             FROM categories c
             INNER JOIN note_category_cross_ref x ON x.category_id = c.category_id
             WHERE x.note_id = ?1
             ORDER BY c.name COLLATE NOCASE ASC, c.category_id ASC;",
        )?;
        let categories = stmt
            .query_map([note_id], parse_category_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(categories)
    }

    fn list_links(&self) -> RepoResult<Vec<NoteCategoryCrossRef>> {
        let mut stmt = self.conn.prepare(
            "SELECT note_id, category_id
             FROM note_category_cross_ref
             ORDER BY note_id ASC, category_id ASC;",
        )?;
        let links = stmt
            .query_map([], |row| {
                Ok(NoteCategoryCrossRef {
                    note_id: row.get(0)?,
                    category_id: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(links)
    }

    fn purge_orphan_links(&self) -> RepoResult<usize> {
        let removed = self.conn.execute(
            "DELETE FROM note_category_cross_ref
             WHERE note_id NOT IN (SELECT id FROM notes)
                OR category_id NOT IN (SELECT category_id FROM categories);",
            [],
        )?;
        Ok(removed)
    }
}

fn parse_category_row(row: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        category_id: row.get(0)?,
        name: row.get(1)?,
        emoji: row.get(2)?,
    })
}

fn ensure_name_available(
    conn: &Connection,
    name: &str,
    except: Option<CategoryId>,
) -> RepoResult<()> {
    let taken: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM categories
            WHERE name = ?1 COLLATE NOCASE
              AND (?2 IS NULL OR category_id <> ?2)
        );",
        params![name, except],
        |row| row.get(0),
    )?;
    if taken == 1 {
        return Err(RepoError::DuplicateCategory(name.to_string()));
    }
    Ok(())
}

fn ensure_link_targets_exist(conn: &Connection, link: NoteCategoryCrossRef) -> RepoResult<()> {
    if !row_exists(
        conn,
        "SELECT EXISTS(SELECT 1 FROM notes WHERE id = ?1);",
        link.note_id,
    )? {
        return Err(RepoError::NoteNotFound(link.note_id));
    }
    if !row_exists(
        conn,
        "SELECT EXISTS(SELECT 1 FROM categories WHERE category_id = ?1);",
        link.category_id,
    )? {
        return Err(RepoError::CategoryNotFound(link.category_id));
    }
    Ok(())
}

fn row_exists(conn: &Connection, sql: &str, id: i64) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(sql, [id], |row| row.get(0))?;
    Ok(exists == 1)
}
