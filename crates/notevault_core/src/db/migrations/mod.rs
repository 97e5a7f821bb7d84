//! SQLite migration registry, planner and executor.
//!
//! # Responsibility
//! - Register forward-only `(from, to)` migration steps.
//! - Plan a route from the stored schema version to a target version.
//! - Apply the whole route atomically.
//!
//! # Invariants
//! - Every step moves strictly forward (`to > from`).
//! - Planning prefers the largest available jump at each position.
//! - All steps of one upgrade share a single transaction; any failure rolls
//!   back to the version the database had before the upgrade started.
//! - A destructive reset drops and rebuilds in that same all-or-nothing way.
//! - Applied version is mirrored to `PRAGMA user_version`.

use crate::db::{DbError, DbResult};
use log::{info, warn};
use rusqlite::{Connection, Transaction};
use std::time::Instant;

/// One forward schema transformation.
pub type MigrationFn = fn(&Transaction<'_>) -> rusqlite::Result<()>;

/// A registered `(from, to)` migration step.
#[derive(Clone, Copy)]
pub struct Migration {
    pub from: u32,
    pub to: u32,
    pub apply: MigrationFn,
}

impl std::fmt::Debug for Migration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Migration")
            .field("from", &self.from)
            .field("to", &self.to)
            .finish()
    }
}

/// Default emoji stored for categories created before emoji support.
pub const DEFAULT_CATEGORY_EMOJI: &str = "📁";

const MIGRATIONS: &[Migration] = &[
    Migration {
        from: 0,
        to: 1,
        apply: create_notes_table,
    },
    Migration {
        from: 1,
        to: 2,
        apply: add_note_metadata_columns,
    },
    Migration {
        from: 2,
        to: 3,
        apply: normalize_categories,
    },
    Migration {
        from: 3,
        to: 4,
        apply: index_cross_ref_columns,
    },
    Migration {
        from: 3,
        to: 5,
        apply: index_cross_ref_and_add_emoji,
    },
    Migration {
        from: 4,
        to: 5,
        apply: add_category_emoji,
    },
    Migration {
        from: 5,
        to: 6,
        apply: add_notification_persistence,
    },
    Migration {
        from: 6,
        to: 7,
        apply: add_secret_flag,
    },
];

/// Returns every built-in migration step.
pub fn registry() -> &'static [Migration] {
    MIGRATIONS
}

/// Returns the latest schema version known by this binary.
pub fn latest_version() -> u32 {
    latest_version_of(MIGRATIONS)
}

/// Returns the furthest target version reachable in `registry`.
pub fn latest_version_of(registry: &[Migration]) -> u32 {
    registry
        .iter()
        .map(|migration| migration.to)
        .max()
        .unwrap_or(0)
}

/// Plans the route from `from` to `to` through `registry`.
///
/// At each position the step with the furthest target not beyond `to` wins.
/// Returns an empty plan when `from == to`.
///
/// # Errors
/// - [`DbError::NoMigrationPath`] when some intermediate version has no step.
pub fn plan_migrations(registry: &[Migration], from: u32, to: u32) -> DbResult<Vec<Migration>> {
    let mut plan = Vec::new();
    let mut current = from;
    while current < to {
        let next = registry
            .iter()
            .filter(|migration| migration.from == current && migration.to > current)
            .filter(|migration| migration.to <= to)
            .max_by_key(|migration| migration.to)
            .copied()
            .ok_or(DbError::NoMigrationPath { from, to })?;
        plan.push(next);
        current = next.to;
    }
    Ok(plan)
}

/// Applies all pending built-in migrations on the provided connection.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    migrate_to(conn, MIGRATIONS, latest_version())
}

/// Migrates the connection to `target` using steps from `registry`.
///
/// # Errors
/// - [`DbError::UnsupportedSchemaVersion`] when the stored version is above `target`.
/// - [`DbError::NoMigrationPath`] when no forward route exists.
/// - [`DbError::MigrationFailed`] when a step fails; nothing is committed.
pub fn migrate_to(conn: &mut Connection, registry: &[Migration], target: u32) -> DbResult<()> {
    let current_version = current_user_version(conn)?;

    if current_version > target {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current_version,
            latest_supported: target,
        });
    }

    if current_version == target {
        return Ok(());
    }

    let plan = plan_migrations(registry, current_version, target)?;
    let started_at = Instant::now();
    info!(
        "event=db_migrate module=db status=start from={} to={} steps={}",
        current_version,
        target,
        plan.len()
    );

    let tx = conn.transaction()?;
    apply_plan(&tx, &plan)?;
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from={} to={} duration_ms={}",
        current_version,
        target,
        started_at.elapsed().as_millis()
    );
    Ok(())
}

/// Drops every application table and rebuilds the latest schema of `registry`.
///
/// All stored notes, categories and links are lost. The drops and the rebuild
/// share one transaction, so a failed rebuild leaves the old tables in place.
pub fn reset_schema(conn: &mut Connection, registry: &[Migration]) -> DbResult<()> {
    let plan = plan_migrations(registry, 0, latest_version_of(registry))?;

    let tx = conn.transaction()?;
    let tables = {
        let mut stmt = tx.prepare(
            "SELECT name
             FROM sqlite_master
             WHERE type = 'table'
               AND name NOT LIKE 'sqlite_%';",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        names
    };
    for table in &tables {
        tx.execute_batch(&format!("DROP TABLE IF EXISTS \"{table}\";"))?;
    }
    tx.execute_batch("PRAGMA user_version = 0;")?;
    apply_plan(&tx, &plan)?;
    tx.commit()?;

    warn!(
        "event=db_reset module=db status=ok dropped_tables={} steps={}",
        tables.len(),
        plan.len()
    );
    Ok(())
}

/// Runs `plan` inside `tx`, stamping `user_version` after every step.
fn apply_plan(tx: &Transaction<'_>, plan: &[Migration]) -> DbResult<()> {
    for migration in plan {
        let step = (migration.apply)(tx).and_then(|()| {
            tx.execute_batch(&format!("PRAGMA user_version = {};", migration.to))
        });
        if let Err(source) = step {
            warn!(
                "event=db_migrate module=db status=error from={} to={} error={}",
                migration.from, migration.to, source
            );
            return Err(DbError::MigrationFailed {
                from: migration.from,
                to: migration.to,
                source,
            });
        }
    }
    Ok(())
}

/// Reads the stored schema version.
pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

fn create_notes_table(tx: &Transaction<'_>) -> rusqlite::Result<()> {
    tx.execute_batch(include_str!("0001_init.sql"))
}

fn add_note_metadata_columns(tx: &Transaction<'_>) -> rusqlite::Result<()> {
    add_column_if_missing(tx, "notes", "timestamp_init", "INTEGER NOT NULL DEFAULT 0")?;
    add_column_if_missing(tx, "notes", "location", "TEXT")?;
    add_column_if_missing(tx, "notes", "notification_time", "INTEGER")?;
    add_column_if_missing(tx, "notes", "is_favorite", "INTEGER NOT NULL DEFAULT 0")?;
    add_column_if_missing(tx, "notes", "category", "TEXT NOT NULL DEFAULT ''")?;
    add_column_if_missing(tx, "notes", "is_markdown_enabled", "INTEGER NOT NULL DEFAULT 0")
}

fn normalize_categories(tx: &Transaction<'_>) -> rusqlite::Result<()> {
    tx.execute_batch(include_str!("0003_categories.sql"))
}

fn index_cross_ref_columns(tx: &Transaction<'_>) -> rusqlite::Result<()> {
    tx.execute_batch(include_str!("0004_cross_ref_indexes.sql"))
}

fn add_category_emoji(tx: &Transaction<'_>) -> rusqlite::Result<()> {
    add_column_if_missing(
        tx,
        "categories",
        "emoji",
        &format!("TEXT NOT NULL DEFAULT '{DEFAULT_CATEGORY_EMOJI}'"),
    )
}

fn index_cross_ref_and_add_emoji(tx: &Transaction<'_>) -> rusqlite::Result<()> {
    index_cross_ref_columns(tx)?;
    add_category_emoji(tx)
}

fn add_notification_persistence(tx: &Transaction<'_>) -> rusqlite::Result<()> {
    add_column_if_missing(
        tx,
        "notes",
        "is_notification_persistent",
        "INTEGER NOT NULL DEFAULT 0",
    )
}

fn add_secret_flag(tx: &Transaction<'_>) -> rusqlite::Result<()> {
    add_column_if_missing(tx, "notes", "is_secret", "INTEGER NOT NULL DEFAULT 0")
}

fn add_column_if_missing(
    tx: &Transaction<'_>,
    table: &str,
    column: &str,
    definition: &str,
) -> rusqlite::Result<()> {
    if table_has_column(tx, table, column)? {
        return Ok(());
    }
    tx.execute_batch(&format!(
        "ALTER TABLE {table} ADD COLUMN {column} {definition};"
    ))
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> rusqlite::Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::{latest_version, plan_migrations, registry, Migration};
    use crate::db::DbError;

    fn route(plan: &[Migration]) -> Vec<(u32, u32)> {
        plan.iter().map(|step| (step.from, step.to)).collect()
    }

    #[test]
    fn latest_version_covers_vault_flag() {
        assert_eq!(latest_version(), 7);
    }

    #[test]
    fn planner_prefers_direct_jump() {
        let plan = plan_migrations(registry(), 3, 7).unwrap();
        assert_eq!(route(&plan), vec![(3, 5), (5, 6), (6, 7)]);
    }

    #[test]
    fn planner_stops_at_target_without_overshooting() {
        let plan = plan_migrations(registry(), 3, 4).unwrap();
        assert_eq!(route(&plan), vec![(3, 4)]);
    }

    #[test]
    fn planner_reports_gap() {
        let gapped: Vec<Migration> = registry()
            .iter()
            .copied()
            .filter(|step| step.from != 1)
            .collect();
        let err = plan_migrations(&gapped, 1, 7).unwrap_err();
        assert!(matches!(err, DbError::NoMigrationPath { from: 1, to: 7 }));
    }

    #[test]
    fn empty_plan_when_already_current() {
        assert!(plan_migrations(registry(), 7, 7).unwrap().is_empty());
    }
}
