use notevault_core::db::migrations::{
    current_user_version, latest_version, migrate_to, registry, Migration,
};
use notevault_core::db::{open_db, open_db_in_memory, open_db_with, DbError, OpenOptions};
use notevault_core::{
    CategoryRepository, NoteRepository, SqliteCategoryRepository, SqliteNoteRepository,
};
use rusqlite::{Connection, Transaction};
use std::path::Path;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(current_user_version(&conn).unwrap(), latest_version());
    assert_table_exists(&conn, "notes");
    assert_table_exists(&conn, "categories");
    assert_table_exists(&conn, "note_category_cross_ref");
    assert_eq!(
        column_names(&conn, "notes"),
        vec![
            "id",
            "title",
            "content",
            "timestamp",
            "timestamp_init",
            "location",
            "notification_time",
            "is_favorite",
            "is_markdown_enabled",
            "is_notification_persistent",
            "is_secret",
        ]
    );
    assert_eq!(
        column_names(&conn, "categories"),
        vec!["category_id", "name", "emoji"]
    );
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notevault.sqlite3");

    let conn = open_db(&path).unwrap();
    SqliteNoteRepository::new(&conn)
        .insert_note(&notevault_core::Note::new("kept", "", 10))
        .unwrap();
    drop(conn);

    let conn = open_db(&path).unwrap();
    assert_eq!(current_user_version(&conn).unwrap(), latest_version());
    assert_eq!(count_rows(&conn, "notes"), 1);
}

#[test]
fn version_one_rows_gain_defaults_after_upgrade() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("v1.sqlite3");
    seed_version(&path, 1, |conn| {
        conn.execute_batch(
            "INSERT INTO notes (title, content, timestamp)
             VALUES ('Shopping', 'milk, eggs', 1700000000000);",
        )
    });

    let conn = open_db(&path).unwrap();
    assert_eq!(current_user_version(&conn).unwrap(), latest_version());

    let notes = SqliteNoteRepository::new(&conn)
        .list_notes(&notevault_core::NoteQuery::All)
        .unwrap();
    assert_eq!(notes.len(), 1);
    let note = &notes[0];
    assert_eq!(note.title, "Shopping");
    assert_eq!(note.content, "milk, eggs");
    assert_eq!(note.modified_at, 1_700_000_000_000);
    assert_eq!(note.created_at, 0);
    assert_eq!(note.location, None);
    assert_eq!(note.notification_offset, None);
    assert!(!note.is_favorite);
    assert!(!note.is_markdown_enabled);
    assert!(!note.is_secret);
    assert!(!note.is_notification_persistent);
}

#[test]
fn version_two_category_strings_become_links() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("v2.sqlite3");
    seed_version(&path, 2, |conn| {
        conn.execute_batch(
            "INSERT INTO notes (id, title, content, timestamp, category) VALUES
                (1, 'a', '', 1, 'Work'),
                (2, 'b', '', 2, ' work '),
                (3, 'c', '', 3, 'Home'),
                (4, 'd', '', 4, '');",
        )
    });

    let conn = open_db(&path).unwrap();
    let categories = SqliteCategoryRepository::new(&conn);
    assert_eq!(
        categories.list_category_names().unwrap(),
        vec!["Home".to_string(), "Work".to_string()]
    );

    let work = categories.find_category_by_name("WORK").unwrap().unwrap();
    assert_eq!(work.emoji, "📁");
    let linked: Vec<i64> = categories
        .list_links()
        .unwrap()
        .into_iter()
        .filter(|link| link.category_id == work.category_id)
        .map(|link| link.note_id)
        .collect();
    assert_eq!(linked, vec![1, 2]);
    assert!(categories.categories_for_note(4).unwrap().is_empty());
    assert!(!column_names(&conn, "notes").contains(&"category".to_string()));
}

#[test]
fn direct_jump_matches_stepwise_route() {
    let stepwise_registry: Vec<Migration> = registry()
        .iter()
        .copied()
        .filter(|step| !(step.from == 3 && step.to == 5))
        .collect();

    let mut direct = version_three_fixture();
    let mut stepwise = version_three_fixture();

    migrate_to(&mut direct, registry(), 5).unwrap();
    migrate_to(&mut stepwise, &stepwise_registry, 5).unwrap();

    assert_eq!(current_user_version(&direct).unwrap(), 5);
    assert_eq!(current_user_version(&stepwise).unwrap(), 5);
    assert_eq!(schema_sql(&direct), schema_sql(&stepwise));
    for table in ["notes", "categories", "note_category_cross_ref"] {
        assert_eq!(column_names(&direct, table), column_names(&stepwise, table));
    }
    assert_eq!(category_rows(&direct), category_rows(&stepwise));
}

#[test]
fn failed_step_rolls_back_whole_upgrade() {
    let mut broken: Vec<Migration> = registry()
        .iter()
        .copied()
        .filter(|step| step.to <= 5)
        .collect();
    broken.push(Migration {
        from: 5,
        to: 6,
        apply: broken_step,
    });

    let mut conn = Connection::open_in_memory().unwrap();
    migrate_to(&mut conn, registry(), 1).unwrap();
    conn.execute_batch("INSERT INTO notes (title, content, timestamp) VALUES ('x', 'y', 5);")
        .unwrap();

    let err = migrate_to(&mut conn, &broken, 6).unwrap_err();
    assert!(matches!(err, DbError::MigrationFailed { from: 5, to: 6, .. }));

    assert_eq!(current_user_version(&conn).unwrap(), 1);
    assert_eq!(
        column_names(&conn, "notes"),
        vec!["id", "title", "content", "timestamp"]
    );
    assert_table_missing(&conn, "categories");
    assert_eq!(count_rows(&conn, "notes"), 1);
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let options = OpenOptions {
        allow_destructive_reset: true,
        ..OpenOptions::default()
    };
    match open_db_with(&path, &options).unwrap_err() {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_route_fails_without_destructive_reset() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gap.sqlite3");
    seed_version(&path, 4, |conn| {
        conn.execute_batch("INSERT INTO notes (title, content, timestamp) VALUES ('a', 'b', 1);")
    });

    let options = OpenOptions {
        allow_destructive_reset: false,
        migrations: gapped_registry(),
    };
    let err = open_db_with(&path, &options).unwrap_err();
    assert!(matches!(err, DbError::NoMigrationPath { from: 4, to: 7 }));

    let conn = Connection::open(&path).unwrap();
    assert_eq!(current_user_version(&conn).unwrap(), 4);
    assert_eq!(count_rows(&conn, "notes"), 1);
}

#[test]
fn missing_route_with_destructive_reset_rebuilds_schema() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reset.sqlite3");
    seed_version(&path, 4, |conn| {
        conn.execute_batch("INSERT INTO notes (title, content, timestamp) VALUES ('a', 'b', 1);")
    });

    let options = OpenOptions {
        allow_destructive_reset: true,
        migrations: gapped_registry(),
    };
    let conn = open_db_with(&path, &options).unwrap();

    assert_eq!(current_user_version(&conn).unwrap(), latest_version());
    assert_eq!(count_rows(&conn, "notes"), 0);
    assert_table_exists(&conn, "categories");
}

#[test]
fn failed_rebuild_after_reset_keeps_old_data() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reset_fails.sqlite3");
    seed_version(&path, 4, |conn| {
        conn.execute_batch("INSERT INTO notes (title, content, timestamp) VALUES ('a', 'b', 1);")
    });

    let options = OpenOptions {
        allow_destructive_reset: true,
        migrations: gapped_registry_with_broken_last_step(),
    };
    let err = open_db_with(&path, &options).unwrap_err();
    assert!(matches!(err, DbError::MigrationFailed { from: 6, to: 7, .. }));

    let conn = Connection::open(&path).unwrap();
    assert_eq!(current_user_version(&conn).unwrap(), 4);
    assert_eq!(count_rows(&conn, "notes"), 1);
    assert_table_exists(&conn, "categories");
    assert_table_exists(&conn, "note_category_cross_ref");
}

fn broken_step(tx: &Transaction<'_>) -> rusqlite::Result<()> {
    tx.execute_batch(
        "ALTER TABLE notes ADD COLUMN half_applied INTEGER;
         INSERT INTO table_that_does_not_exist VALUES (1);",
    )
}

/// Built-in steps minus 4 -> 5. Fresh databases still reach the latest
/// version through the direct 3 -> 5 jump; version 4 databases are stranded.
fn gapped_registry() -> &'static [Migration] {
    let steps: Vec<Migration> = registry()
        .iter()
        .copied()
        .filter(|step| step.from != 4)
        .collect();
    Box::leak(steps.into_boxed_slice())
}

/// Same gap as [`gapped_registry`], with a final step that always fails.
fn gapped_registry_with_broken_last_step() -> &'static [Migration] {
    let steps: Vec<Migration> = gapped_registry()
        .iter()
        .copied()
        .map(|step| {
            if step.from == 6 && step.to == 7 {
                Migration {
                    apply: broken_step,
                    ..step
                }
            } else {
                step
            }
        })
        .collect();
    Box::leak(steps.into_boxed_slice())
}

fn seed_version(
    path: &Path,
    version: u32,
    seed: impl FnOnce(&Connection) -> rusqlite::Result<()>,
) {
    let mut conn = Connection::open(path).unwrap();
    migrate_to(&mut conn, registry(), version).unwrap();
    seed(&conn).unwrap();
}

fn version_three_fixture() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    migrate_to(&mut conn, registry(), 2).unwrap();
    conn.execute_batch(
        "INSERT INTO notes (title, content, timestamp, category) VALUES
            ('a', '', 1, 'Travel'),
            ('b', '', 2, 'Ideas');",
    )
    .unwrap();
    migrate_to(&mut conn, registry(), 3).unwrap();
    conn
}

fn schema_sql(conn: &Connection) -> Vec<(String, String, Option<String>)> {
    let mut stmt = conn
        .prepare(
            "SELECT type, name, sql
             FROM sqlite_master
             WHERE name NOT LIKE 'sqlite_%'
             ORDER BY type, name;",
        )
        .unwrap();
    stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

fn category_rows(conn: &Connection) -> Vec<(i64, String, String)> {
    let mut stmt = conn
        .prepare("SELECT category_id, name, emoji FROM categories ORDER BY category_id;")
        .unwrap();
    stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

fn column_names(conn: &Connection, table: &str) -> Vec<String> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table});"))
        .unwrap();
    stmt.query_map([], |row| row.get::<_, String>(1))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

fn count_rows(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}

fn table_exists(conn: &Connection, table_name: &str) -> bool {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    exists == 1
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    assert!(table_exists(conn, table_name), "table {table_name} does not exist");
}

fn assert_table_missing(conn: &Connection, table_name: &str) {
    assert!(!table_exists(conn, table_name), "table {table_name} should not exist");
}
