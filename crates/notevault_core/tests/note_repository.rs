use notevault_core::db::open_db_in_memory;
use notevault_core::{
    CategoryRepository, Category, ModelValidationError, Note, NoteCategoryCrossRef, NoteQuery,
    NoteRepository, RepoError, SqliteCategoryRepository, SqliteNoteRepository,
};
use rusqlite::Connection;

fn note(title: &str, content: &str, modified_at: i64) -> Note {
    Note::new(title, content, modified_at)
}

fn titles(notes: &[Note]) -> Vec<&str> {
    notes.iter().map(|note| note.title.as_str()).collect()
}

#[test]
fn insert_assigns_ids_and_get_returns_equal_record() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteNoteRepository::new(&conn);

    let mut draft = note("Shopping", "milk", 100);
    draft.location = Some("48.8566,2.3522".to_string());
    draft.notification_offset = Some(3_600_000);
    draft.is_markdown_enabled = true;

    let id = repo.insert_note(&draft).unwrap();
    assert!(id > 0);
    let second = repo.insert_note(&note("Other", "", 100)).unwrap();
    assert_ne!(id, second);

    let stored = repo.get_note(id).unwrap().unwrap();
    assert_eq!(stored, Note { id, ..draft });
}

#[test]
fn get_missing_note_is_none() {
    let conn = open_db_in_memory().unwrap();
    assert!(SqliteNoteRepository::new(&conn)
        .get_note(42)
        .unwrap()
        .is_none());
}

#[test]
fn insert_rejects_invalid_records() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteNoteRepository::new(&conn);

    let mut bad_location = note("a", "", 1);
    bad_location.location = Some("somewhere".to_string());
    let err = repo.insert_note(&bad_location).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ModelValidationError::InvalidLocation(_))
    ));

    let mut negative = note("a", "", 1);
    negative.notification_offset = Some(-1);
    assert!(matches!(
        repo.insert_note(&negative).unwrap_err(),
        RepoError::Validation(ModelValidationError::NegativeNotificationOffset(-1))
    ));
    assert!(repo.list_notes(&NoteQuery::All).unwrap().is_empty());
}

#[test]
fn list_orders_by_modification_time_descending() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteNoteRepository::new(&conn);
    repo.insert_note(&note("old", "", 10)).unwrap();
    repo.insert_note(&note("new", "", 30)).unwrap();
    repo.insert_note(&note("mid", "", 20)).unwrap();

    let all = repo.list_notes(&NoteQuery::All).unwrap();
    assert_eq!(titles(&all), vec!["new", "mid", "old"]);
}

#[test]
fn update_never_moves_modification_time_backwards() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteNoteRepository::new(&conn);
    let id = repo.insert_note(&note("title", "", 500)).unwrap();

    let mut stale = repo.get_note(id).unwrap().unwrap();
    stale.title = "renamed".to_string();
    stale.created_at = 100;
    stale.modified_at = 200;
    repo.update_note(&stale).unwrap();

    let stored = repo.get_note(id).unwrap().unwrap();
    assert_eq!(stored.title, "renamed");
    assert_eq!(stored.modified_at, 500);
}

#[test]
fn update_and_delete_of_missing_note_report_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteNoteRepository::new(&conn);

    let mut ghost = note("ghost", "", 1);
    ghost.id = 99;
    assert!(matches!(
        repo.update_note(&ghost).unwrap_err(),
        RepoError::NoteNotFound(99)
    ));
    assert!(matches!(
        repo.delete_note(99).unwrap_err(),
        RepoError::NoteNotFound(99)
    ));
}

#[test]
fn toggle_favorite_is_an_involution_and_keeps_timestamp() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteNoteRepository::new(&conn);
    let id = repo.insert_note(&note("fav", "", 77)).unwrap();

    assert!(repo.toggle_favorite(id).unwrap());
    assert_eq!(
        titles(&repo.list_notes(&NoteQuery::Favorites).unwrap()),
        vec!["fav"]
    );
    assert!(!repo.toggle_favorite(id).unwrap());
    assert!(repo.list_notes(&NoteQuery::Favorites).unwrap().is_empty());

    let stored = repo.get_note(id).unwrap().unwrap();
    assert!(!stored.is_favorite);
    assert_eq!(stored.modified_at, 77);
    assert!(matches!(
        repo.toggle_favorite(1234).unwrap_err(),
        RepoError::NoteNotFound(1234)
    ));
}

#[test]
fn toggle_markdown_flips_in_place() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteNoteRepository::new(&conn);
    let id = repo.insert_note(&note("md", "# heading", 9)).unwrap();

    assert!(repo.toggle_markdown(id).unwrap());
    assert!(!repo.toggle_markdown(id).unwrap());
    assert!(repo.toggle_markdown(id).unwrap());

    let stored = repo.get_note(id).unwrap().unwrap();
    assert!(stored.is_markdown_enabled);
    assert!(!stored.is_favorite);
    assert_eq!(stored.modified_at, 9);
    assert!(matches!(
        repo.toggle_markdown(404).unwrap_err(),
        RepoError::NoteNotFound(404)
    ));
}

#[test]
fn flag_writes_touch_single_column() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteNoteRepository::new(&conn);
    let id = repo.insert_note(&note("flags", "body", 5)).unwrap();

    repo.set_markdown_enabled(id, true).unwrap();
    repo.set_secret(id, true).unwrap();

    let stored = repo.get_note(id).unwrap().unwrap();
    assert!(stored.is_markdown_enabled);
    assert!(stored.is_secret);
    assert_eq!(stored.content, "body");
    assert_eq!(
        titles(&repo.list_notes(&NoteQuery::Secret).unwrap()),
        vec!["flags"]
    );
    assert!(matches!(
        repo.set_secret(404, true).unwrap_err(),
        RepoError::NoteNotFound(404)
    ));
}

#[test]
fn with_location_lists_only_tagged_notes() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteNoteRepository::new(&conn);
    let mut tagged = note("tagged", "", 2);
    tagged.location = Some("-33.86,151.2".to_string());
    repo.insert_note(&tagged).unwrap();
    repo.insert_note(&note("plain", "", 1)).unwrap();

    assert_eq!(
        titles(&repo.list_notes(&NoteQuery::WithLocation).unwrap()),
        vec!["tagged"]
    );
}

#[test]
fn search_is_case_insensitive_over_title_or_content() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteNoteRepository::new(&conn);
    repo.insert_note(&note("Shopping list", "milk", 3)).unwrap();
    repo.insert_note(&note("Travel", "Pack the MILK frother", 2))
        .unwrap();
    repo.insert_note(&note("Über Notiz", "", 1)).unwrap();
    repo.insert_note(&note("Unrelated", "", 0)).unwrap();

    let hits = repo.search_notes("milk").unwrap();
    assert_eq!(titles(&hits), vec!["Shopping list", "Travel"]);

    let all = repo.list_notes(&NoteQuery::All).unwrap();
    assert!(hits.iter().all(|hit| all.contains(hit)));

    assert_eq!(titles(&repo.search_notes("ÜBER").unwrap()), vec!["Über Notiz"]);
    assert!(repo.search_notes("").unwrap().is_empty());
    assert!(repo.search_notes("absent").unwrap().is_empty());
}

#[test]
fn search_keeps_surrounding_whitespace_of_query() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteNoteRepository::new(&conn);
    repo.insert_note(&note("Shopping", "milk, eggs", 2)).unwrap();
    repo.insert_note(&note("Recipe", "add milk slowly", 1)).unwrap();

    assert_eq!(titles(&repo.search_notes("milk ").unwrap()), vec!["Recipe"]);
    assert_eq!(titles(&repo.search_notes(" Milk").unwrap()), vec!["Recipe"]);
    assert!(repo.search_notes(" milk, ").unwrap().is_empty());
    assert_eq!(
        titles(&repo.search_notes("milk").unwrap()),
        vec!["Shopping", "Recipe"]
    );
}

#[test]
fn category_queries_follow_links() {
    let conn = open_db_in_memory().unwrap();
    let (work_id, first, second) = seed_categories(&conn);
    let notes = SqliteNoteRepository::new(&conn);

    assert_eq!(
        titles(&notes.list_notes(&NoteQuery::CategoryId(work_id)).unwrap()),
        vec!["second", "first"]
    );
    assert_eq!(
        titles(
            &notes
                .list_notes(&NoteQuery::CategoryName(" WORK ".to_string()))
                .unwrap()
        ),
        vec!["second", "first"]
    );

    notes.delete_note(first).unwrap();
    assert_eq!(
        titles(&notes.list_notes(&NoteQuery::CategoryId(work_id)).unwrap()),
        vec!["second"]
    );
    let links = SqliteCategoryRepository::new(&conn).list_links().unwrap();
    assert!(links.contains(&NoteCategoryCrossRef {
        note_id: first,
        category_id: work_id
    }));
    assert!(links.contains(&NoteCategoryCrossRef {
        note_id: second,
        category_id: work_id
    }));
}

fn seed_categories(conn: &Connection) -> (i64, i64, i64) {
    let notes = SqliteNoteRepository::new(conn);
    let categories = SqliteCategoryRepository::new(conn);
    let first = notes.insert_note(&note("first", "", 1)).unwrap();
    let second = notes.insert_note(&note("second", "", 2)).unwrap();
    notes.insert_note(&note("loose", "", 3)).unwrap();
    let work = categories.insert_category(&Category::new("Work")).unwrap();
    categories
        .set_note_categories(first, &[work])
        .unwrap();
    categories
        .set_note_categories(second, &[work, work])
        .unwrap();
    (work, first, second)
}
