use notegraph_core::{
    open_db_in_memory, EditedNotesService, GraphService, HoistingContext, NewNote, Note,
    NoteService, RevisionService, ROOT_NOTE_ID,
};
use rusqlite::Connection;

fn create(conn: &Connection, parent: &str, title: &str) -> Note {
    NoteService::new(conn)
        .create_note(parent, NewNote::text(title, "<p>body</p>"))
        .unwrap()
        .0
}

fn today(note: &Note) -> String {
    note.date_created[..10].to_string()
}

fn backdate_note(conn: &Connection, note_id: &str, local: &str) {
    conn.execute(
        "UPDATE notes SET date_created = ?2, date_modified = ?2 WHERE note_id = ?1;",
        [note_id, local],
    )
    .unwrap();
}

#[test]
fn matches_note_dates_and_revision_edit_dates_by_prefix() {
    let conn = open_db_in_memory().unwrap();
    let created = create(&conn, ROOT_NOTE_ID, "Created");
    let revised = create(&conn, ROOT_NOTE_ID, "Revised");
    let untouched = create(&conn, ROOT_NOTE_ID, "Untouched");
    backdate_note(&conn, &created.note_id, "2001-02-03 10:00:00.000+0100");
    backdate_note(&conn, &revised.note_id, "2005-01-01 10:00:00.000+0100");
    backdate_note(&conn, &untouched.note_id, "2005-01-01 10:00:00.000+0100");
    let revision = RevisionService::new(&conn)
        .create_revision(&revised.note_id)
        .unwrap();
    conn.execute(
        "UPDATE note_revisions SET date_last_edited = '2001-02-03 18:30:00.000+0100'
         WHERE revision_id = ?1;",
        [revision.revision_id.as_str()],
    )
    .unwrap();

    let edited = EditedNotesService::new(&conn)
        .edited_on_date("2001-02-03", &HoistingContext::unscoped())
        .unwrap();

    let mut ids: Vec<&str> = edited.iter().map(|e| e.note.note_id.as_str()).collect();
    ids.sort_unstable();
    let mut expected = vec![created.note_id.as_str(), revised.note_id.as_str()];
    expected.sort_unstable();
    assert_eq!(ids, expected);

    let month = EditedNotesService::new(&conn)
        .edited_on_date("2005-01", &HoistingContext::unscoped())
        .unwrap();
    assert_eq!(month.len(), 2);
}

#[test]
fn unmatched_prefix_returns_nothing() {
    let conn = open_db_in_memory().unwrap();
    create(&conn, ROOT_NOTE_ID, "Today");

    let edited = EditedNotesService::new(&conn)
        .edited_on_date("1999-12-31", &HoistingContext::unscoped())
        .unwrap();
    assert!(edited.is_empty());
}

#[test]
fn lists_inside_a_caller_transaction() {
    let conn = open_db_in_memory().unwrap();
    let note = create(&conn, ROOT_NOTE_ID, "Inside");

    let tx = conn.unchecked_transaction().unwrap();
    let edited = EditedNotesService::new(&tx)
        .edited_on_date(&today(&note), &HoistingContext::unscoped())
        .unwrap();
    let entry = edited
        .iter()
        .find(|entry| entry.note.note_id == note.note_id)
        .unwrap();
    assert_eq!(
        entry.note_path.as_deref(),
        Some(&[ROOT_NOTE_ID.to_string(), note.note_id.clone()][..])
    );
    // the caller still owns its transaction
    assert!(!tx.is_autocommit());
    tx.commit().unwrap();
}

#[test]
fn deleted_notes_come_last_without_path() {
    let conn = open_db_in_memory().unwrap();
    let gone = create(&conn, ROOT_NOTE_ID, "Gone");
    let kept = create(&conn, ROOT_NOTE_ID, "Kept");
    NoteService::new(&conn).delete_note(&gone.note_id).unwrap();

    let edited = EditedNotesService::new(&conn)
        .edited_on_date(&today(&kept), &HoistingContext::unscoped())
        .unwrap();

    let last = edited.last().unwrap();
    assert_eq!(last.note.note_id, gone.note_id);
    assert!(last.note.is_deleted);
    assert_eq!(last.note_path, None);

    let kept_entry = edited
        .iter()
        .find(|entry| entry.note.note_id == kept.note_id)
        .unwrap();
    assert_eq!(
        kept_entry.note_path.as_deref(),
        Some(&[ROOT_NOTE_ID.to_string(), kept.note_id.clone()][..])
    );
}

#[test]
fn hoisting_hides_notes_outside_the_subtree() {
    let conn = open_db_in_memory().unwrap();
    let hoisted = create(&conn, ROOT_NOTE_ID, "Work");
    let inside = create(&conn, &hoisted.note_id, "Inside");
    let outside = create(&conn, ROOT_NOTE_ID, "Outside");
    let shared = create(&conn, ROOT_NOTE_ID, "Shared");
    GraphService::new(&conn)
        .link(&inside.note_id, &shared.note_id, None, None)
        .unwrap();

    let edited = EditedNotesService::new(&conn)
        .edited_on_date(&today(&inside), &HoistingContext::new(hoisted.note_id.clone()))
        .unwrap();

    let ids: Vec<&str> = edited.iter().map(|e| e.note.note_id.as_str()).collect();
    assert!(ids.contains(&hoisted.note_id.as_str()));
    assert!(ids.contains(&inside.note_id.as_str()));
    assert!(ids.contains(&shared.note_id.as_str()));
    assert!(!ids.contains(&outside.note_id.as_str()));
    assert!(!ids.contains(&ROOT_NOTE_ID));

    // paths stay relative to the true root
    let shared_entry = edited
        .iter()
        .find(|entry| entry.note.note_id == shared.note_id)
        .unwrap();
    assert_eq!(
        shared_entry.note_path.as_deref(),
        Some(&[ROOT_NOTE_ID.to_string(), shared.note_id.clone()][..])
    );
}

#[test]
fn protected_titles_are_masked_while_locked() {
    let conn = open_db_in_memory().unwrap();
    let mut secret = NewNote::text("Diary", "<p>secret</p>");
    secret.is_protected = true;
    let (note, _) = NoteService::new(&conn)
        .create_note(ROOT_NOTE_ID, secret)
        .unwrap();
    let prefix = today(&note);

    let locked = EditedNotesService::new(&conn)
        .edited_on_date(&prefix, &HoistingContext::unscoped())
        .unwrap();
    let entry = locked
        .iter()
        .find(|entry| entry.note.note_id == note.note_id)
        .unwrap();
    assert_eq!(entry.note.title, "[protected]");

    let unlocked = EditedNotesService::new(&conn)
        .with_protected_session(true)
        .edited_on_date(&prefix, &HoistingContext::unscoped())
        .unwrap();
    let entry = unlocked
        .iter()
        .find(|entry| entry.note.note_id == note.note_id)
        .unwrap();
    assert_eq!(entry.note.title, "Diary");
}

#[test]
fn serializes_flat_camel_case_records() {
    let conn = open_db_in_memory().unwrap();
    let note = create(&conn, ROOT_NOTE_ID, "Json");

    let edited = EditedNotesService::new(&conn)
        .edited_on_date(&today(&note), &HoistingContext::unscoped())
        .unwrap();
    let entry = edited
        .iter()
        .find(|entry| entry.note.note_id == note.note_id)
        .unwrap();
    let value = serde_json::to_value(entry).unwrap();

    assert_eq!(value["noteId"], note.note_id.as_str());
    assert_eq!(value["title"], "Json");
    assert_eq!(value["type"], "text");
    assert_eq!(value["isDeleted"], false);
    assert_eq!(value["notePath"][0], "root");
    assert_eq!(value["notePath"][1], note.note_id.as_str());
}
