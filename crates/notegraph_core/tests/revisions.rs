use notegraph_core::model::content::attachment_references;
use notegraph_core::{
    open_db_in_memory, Attachment, BlobContent, BlobStore, NewAttachment, NewNote, Note,
    NoteService, RevisionService, RevisionServiceError, SqliteBlobStore, ROOT_NOTE_ID,
};
use rusqlite::Connection;

fn create_note(conn: &Connection, title: &str, content: &str) -> Note {
    NoteService::new(conn)
        .create_note(ROOT_NOTE_ID, NewNote::text(title, content))
        .unwrap()
        .0
}

fn attach(conn: &Connection, note_id: &str, bytes: &[u8]) -> Attachment {
    NoteService::new(conn)
        .add_attachment(
            note_id,
            NewAttachment {
                role: "image".to_string(),
                mime: "image/png".to_string(),
                title: "picture.png".to_string(),
                content: bytes.to_vec(),
            },
        )
        .unwrap()
}

fn image_ref(attachment: &Attachment) -> String {
    format!("<img src=\"api/attachments/{}/image\">", attachment.attachment_id)
}

fn note_text(conn: &Connection, note_id: &str) -> String {
    String::from_utf8(NoteService::new(conn).note_content(note_id).unwrap()).unwrap()
}

fn revision_count(conn: &Connection, note_id: &str) -> usize {
    RevisionService::new(conn)
        .list_revisions(note_id)
        .unwrap()
        .len()
}

#[test]
fn create_revision_snapshots_note_and_attachments() {
    let conn = open_db_in_memory().unwrap();
    let note = create_note(&conn, "Draft", "<p>draft</p>");
    let original = attach(&conn, &note.note_id, b"h1 bytes");
    let note = NoteService::new(&conn)
        .update_content(&note.note_id, image_ref(&original).as_bytes())
        .unwrap();

    let service = RevisionService::new(&conn);
    let revision = service.create_revision(&note.note_id).unwrap();

    assert_eq!(revision.note_id, note.note_id);
    assert_eq!(revision.title, "Draft");
    assert_eq!(revision.note_type, "text");
    assert_eq!(revision.mime, "text/html");
    assert_eq!(revision.date_last_edited, note.date_modified);
    assert_eq!(revision.utc_date_last_edited, note.utc_date_modified);

    let copies = service
        .list_revision_attachments(&revision.revision_id)
        .unwrap();
    assert_eq!(copies.len(), 1);
    assert_ne!(copies[0].attachment_id, original.attachment_id);
    assert_eq!(copies[0].blob_id, original.blob_id);
    assert_eq!(copies[0].owner.id(), revision.revision_id);

    let content = service
        .get_revision_content(&revision.revision_id, false)
        .unwrap();
    let BlobContent::Text(text) = content.content else {
        panic!("expected text content");
    };
    assert_eq!(
        attachment_references(&text),
        vec![copies[0].attachment_id.clone()]
    );

    // the note itself is untouched
    assert_eq!(note_text(&conn, &note.note_id), image_ref(&original));
}

#[test]
fn revision_without_attachments_shares_the_content_blob() {
    let conn = open_db_in_memory().unwrap();
    let note = create_note(&conn, "Plain", "<p>plain</p>");

    let revision = RevisionService::new(&conn)
        .create_revision(&note.note_id)
        .unwrap();
    assert_eq!(revision.blob_id, note.blob_id);
}

#[test]
fn list_revisions_is_newest_first_with_content_length() {
    let conn = open_db_in_memory().unwrap();
    let note = create_note(&conn, "Log", "<p>one</p>");
    let service = RevisionService::new(&conn);
    let first = service.create_revision(&note.note_id).unwrap();
    NoteService::new(&conn)
        .update_content(&note.note_id, b"<p>second version</p>")
        .unwrap();
    let second = service.create_revision(&note.note_id).unwrap();

    let items = service.list_revisions(&note.note_id).unwrap();
    let ids: Vec<&str> = items
        .iter()
        .map(|item| item.revision.revision_id.as_str())
        .collect();
    assert_eq!(ids, vec![second.revision_id.as_str(), first.revision_id.as_str()]);
    assert_eq!(items[0].content_length, 21);
    assert_eq!(items[1].content_length, 10);
}

#[test]
fn list_revisions_of_unknown_note_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let err = RevisionService::new(&conn)
        .list_revisions("missing")
        .unwrap_err();
    assert!(matches!(err, RevisionServiceError::NoteNotFound(_)));
}

#[test]
fn restore_rewrites_attachment_links_to_fresh_copies() {
    let conn = open_db_in_memory().unwrap();
    let notes = NoteService::new(&conn);
    let note = create_note(&conn, "Trip", "<p>start</p>");
    let att1 = attach(&conn, &note.note_id, b"h1 bytes");
    notes
        .update_content(&note.note_id, image_ref(&att1).as_bytes())
        .unwrap();

    let service = RevisionService::new(&conn);
    let rev1 = service.create_revision(&note.note_id).unwrap();

    notes.delete_attachment(&att1.attachment_id).unwrap();
    let att2 = attach(&conn, &note.note_id, b"h2 bytes");
    notes
        .update_content(&note.note_id, image_ref(&att2).as_bytes())
        .unwrap();
    notes.rename_note(&note.note_id, "Trip (edited)").unwrap();

    let restored = service.restore_revision(&rev1.revision_id).unwrap();
    assert_eq!(restored.title, "Trip");

    let live = notes.list_attachments(&note.note_id).unwrap();
    assert_eq!(live.len(), 1);
    let att3 = &live[0];
    assert_ne!(att3.attachment_id, att1.attachment_id);
    assert_ne!(att3.attachment_id, att2.attachment_id);
    let blobs = SqliteBlobStore::try_new(&conn).unwrap();
    assert_eq!(blobs.get(&att3.blob_id).unwrap(), b"h1 bytes".to_vec());

    let text = note_text(&conn, &note.note_id);
    assert_eq!(text, image_ref(att3));
    assert!(!text.contains(&att1.attachment_id));
    assert!(!text.contains(&att2.attachment_id));

    // pre-restore state is kept as its own revision
    let items = service.list_revisions(&note.note_id).unwrap();
    assert_eq!(items.len(), 2);
    let backup = &items[0].revision;
    assert_eq!(backup.title, "Trip (edited)");
    let backup_attachments = service
        .list_revision_attachments(&backup.revision_id)
        .unwrap();
    assert_eq!(backup_attachments.len(), 1);
    assert_eq!(backup_attachments[0].blob_id, att2.blob_id);
}

#[test]
fn restore_bumps_modification_date_even_when_content_is_unchanged() {
    let conn = open_db_in_memory().unwrap();
    let note = create_note(&conn, "Same", "<p>same</p>");
    let service = RevisionService::new(&conn);
    let revision = service.create_revision(&note.note_id).unwrap();

    std::thread::sleep(std::time::Duration::from_millis(5));
    let restored = service.restore_revision(&revision.revision_id).unwrap();

    assert_eq!(restored.blob_id, note.blob_id);
    assert!(restored.utc_date_modified > note.utc_date_modified);
}

#[test]
fn failed_restore_leaves_everything_as_before() {
    let conn = open_db_in_memory().unwrap();
    let notes = NoteService::new(&conn);
    let note = create_note(&conn, "Fragile", "<p>start</p>");
    let att1 = attach(&conn, &note.note_id, b"lost bytes");
    notes
        .update_content(&note.note_id, image_ref(&att1).as_bytes())
        .unwrap();
    let service = RevisionService::new(&conn);
    let rev1 = service.create_revision(&note.note_id).unwrap();

    notes.delete_attachment(&att1.attachment_id).unwrap();
    let att2 = attach(&conn, &note.note_id, b"current bytes");
    let current = image_ref(&att2);
    notes
        .update_content(&note.note_id, current.as_bytes())
        .unwrap();
    notes.rename_note(&note.note_id, "Fragile v2").unwrap();

    // Simulate a storage fault: the revision attachment payload vanishes.
    conn.execute_batch("PRAGMA foreign_keys = OFF;").unwrap();
    conn.execute("DELETE FROM blobs WHERE blob_id = ?1;", [att1.blob_id.as_str()])
        .unwrap();
    conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();

    let err = service.restore_revision(&rev1.revision_id).unwrap_err();
    assert!(matches!(err, RevisionServiceError::BlobNotFound(_)));
    assert!(err.is_not_found());

    assert_eq!(revision_count(&conn, &note.note_id), 1);
    let live = notes.list_attachments(&note.note_id).unwrap();
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].attachment_id, att2.attachment_id);
    assert_eq!(note_text(&conn, &note.note_id), current);
    assert_eq!(
        notes.get_note(&note.note_id).unwrap().unwrap().title,
        "Fragile v2"
    );
}

#[test]
fn restore_of_unknown_revision_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let err = RevisionService::new(&conn)
        .restore_revision("missing")
        .unwrap_err();
    assert!(matches!(err, RevisionServiceError::RevisionNotFound(_)));
}

#[test]
fn erase_revisions_removes_rows_and_owned_attachments() {
    let conn = open_db_in_memory().unwrap();
    let note = create_note(&conn, "Erase", "<p>x</p>");
    attach(&conn, &note.note_id, b"payload");
    let service = RevisionService::new(&conn);
    let keep = service.create_revision(&note.note_id).unwrap();
    let erased_revision = service.create_revision(&note.note_id).unwrap();

    let erased = service
        .erase_revisions(&[erased_revision.revision_id.clone(), erased_revision.revision_id.clone()])
        .unwrap();

    assert_eq!(erased, 1);
    assert!(service
        .get_revision(&erased_revision.revision_id)
        .unwrap_err()
        .is_not_found());
    let remaining: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM attachments WHERE owner_kind = 'revision';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(remaining, 1);
    assert_eq!(
        service
            .list_revision_attachments(&keep.revision_id)
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn erase_with_unknown_id_deletes_nothing() {
    let conn = open_db_in_memory().unwrap();
    let note = create_note(&conn, "Erase", "<p>x</p>");
    let service = RevisionService::new(&conn);
    let revision = service.create_revision(&note.note_id).unwrap();

    let err = service
        .erase_revisions(&[revision.revision_id.clone(), "missing".to_string()])
        .unwrap_err();

    assert!(matches!(err, RevisionServiceError::RevisionNotFound(ref id) if id == "missing"));
    assert_eq!(revision_count(&conn, &note.note_id), 1);
}

#[test]
fn erase_all_revisions_clears_history_of_one_note() {
    let conn = open_db_in_memory().unwrap();
    let first = create_note(&conn, "First", "<p>1</p>");
    let second = create_note(&conn, "Second", "<p>2</p>");
    let service = RevisionService::new(&conn);
    service.create_revision(&first.note_id).unwrap();
    service.create_revision(&first.note_id).unwrap();
    service.create_revision(&second.note_id).unwrap();

    assert_eq!(service.erase_all_revisions(&first.note_id).unwrap(), 2);
    assert_eq!(revision_count(&conn, &first.note_id), 0);
    assert_eq!(revision_count(&conn, &second.note_id), 1);
}

#[test]
fn protected_revision_content_requires_unlocked_session() {
    let conn = open_db_in_memory().unwrap();
    let mut new_note = NewNote::text("Secret", "<p>secret</p>");
    new_note.is_protected = true;
    let (note, _) = NoteService::new(&conn)
        .create_note(ROOT_NOTE_ID, new_note)
        .unwrap();

    let locked = RevisionService::new(&conn);
    let revision = locked.create_revision(&note.note_id).unwrap();
    assert!(revision.is_protected);

    let err = locked
        .get_revision_content(&revision.revision_id, false)
        .unwrap_err();
    assert!(matches!(err, RevisionServiceError::ContentUnavailable(_)));
    let err = locked.restore_revision(&revision.revision_id).unwrap_err();
    assert!(matches!(err, RevisionServiceError::ContentUnavailable(_)));

    let unlocked = RevisionService::new(&conn).with_protected_session(true);
    let view = unlocked
        .get_revision_content(&revision.revision_id, true)
        .unwrap();
    assert!(view.preview);
    assert_eq!(view.content, BlobContent::Text("<p>secret</p>".to_string()));
}
