use notegraph_core::model::blob::{blob_id_for, PREVIEW_MAX_CHARS};
use notegraph_core::{
    open_db_in_memory, BlobContent, BlobStore, NewNote, NoteService, RepoError, SqliteBlobStore,
};

#[test]
fn put_is_content_addressed_and_deduplicated() {
    let conn = open_db_in_memory().unwrap();
    let blobs = SqliteBlobStore::try_new(&conn).unwrap();
    let before = blobs.count().unwrap();

    let first = blobs.put(b"same bytes").unwrap();
    let second = blobs.put(b"same bytes").unwrap();

    assert_eq!(first, second);
    assert_eq!(first, blob_id_for(b"same bytes"));
    assert_eq!(blobs.count().unwrap(), before + 1);
    assert_eq!(blobs.get(&first).unwrap(), b"same bytes".to_vec());
    assert_eq!(blobs.content_length(&first).unwrap(), 10);
    assert!(blobs.exists(&first).unwrap());
}

#[test]
fn unknown_blob_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let blobs = SqliteBlobStore::try_new(&conn).unwrap();

    let err = blobs.get("missing").unwrap_err();
    assert!(matches!(err, RepoError::BlobNotFound(ref id) if id == "missing"));
    assert!(err.is_not_found());
    assert!(!blobs.exists("missing").unwrap());
    assert!(blobs.content_length("missing").unwrap_err().is_not_found());
    assert!(blobs.view("missing", true).unwrap_err().is_not_found());
}

#[test]
fn preview_view_is_bounded_but_reports_full_length() {
    let conn = open_db_in_memory().unwrap();
    let blobs = SqliteBlobStore::try_new(&conn).unwrap();
    let text = "ab".repeat(PREVIEW_MAX_CHARS);
    let blob_id = blobs.put(text.as_bytes()).unwrap();

    let preview = blobs.view(&blob_id, true).unwrap();
    assert!(preview.preview);
    assert_eq!(preview.content_length, (PREVIEW_MAX_CHARS * 2) as i64);
    match preview.content {
        BlobContent::Text(value) => assert_eq!(value.chars().count(), PREVIEW_MAX_CHARS),
        other => panic!("expected text, got {other:?}"),
    }

    let full = blobs.view(&blob_id, false).unwrap();
    assert!(!full.preview);
    assert_eq!(full.content, BlobContent::Text(text));
}

#[test]
fn binary_payload_is_exposed_as_bytes() {
    let conn = open_db_in_memory().unwrap();
    let blobs = SqliteBlobStore::try_new(&conn).unwrap();
    let blob_id = blobs.put(&[0xff, 0x00, 0xfe]).unwrap();

    let view = blobs.view(&blob_id, false).unwrap();
    assert_eq!(view.content, BlobContent::Binary(vec![0xff, 0x00, 0xfe]));
    assert_eq!(view.content_length, 3);
}

#[test]
fn erase_unused_blobs_keeps_referenced_payloads() {
    let conn = open_db_in_memory().unwrap();
    let notes = NoteService::new(&conn);
    let (note, _) = notes
        .create_note("root", NewNote::text("kept", "<p>kept</p>"))
        .unwrap();
    let blobs = SqliteBlobStore::try_new(&conn).unwrap();
    let orphan = blobs.put(b"nobody points here").unwrap();

    let erased = blobs.erase_unused_blobs().unwrap();

    assert_eq!(erased, 1);
    assert!(!blobs.exists(&orphan).unwrap());
    assert!(blobs.exists(&note.blob_id).unwrap());
}
