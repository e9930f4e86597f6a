use notegraph_core::db::migrations::latest_version;
use notegraph_core::db::{open_db, open_db_in_memory, DbError};
use notegraph_core::model::timestamp::Timestamp;
use notegraph_core::ROOT_NOTE_ID;
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    for table in ["blobs", "notes", "branches", "note_revisions", "attachments"] {
        assert_table_exists(&conn, table);
    }
}

#[test]
fn root_note_is_seeded_with_empty_content() {
    let conn = open_db_in_memory().unwrap();

    let (title, blob_length): (String, i64) = conn
        .query_row(
            "SELECT n.title, LENGTH(b.content)
             FROM notes n JOIN blobs b ON b.blob_id = n.blob_id
             WHERE n.note_id = ?1;",
            [ROOT_NOTE_ID],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(title, "root");
    assert_eq!(blob_length, 0);
}

#[test]
fn root_note_local_dates_use_session_offset() {
    let conn = open_db_in_memory().unwrap();
    let now = Timestamp::now();

    let (local, utc): (String, String) = conn
        .query_row(
            "SELECT date_created, utc_date_created FROM notes WHERE note_id = ?1;",
            [ROOT_NOTE_ID],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(local.len(), now.local.len());
    assert_eq!(utc.len(), now.utc.len());
    assert_eq!(local[local.len() - 5..], now.local[now.local.len() - 5..]);
    assert_eq!(local[..10], now.local[..10]);
    assert!(utc.ends_with('Z'));
}

#[test]
fn foreign_keys_are_enforced() {
    let conn = open_db_in_memory().unwrap();

    let enabled: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(enabled, 1);
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notegraph.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    let roots: i64 = conn_second
        .query_row("SELECT COUNT(*) FROM notes WHERE note_id = 'root';", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(roots, 1);
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
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

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
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
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
