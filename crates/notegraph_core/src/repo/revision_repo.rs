//! Note revision persistence.
//!
//! # Invariants
//! - Revision rows are insert-only; the only other write is hard deletion.
//! - Listings are newest first: `utc_date_created DESC`, then insertion order
//!   descending for snapshots taken within the same millisecond.

use super::error::RepoResult;
use super::schema::{bool_to_int, ensure_connection_ready, parse_flag};
use crate::model::revision::{NoteRevision, RevisionId, RevisionListItem};
use rusqlite::{params, Connection, Row};

const REVISION_COLUMNS_SQL: &str = "
    r.revision_id AS revision_id,
    r.note_id AS note_id,
    r.type AS type,
    r.mime AS mime,
    r.title AS title,
    r.is_protected AS is_protected,
    r.blob_id AS blob_id,
    r.date_last_edited AS date_last_edited,
    r.date_created AS date_created,
    r.utc_date_last_edited AS utc_date_last_edited,
    r.utc_date_created AS utc_date_created,
    r.utc_date_modified AS utc_date_modified";

/// Repository interface for revision rows.
pub trait RevisionRepository {
    fn insert_revision(&self, revision: &NoteRevision) -> RepoResult<()>;
    fn get_revision(&self, revision_id: &str) -> RepoResult<Option<NoteRevision>>;
    /// Revisions of one note, newest first, with content lengths.
    fn list_revisions(&self, note_id: &str) -> RepoResult<Vec<RevisionListItem>>;
    fn revision_ids_for_note(&self, note_id: &str) -> RepoResult<Vec<RevisionId>>;
    /// Hard-deletes revision rows. Returns the number removed.
    fn delete_revisions(&self, revision_ids: &[RevisionId]) -> RepoResult<usize>;
}

/// SQLite-backed revision repository.
pub struct SqliteRevisionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRevisionRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(
            conn,
            "note_revisions",
            &[
                "revision_id",
                "note_id",
                "type",
                "mime",
                "title",
                "is_protected",
                "blob_id",
                "date_last_edited",
                "date_created",
                "utc_date_last_edited",
                "utc_date_created",
                "utc_date_modified",
            ],
        )?;
        Ok(Self { conn })
    }
}

impl RevisionRepository for SqliteRevisionRepository<'_> {
    fn insert_revision(&self, revision: &NoteRevision) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO note_revisions (
                revision_id,
                note_id,
                type,
                mime,
                title,
                is_protected,
                blob_id,
                date_last_edited,
                date_created,
                utc_date_last_edited,
                utc_date_created,
                utc_date_modified
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12);",
            params![
                revision.revision_id.as_str(),
                revision.note_id.as_str(),
                revision.note_type.as_str(),
                revision.mime.as_str(),
                revision.title.as_str(),
                bool_to_int(revision.is_protected),
                revision.blob_id.as_str(),
                revision.date_last_edited.as_str(),
                revision.date_created.as_str(),
                revision.utc_date_last_edited.as_str(),
                revision.utc_date_created.as_str(),
                revision.utc_date_modified.as_str(),
            ],
        )?;
        Ok(())
    }

    fn get_revision(&self, revision_id: &str) -> RepoResult<Option<NoteRevision>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {REVISION_COLUMNS_SQL}
             FROM note_revisions r
             WHERE r.revision_id = ?1;"
        ))?;
        let mut rows = stmt.query([revision_id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_revision_row(row)?));
        }
        Ok(None)
    }

    fn list_revisions(&self, note_id: &str) -> RepoResult<Vec<RevisionListItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {REVISION_COLUMNS_SQL},
                 LENGTH(blobs.content) AS content_length
             FROM note_revisions r
             INNER JOIN blobs ON blobs.blob_id = r.blob_id
             WHERE r.note_id = ?1
             ORDER BY r.utc_date_created DESC, r.rowid DESC;"
        ))?;
        let mut rows = stmt.query([note_id])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(RevisionListItem {
                revision: parse_revision_row(row)?,
                content_length: row.get("content_length")?,
            });
        }
        Ok(items)
    }

    fn revision_ids_for_note(&self, note_id: &str) -> RepoResult<Vec<RevisionId>> {
        let mut stmt = self.conn.prepare(
            "SELECT revision_id
             FROM note_revisions
             WHERE note_id = ?1
             ORDER BY utc_date_created DESC, rowid DESC;",
        )?;
        let mut rows = stmt.query([note_id])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            ids.push(row.get(0)?);
        }
        Ok(ids)
    }

    fn delete_revisions(&self, revision_ids: &[RevisionId]) -> RepoResult<usize> {
        let mut stmt = self
            .conn
            .prepare("DELETE FROM note_revisions WHERE revision_id = ?1;")?;
        let mut deleted = 0;
        for revision_id in revision_ids {
            deleted += stmt.execute([revision_id.as_str()])?;
        }
        Ok(deleted)
    }
}

fn parse_revision_row(row: &Row<'_>) -> RepoResult<NoteRevision> {
    Ok(NoteRevision {
        revision_id: row.get("revision_id")?,
        note_id: row.get("note_id")?,
        note_type: row.get("type")?,
        mime: row.get("mime")?,
        title: row.get("title")?,
        is_protected: parse_flag(row.get("is_protected")?, "note_revisions.is_protected")?,
        blob_id: row.get("blob_id")?,
        date_last_edited: row.get("date_last_edited")?,
        date_created: row.get("date_created")?,
        utc_date_last_edited: row.get("utc_date_last_edited")?,
        utc_date_created: row.get("utc_date_created")?,
        utc_date_modified: row.get("utc_date_modified")?,
    })
}
