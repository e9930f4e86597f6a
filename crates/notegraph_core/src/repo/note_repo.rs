//! Note record persistence.
//!
//! # Responsibility
//! - Insert, load and update note rows; content itself lives in `blobs`.
//! - Answer date-prefix lookups used by the edited-on-date listing.
//!
//! # Invariants
//! - Notes are never hard-deleted; `soft_delete_note` only sets the tombstone.
//! - Content and title writes always bump the modification dates, even when
//!   the value is unchanged.

use super::error::{RepoError, RepoResult};
use super::schema::{bool_to_int, ensure_connection_ready, parse_flag};
use crate::model::note::{Note, NoteId};
use crate::model::timestamp::Timestamp;
use rusqlite::{params, Connection, Row};

pub(crate) const NOTE_SELECT_SQL: &str = "SELECT
    note_id,
    title,
    type,
    mime,
    blob_id,
    is_protected,
    is_deleted,
    date_created,
    date_modified,
    utc_date_created,
    utc_date_modified
FROM notes";

/// Repository interface for note rows.
pub trait NoteRepository {
    fn insert_note(&self, note: &Note) -> RepoResult<()>;
    fn get_note(&self, note_id: &str, include_deleted: bool) -> RepoResult<Option<Note>>;
    /// Points the note at a new content blob.
    fn set_content(&self, note_id: &str, blob_id: &str) -> RepoResult<()>;
    fn set_title(&self, note_id: &str, title: &str) -> RepoResult<()>;
    fn soft_delete_note(&self, note_id: &str) -> RepoResult<()>;
    /// Ids of notes created or modified at a timestamp starting with `date_prefix`,
    /// plus notes owning a revision last edited at such a timestamp.
    fn note_ids_edited_on(&self, date_prefix: &str, limit: u32) -> RepoResult<Vec<NoteId>>;
}

/// SQLite-backed note repository.
pub struct SqliteNoteRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNoteRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(
            conn,
            "notes",
            &[
                "note_id",
                "title",
                "type",
                "mime",
                "blob_id",
                "is_protected",
                "is_deleted",
                "date_created",
                "date_modified",
                "utc_date_created",
                "utc_date_modified",
            ],
        )?;
        Ok(Self { conn })
    }
}

impl NoteRepository for SqliteNoteRepository<'_> {
    fn insert_note(&self, note: &Note) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO notes (
                note_id,
                title,
                type,
                mime,
                blob_id,
                is_protected,
                is_deleted,
                date_created,
                date_modified,
                utc_date_created,
                utc_date_modified
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11);",
            params![
                note.note_id.as_str(),
                note.title.as_str(),
                note.note_type.as_str(),
                note.mime.as_str(),
                note.blob_id.as_str(),
                bool_to_int(note.is_protected),
                bool_to_int(note.is_deleted),
                note.date_created.as_str(),
                note.date_modified.as_str(),
                note.utc_date_created.as_str(),
                note.utc_date_modified.as_str(),
            ],
        )?;
        Ok(())
    }

    fn get_note(&self, note_id: &str, include_deleted: bool) -> RepoResult<Option<Note>> {
        let mut stmt = self.conn.prepare(&format!(
            "{NOTE_SELECT_SQL}
             WHERE note_id = ?1
               AND (?2 = 1 OR is_deleted = 0);"
        ))?;
        let mut rows = stmt.query(params![note_id, bool_to_int(include_deleted)])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_note_row(row)?));
        }
        Ok(None)
    }

    fn set_content(&self, note_id: &str, blob_id: &str) -> RepoResult<()> {
        let now = Timestamp::now();
        let changed = self.conn.execute(
            "UPDATE notes
             SET blob_id = ?2,
                 date_modified = ?3,
                 utc_date_modified = ?4
             WHERE note_id = ?1
               AND is_deleted = 0;",
            params![note_id, blob_id, now.local, now.utc],
        )?;
        if changed == 0 {
            return Err(RepoError::NoteNotFound(note_id.to_string()));
        }
        Ok(())
    }

    fn set_title(&self, note_id: &str, title: &str) -> RepoResult<()> {
        let now = Timestamp::now();
        let changed = self.conn.execute(
            "UPDATE notes
             SET title = ?2,
                 date_modified = ?3,
                 utc_date_modified = ?4
             WHERE note_id = ?1
               AND is_deleted = 0;",
            params![note_id, title, now.local, now.utc],
        )?;
        if changed == 0 {
            return Err(RepoError::NoteNotFound(note_id.to_string()));
        }
        Ok(())
    }

    fn soft_delete_note(&self, note_id: &str) -> RepoResult<()> {
        let now = Timestamp::now();
        let changed = self.conn.execute(
            "UPDATE notes
             SET is_deleted = 1,
                 date_modified = ?2,
                 utc_date_modified = ?3
             WHERE note_id = ?1
               AND is_deleted = 0;",
            params![note_id, now.local, now.utc],
        )?;
        if changed == 0 {
            return Err(RepoError::NoteNotFound(note_id.to_string()));
        }
        Ok(())
    }

    fn note_ids_edited_on(&self, date_prefix: &str, limit: u32) -> RepoResult<Vec<NoteId>> {
        let pattern = format!("{}%", escape_like(date_prefix));
        let mut stmt = self.conn.prepare(
            "SELECT note_id
             FROM notes
             WHERE note_id IN (
                     SELECT note_id FROM notes
                     WHERE date_created LIKE ?1 ESCAPE '\\'
                        OR date_modified LIKE ?1 ESCAPE '\\'
                 UNION ALL
                     SELECT note_id FROM note_revisions
                     WHERE date_last_edited LIKE ?1 ESCAPE '\\'
             )
             ORDER BY is_deleted ASC, utc_date_modified DESC, note_id ASC
             LIMIT ?2;",
        )?;
        let mut rows = stmt.query(params![pattern, i64::from(limit)])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            ids.push(row.get(0)?);
        }
        Ok(ids)
    }
}

pub(crate) fn parse_note_row(row: &Row<'_>) -> RepoResult<Note> {
    Ok(Note {
        note_id: row.get("note_id")?,
        title: row.get("title")?,
        note_type: row.get("type")?,
        mime: row.get("mime")?,
        blob_id: row.get("blob_id")?,
        is_protected: parse_flag(row.get("is_protected")?, "notes.is_protected")?,
        is_deleted: parse_flag(row.get("is_deleted")?, "notes.is_deleted")?,
        date_created: row.get("date_created")?,
        date_modified: row.get("date_modified")?,
        utc_date_created: row.get("utc_date_created")?,
        utc_date_modified: row.get("utc_date_modified")?,
    })
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::escape_like;

    #[test]
    fn escape_like_protects_wildcards() {
        assert_eq!(escape_like("2024-05_%"), "2024-05\\_\\%");
        assert_eq!(escape_like("2024-05-01"), "2024-05-01");
    }
}
