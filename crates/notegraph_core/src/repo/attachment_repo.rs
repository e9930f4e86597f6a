//! Attachment persistence for note- and revision-owned attachments.
//!
//! # Invariants
//! - `owner_kind` + `owner_id` never change after insert.
//! - Note attachments are soft-deleted; revision attachments are hard-deleted
//!   together with their revision.

use super::error::{RepoError, RepoResult};
use super::schema::{bool_to_int, ensure_connection_ready, parse_flag};
use crate::model::attachment::{Attachment, AttachmentOwner};
use crate::model::revision::RevisionId;
use crate::model::timestamp::Timestamp;
use rusqlite::{params, Connection, Row};

const ATTACHMENT_SELECT_SQL: &str = "SELECT
    attachment_id,
    owner_kind,
    owner_id,
    role,
    mime,
    title,
    position,
    blob_id,
    is_protected,
    is_deleted,
    utc_date_modified
FROM attachments";

/// Repository interface for attachment rows.
pub trait AttachmentRepository {
    fn insert_attachment(&self, attachment: &Attachment) -> RepoResult<()>;
    fn get_attachment(&self, attachment_id: &str) -> RepoResult<Option<Attachment>>;
    /// Attachments of one owner ordered by `position ASC, attachment_id ASC`.
    fn list_for_owner(
        &self,
        owner: &AttachmentOwner,
        include_deleted: bool,
    ) -> RepoResult<Vec<Attachment>>;
    /// Soft-deletes one live attachment. Returns whether a row changed.
    fn soft_delete_attachment(&self, attachment_id: &str) -> RepoResult<bool>;
    /// Soft-deletes every live attachment of `owner`. Returns the count.
    fn soft_delete_for_owner(&self, owner: &AttachmentOwner) -> RepoResult<usize>;
    /// Hard-deletes every attachment owned by the listed revisions.
    fn delete_for_revisions(&self, revision_ids: &[RevisionId]) -> RepoResult<usize>;
}

/// SQLite-backed attachment repository.
pub struct SqliteAttachmentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAttachmentRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(
            conn,
            "attachments",
            &[
                "attachment_id",
                "owner_kind",
                "owner_id",
                "role",
                "mime",
                "title",
                "position",
                "blob_id",
                "is_protected",
                "is_deleted",
                "utc_date_modified",
            ],
        )?;
        Ok(Self { conn })
    }
}

impl AttachmentRepository for SqliteAttachmentRepository<'_> {
    fn insert_attachment(&self, attachment: &Attachment) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO attachments (
                attachment_id,
                owner_kind,
                owner_id,
                role,
                mime,
                title,
                position,
                blob_id,
                is_protected,
                is_deleted,
                utc_date_modified
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11);",
            params![
                attachment.attachment_id.as_str(),
                attachment.owner.kind_str(),
                attachment.owner.id(),
                attachment.role.as_str(),
                attachment.mime.as_str(),
                attachment.title.as_str(),
                attachment.position,
                attachment.blob_id.as_str(),
                bool_to_int(attachment.is_protected),
                bool_to_int(attachment.is_deleted),
                attachment.utc_date_modified.as_str(),
            ],
        )?;
        Ok(())
    }

    fn get_attachment(&self, attachment_id: &str) -> RepoResult<Option<Attachment>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ATTACHMENT_SELECT_SQL} WHERE attachment_id = ?1;"))?;
        let mut rows = stmt.query([attachment_id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_attachment_row(row)?));
        }
        Ok(None)
    }

    fn list_for_owner(
        &self,
        owner: &AttachmentOwner,
        include_deleted: bool,
    ) -> RepoResult<Vec<Attachment>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ATTACHMENT_SELECT_SQL}
             WHERE owner_kind = ?1
               AND owner_id = ?2
               AND (?3 = 1 OR is_deleted = 0)
             ORDER BY position ASC, attachment_id ASC;"
        ))?;
        let mut rows = stmt.query(params![
            owner.kind_str(),
            owner.id(),
            bool_to_int(include_deleted)
        ])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_attachment_row(row)?);
        }
        Ok(items)
    }

    fn soft_delete_attachment(&self, attachment_id: &str) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "UPDATE attachments
             SET is_deleted = 1,
                 utc_date_modified = ?2
             WHERE attachment_id = ?1
               AND is_deleted = 0;",
            params![attachment_id, Timestamp::now().utc],
        )?;
        Ok(changed > 0)
    }

    fn soft_delete_for_owner(&self, owner: &AttachmentOwner) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "UPDATE attachments
             SET is_deleted = 1,
                 utc_date_modified = ?3
             WHERE owner_kind = ?1
               AND owner_id = ?2
               AND is_deleted = 0;",
            params![owner.kind_str(), owner.id(), Timestamp::now().utc],
        )?;
        Ok(changed)
    }

    fn delete_for_revisions(&self, revision_ids: &[RevisionId]) -> RepoResult<usize> {
        let mut stmt = self.conn.prepare(
            "DELETE FROM attachments
             WHERE owner_kind = 'revision'
               AND owner_id = ?1;",
        )?;
        let mut deleted = 0;
        for revision_id in revision_ids {
            deleted += stmt.execute([revision_id.as_str()])?;
        }
        Ok(deleted)
    }
}

fn parse_attachment_row(row: &Row<'_>) -> RepoResult<Attachment> {
    let owner_kind: String = row.get("owner_kind")?;
    let owner = AttachmentOwner::from_parts(&owner_kind, row.get("owner_id")?).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid owner kind `{owner_kind}` in attachments.owner_kind"
        ))
    })?;

    Ok(Attachment {
        attachment_id: row.get("attachment_id")?,
        owner,
        role: row.get("role")?,
        mime: row.get("mime")?,
        title: row.get("title")?,
        position: row.get("position")?,
        blob_id: row.get("blob_id")?,
        is_protected: parse_flag(row.get("is_protected")?, "attachments.is_protected")?,
        is_deleted: parse_flag(row.get("is_deleted")?, "attachments.is_deleted")?,
        utc_date_modified: row.get("utc_date_modified")?,
    })
}
