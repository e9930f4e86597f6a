//! Revision snapshot, restore and erase use-cases.
//!
//! # Responsibility
//! - Snapshot a note (title, type, mime, content reference, live attachments)
//!   into an immutable revision.
//! - Restore a note to a revision as one atomic rewrite.
//! - List, read and permanently erase revisions.
//!
//! # Invariants
//! - Snapshots copy blob references, never payloads. Revision content links
//!   point at the revision's own attachment copies.
//! - Restore first snapshots the current state, so nothing is lost.
//! - After restore the note's live attachments mirror the revision's, and no
//!   `attachments/<id>` link in the content points at a pre-restore id.
//! - Every multi-row write runs in one immediate transaction; any error drops
//!   the transaction, which rolls back all steps.

use crate::db::DbError;
use crate::model::attachment::{Attachment, AttachmentOwner};
use crate::model::blob::{BlobId, BlobView};
use crate::model::content::rewrite_attachment_references_in_bytes;
use crate::model::new_entity_id;
use crate::model::note::{Note, NoteId};
use crate::model::revision::{NoteRevision, RevisionId, RevisionListItem};
use crate::model::timestamp::Timestamp;
use crate::repo::attachment_repo::{AttachmentRepository, SqliteAttachmentRepository};
use crate::repo::blob_repo::{BlobStore, SqliteBlobStore};
use crate::repo::error::RepoError;
use crate::repo::note_repo::{NoteRepository, SqliteNoteRepository};
use crate::repo::revision_repo::{RevisionRepository, SqliteRevisionRepository};
use log::{error, info};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Errors from revision use-cases.
#[derive(Debug)]
pub enum RevisionServiceError {
    NoteNotFound(NoteId),
    RevisionNotFound(RevisionId),
    BlobNotFound(BlobId),
    /// Content is protected and the protected session is locked.
    ContentUnavailable(String),
    /// Begin or commit of the transaction failed; nothing was applied.
    Transaction(DbError),
    Repo(RepoError),
}

impl RevisionServiceError {
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NoteNotFound(_) | Self::RevisionNotFound(_) | Self::BlobNotFound(_) => true,
            Self::Repo(err) => err.is_not_found(),
            _ => false,
        }
    }
}

impl Display for RevisionServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoteNotFound(id) => write!(f, "note not found: {id}"),
            Self::RevisionNotFound(id) => write!(f, "note revision not found: {id}"),
            Self::BlobNotFound(id) => write!(f, "blob not found: {id}"),
            Self::ContentUnavailable(id) => {
                write!(f, "content of {id} is not available: protected session is locked")
            }
            Self::Transaction(err) => write!(f, "transaction failed: {err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RevisionServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Transaction(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for RevisionServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NoteNotFound(id) => Self::NoteNotFound(id),
            RepoError::RevisionNotFound(id) => Self::RevisionNotFound(id),
            RepoError::BlobNotFound(id) => Self::BlobNotFound(id),
            other => Self::Repo(other),
        }
    }
}

type RevisionResult<T> = Result<T, RevisionServiceError>;

/// Revision manager over one connection.
pub struct RevisionService<'conn> {
    conn: &'conn Connection,
    protected_session: bool,
}

impl<'conn> RevisionService<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            protected_session: false,
        }
    }

    /// Allows reading and restoring protected content.
    pub fn with_protected_session(mut self, unlocked: bool) -> Self {
        self.protected_session = unlocked;
        self
    }

    /// Snapshots the current state of a note and its live attachments.
    pub fn create_revision(&self, note_id: &str) -> RevisionResult<NoteRevision> {
        let tx = self.begin()?;
        let revision = snapshot_note(&tx, note_id)?;
        tx.commit().map_err(transaction_error)?;

        info!(
            "event=revision_create module=revision status=ok note_id={} revision_id={}",
            note_id, revision.revision_id
        );
        Ok(revision)
    }

    /// Restores the owning note of `revision_id` to that revision.
    ///
    /// Returns the note as left by the restore.
    pub fn restore_revision(&self, revision_id: &str) -> RevisionResult<Note> {
        let started_at = Instant::now();
        let tx = self.begin()?;
        let restored = match self.restore_in(&tx, revision_id) {
            Ok(restored) => restored,
            Err(err) => {
                error!(
                    "event=revision_restore module=revision status=error revision_id={} duration_ms={} error={}",
                    revision_id,
                    started_at.elapsed().as_millis(),
                    err
                );
                return Err(err);
            }
        };
        tx.commit().map_err(transaction_error)?;

        info!(
            "event=revision_restore module=revision status=ok revision_id={} note_id={} attachments={} duration_ms={}",
            revision_id,
            restored.note.note_id,
            restored.attachment_count,
            started_at.elapsed().as_millis()
        );
        Ok(restored.note)
    }

    /// Permanently deletes revisions and the attachments they own.
    ///
    /// Fails without deleting anything when one id is unknown.
    pub fn erase_revisions(&self, revision_ids: &[RevisionId]) -> RevisionResult<usize> {
        if revision_ids.is_empty() {
            return Ok(0);
        }
        let tx = self.begin()?;
        let revisions = SqliteRevisionRepository::try_new(&tx)?;
        for revision_id in revision_ids {
            if revisions.get_revision(revision_id)?.is_none() {
                return Err(RevisionServiceError::RevisionNotFound(revision_id.clone()));
            }
        }
        let erased = erase_in(&tx, revision_ids)?;
        tx.commit().map_err(transaction_error)?;

        info!("event=revision_erase module=revision status=ok erased={erased}");
        Ok(erased)
    }

    /// Permanently deletes every revision of a note.
    pub fn erase_all_revisions(&self, note_id: &str) -> RevisionResult<usize> {
        let tx = self.begin()?;
        SqliteNoteRepository::try_new(&tx)?
            .get_note(note_id, true)?
            .ok_or_else(|| RevisionServiceError::NoteNotFound(note_id.to_string()))?;
        let revision_ids = SqliteRevisionRepository::try_new(&tx)?.revision_ids_for_note(note_id)?;
        let erased = erase_in(&tx, &revision_ids)?;
        tx.commit().map_err(transaction_error)?;

        info!("event=revision_erase_all module=revision status=ok note_id={note_id} erased={erased}");
        Ok(erased)
    }

    /// Revisions of a note, newest first, each with its content length.
    pub fn list_revisions(&self, note_id: &str) -> RevisionResult<Vec<RevisionListItem>> {
        SqliteNoteRepository::try_new(self.conn)?
            .get_note(note_id, true)?
            .ok_or_else(|| RevisionServiceError::NoteNotFound(note_id.to_string()))?;
        Ok(SqliteRevisionRepository::try_new(self.conn)?.list_revisions(note_id)?)
    }

    pub fn get_revision(&self, revision_id: &str) -> RevisionResult<NoteRevision> {
        SqliteRevisionRepository::try_new(self.conn)?
            .get_revision(revision_id)?
            .ok_or_else(|| RevisionServiceError::RevisionNotFound(revision_id.to_string()))
    }

    /// Revision content; `preview` bounds the read to a prefix.
    pub fn get_revision_content(
        &self,
        revision_id: &str,
        preview: bool,
    ) -> RevisionResult<BlobView> {
        let revision = self.get_revision(revision_id)?;
        self.ensure_content_available(revision.is_protected, revision_id)?;
        Ok(SqliteBlobStore::try_new(self.conn)?.view(&revision.blob_id, preview)?)
    }

    /// Attachments snapshotted with a revision.
    pub fn list_revision_attachments(&self, revision_id: &str) -> RevisionResult<Vec<Attachment>> {
        let revision = self.get_revision(revision_id)?;
        Ok(SqliteAttachmentRepository::try_new(self.conn)?
            .list_for_owner(&AttachmentOwner::Revision(revision.revision_id), false)?)
    }

    fn restore_in(&self, tx: &Connection, revision_id: &str) -> RevisionResult<RestoredNote> {
        let revisions = SqliteRevisionRepository::try_new(tx)?;
        let revision = revisions
            .get_revision(revision_id)?
            .ok_or_else(|| RevisionServiceError::RevisionNotFound(revision_id.to_string()))?;
        self.ensure_content_available(revision.is_protected, revision_id)?;

        let notes = SqliteNoteRepository::try_new(tx)?;
        let note = notes
            .get_note(&revision.note_id, false)?
            .ok_or_else(|| RevisionServiceError::NoteNotFound(revision.note_id.clone()))?;
        self.ensure_content_available(note.is_protected, &note.note_id)?;

        snapshot_note(tx, &note.note_id)?;

        let attachments = SqliteAttachmentRepository::try_new(tx)?;
        let note_owner = AttachmentOwner::Note(note.note_id.clone());
        attachments.soft_delete_for_owner(&note_owner)?;

        let blobs = SqliteBlobStore::try_new(tx)?;
        let now = Timestamp::now();
        let mut mapping = Vec::new();
        for source in attachments
            .list_for_owner(&AttachmentOwner::Revision(revision.revision_id.clone()), false)?
        {
            let bytes = blobs.get(&source.blob_id)?;
            let mut restored = source.copy_to(note_owner.clone(), &now.utc);
            restored.blob_id = blobs.put(&bytes)?;
            attachments.insert_attachment(&restored)?;
            mapping.push((source.attachment_id, restored.attachment_id));
        }

        let content = rewrite_attachment_references_in_bytes(blobs.get(&revision.blob_id)?, &mapping);
        notes.set_title(&note.note_id, &revision.title)?;
        notes.set_content(&note.note_id, &blobs.put(&content)?)?;

        let note = notes
            .get_note(&note.note_id, false)?
            .ok_or_else(|| RevisionServiceError::NoteNotFound(note.note_id.clone()))?;
        Ok(RestoredNote {
            note,
            attachment_count: mapping.len(),
        })
    }

    fn ensure_content_available(&self, is_protected: bool, entity_id: &str) -> RevisionResult<()> {
        if is_protected && !self.protected_session {
            return Err(RevisionServiceError::ContentUnavailable(
                entity_id.to_string(),
            ));
        }
        Ok(())
    }

    fn begin(&self) -> RevisionResult<Transaction<'conn>> {
        Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)
            .map_err(transaction_error)
    }
}

struct RestoredNote {
    note: Note,
    attachment_count: usize,
}

/// Snapshot step usable inside an outer transaction.
///
/// Attachment copies keep their blob. When the note has live attachments,
/// content links are repointed at the revision-owned copies, which stores a
/// rewritten payload; otherwise the note's content blob is shared as is.
fn snapshot_note(conn: &Connection, note_id: &str) -> RevisionResult<NoteRevision> {
    let note = SqliteNoteRepository::try_new(conn)?
        .get_note(note_id, false)?
        .ok_or_else(|| RevisionServiceError::NoteNotFound(note_id.to_string()))?;

    let now = Timestamp::now();
    let revision_id = new_entity_id();
    let attachments = SqliteAttachmentRepository::try_new(conn)?;
    let revision_owner = AttachmentOwner::Revision(revision_id.clone());
    let copies: Vec<(Attachment, Attachment)> = attachments
        .list_for_owner(&AttachmentOwner::Note(note.note_id.clone()), false)?
        .into_iter()
        .map(|source| {
            let copy = source.copy_to(revision_owner.clone(), &now.utc);
            (source, copy)
        })
        .collect();

    let blob_id = if copies.is_empty() {
        note.blob_id
    } else {
        let mapping: Vec<(String, String)> = copies
            .iter()
            .map(|(source, copy)| (source.attachment_id.clone(), copy.attachment_id.clone()))
            .collect();
        let blobs = SqliteBlobStore::try_new(conn)?;
        let content = rewrite_attachment_references_in_bytes(blobs.get(&note.blob_id)?, &mapping);
        blobs.put(&content)?
    };

    let revision = NoteRevision {
        revision_id,
        note_id: note.note_id,
        note_type: note.note_type,
        mime: note.mime,
        title: note.title,
        is_protected: note.is_protected,
        blob_id,
        date_last_edited: note.date_modified,
        date_created: now.local,
        utc_date_last_edited: note.utc_date_modified,
        utc_date_created: now.utc.clone(),
        utc_date_modified: now.utc,
    };
    SqliteRevisionRepository::try_new(conn)?.insert_revision(&revision)?;
    for (_, copy) in &copies {
        attachments.insert_attachment(copy)?;
    }

    Ok(revision)
}

fn erase_in(conn: &Connection, revision_ids: &[RevisionId]) -> RevisionResult<usize> {
    let unique: Vec<RevisionId> = revision_ids
        .iter()
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    SqliteAttachmentRepository::try_new(conn)?.delete_for_revisions(&unique)?;
    Ok(SqliteRevisionRepository::try_new(conn)?.delete_revisions(&unique)?)
}

fn transaction_error(err: rusqlite::Error) -> RevisionServiceError {
    RevisionServiceError::Transaction(DbError::Sqlite(err))
}
