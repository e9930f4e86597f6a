//! Minimal note editing use-cases.
//!
//! # Responsibility
//! - Create notes under a parent, replace content, rename, soft-delete and
//!   attach files, each as one atomic write.
//! - Route every payload through the blob store.
//!
//! # Invariants
//! - Titles are trimmed and must not be blank.
//! - Soft-deleting a note also soft-deletes every branch touching it.
//! - Revisions are not taken here; snapshot policy belongs to the caller.

use crate::db::DbError;
use crate::model::attachment::{Attachment, AttachmentOwner};
use crate::model::new_entity_id;
use crate::model::note::{Branch, Note, NoteId, ROOT_NOTE_ID};
use crate::model::timestamp::Timestamp;
use crate::repo::attachment_repo::{AttachmentRepository, SqliteAttachmentRepository};
use crate::repo::blob_repo::{BlobStore, SqliteBlobStore};
use crate::repo::error::RepoError;
use crate::repo::graph_repo::SqliteNoteGraph;
use crate::repo::note_repo::{NoteRepository, SqliteNoteRepository};
use crate::service::graph_service::{link_in, GraphServiceError};
use log::info;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Input for note creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNote {
    pub title: String,
    pub note_type: String,
    pub mime: String,
    pub content: Vec<u8>,
    pub is_protected: bool,
}

impl NewNote {
    /// HTML text note.
    pub fn text(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            note_type: "text".to_string(),
            mime: "text/html".to_string(),
            content: content.into().into_bytes(),
            is_protected: false,
        }
    }
}

/// Input for attaching a file or image to a note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAttachment {
    pub role: String,
    pub mime: String,
    pub title: String,
    pub content: Vec<u8>,
}

/// Service error for note editing.
#[derive(Debug)]
pub enum NoteServiceError {
    /// Title is blank after trim.
    InvalidTitle,
    /// `root` is the anchor of every path and is never deleted.
    RootNotDeletable,
    NoteNotFound(NoteId),
    Graph(GraphServiceError),
    Transaction(DbError),
    Repo(RepoError),
}

impl NoteServiceError {
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NoteNotFound(_) => true,
            Self::Graph(err) => err.is_not_found(),
            Self::Repo(err) => err.is_not_found(),
            _ => false,
        }
    }
}

impl Display for NoteServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTitle => write!(f, "note title must not be blank"),
            Self::RootNotDeletable => write!(f, "root note cannot be deleted"),
            Self::NoteNotFound(id) => write!(f, "note not found: {id}"),
            Self::Graph(err) => write!(f, "{err}"),
            Self::Transaction(err) => write!(f, "transaction failed: {err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for NoteServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Graph(err) => Some(err),
            Self::Transaction(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for NoteServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NoteNotFound(note_id) => Self::NoteNotFound(note_id),
            other => Self::Repo(other),
        }
    }
}

impl From<GraphServiceError> for NoteServiceError {
    fn from(value: GraphServiceError) -> Self {
        Self::Graph(value)
    }
}

/// Note editing facade over one connection.
pub struct NoteService<'conn> {
    conn: &'conn Connection,
}

impl<'conn> NoteService<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Creates a note and links it as last child of `parent_note_id`.
    pub fn create_note(
        &self,
        parent_note_id: &str,
        new_note: NewNote,
    ) -> Result<(Note, Branch), NoteServiceError> {
        let title = normalize_title(&new_note.title)?;
        let tx = self.begin()?;

        let blob_id = SqliteBlobStore::try_new(&tx)?.put(&new_note.content)?;
        let now = Timestamp::now();
        let note = Note {
            note_id: new_entity_id(),
            title,
            note_type: new_note.note_type,
            mime: new_note.mime,
            blob_id,
            is_protected: new_note.is_protected,
            is_deleted: false,
            date_created: now.local.clone(),
            date_modified: now.local,
            utc_date_created: now.utc.clone(),
            utc_date_modified: now.utc,
        };
        SqliteNoteRepository::try_new(&tx)?.insert_note(&note)?;
        let branch = link_in(&tx, parent_note_id, &note.note_id, None, None)?;

        tx.commit().map_err(transaction_error)?;
        info!(
            "event=note_create module=note status=ok note_id={} branch_id={}",
            note.note_id, branch.branch_id
        );
        Ok((note, branch))
    }

    /// Replaces the note content, always bumping its modification date.
    pub fn update_content(&self, note_id: &str, content: &[u8]) -> Result<Note, NoteServiceError> {
        let tx = self.begin()?;
        let blob_id = SqliteBlobStore::try_new(&tx)?.put(content)?;
        let notes = SqliteNoteRepository::try_new(&tx)?;
        notes.set_content(note_id, &blob_id)?;
        let note = load_note(&notes, note_id)?;
        tx.commit().map_err(transaction_error)?;
        Ok(note)
    }

    pub fn rename_note(&self, note_id: &str, title: &str) -> Result<Note, NoteServiceError> {
        let title = normalize_title(title)?;
        let tx = self.begin()?;
        let notes = SqliteNoteRepository::try_new(&tx)?;
        notes.set_title(note_id, &title)?;
        let note = load_note(&notes, note_id)?;
        tx.commit().map_err(transaction_error)?;
        Ok(note)
    }

    /// Soft-deletes the note and every branch touching it.
    pub fn delete_note(&self, note_id: &str) -> Result<(), NoteServiceError> {
        if note_id == ROOT_NOTE_ID {
            return Err(NoteServiceError::RootNotDeletable);
        }
        let tx = self.begin()?;
        SqliteNoteRepository::try_new(&tx)?.soft_delete_note(note_id)?;
        let branches = SqliteNoteGraph::try_new(&tx)?.mark_note_branches_deleted(note_id)?;
        tx.commit().map_err(transaction_error)?;
        info!("event=note_delete module=note status=ok note_id={note_id} branches={branches}");
        Ok(())
    }

    /// Adds an attachment after the note's existing attachments.
    pub fn add_attachment(
        &self,
        note_id: &str,
        new_attachment: NewAttachment,
    ) -> Result<Attachment, NoteServiceError> {
        let tx = self.begin()?;
        let notes = SqliteNoteRepository::try_new(&tx)?;
        let note = load_note(&notes, note_id)?;

        let attachments = SqliteAttachmentRepository::try_new(&tx)?;
        let owner = AttachmentOwner::Note(note.note_id.clone());
        let position = attachments
            .list_for_owner(&owner, false)?
            .last()
            .map_or(0, |last| last.position + 10);
        let attachment = Attachment {
            attachment_id: new_entity_id(),
            owner,
            role: new_attachment.role,
            mime: new_attachment.mime,
            title: new_attachment.title,
            position,
            blob_id: SqliteBlobStore::try_new(&tx)?.put(&new_attachment.content)?,
            is_protected: note.is_protected,
            is_deleted: false,
            utc_date_modified: Timestamp::now().utc,
        };
        attachments.insert_attachment(&attachment)?;
        tx.commit().map_err(transaction_error)?;
        Ok(attachment)
    }

    /// Soft-deletes one attachment; its blob stays until garbage collection.
    pub fn delete_attachment(&self, attachment_id: &str) -> Result<(), NoteServiceError> {
        let deleted = SqliteAttachmentRepository::try_new(self.conn)?
            .soft_delete_attachment(attachment_id)?;
        if !deleted {
            return Err(RepoError::AttachmentNotFound(attachment_id.to_string()).into());
        }
        Ok(())
    }

    /// Loads a note, deleted or not.
    pub fn get_note(&self, note_id: &str) -> Result<Option<Note>, NoteServiceError> {
        Ok(SqliteNoteRepository::try_new(self.conn)?.get_note(note_id, true)?)
    }

    /// Full current content of a note.
    pub fn note_content(&self, note_id: &str) -> Result<Vec<u8>, NoteServiceError> {
        let note = SqliteNoteRepository::try_new(self.conn)?
            .get_note(note_id, true)?
            .ok_or_else(|| NoteServiceError::NoteNotFound(note_id.to_string()))?;
        Ok(SqliteBlobStore::try_new(self.conn)?.get(&note.blob_id)?)
    }

    /// Live (not deleted) attachments of a note.
    pub fn list_attachments(&self, note_id: &str) -> Result<Vec<Attachment>, NoteServiceError> {
        Ok(SqliteAttachmentRepository::try_new(self.conn)?
            .list_for_owner(&AttachmentOwner::Note(note_id.to_string()), false)?)
    }

    fn begin(&self) -> Result<Transaction<'conn>, NoteServiceError> {
        Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)
            .map_err(transaction_error)
    }
}

fn load_note(notes: &SqliteNoteRepository<'_>, note_id: &str) -> Result<Note, NoteServiceError> {
    notes
        .get_note(note_id, false)?
        .ok_or_else(|| NoteServiceError::NoteNotFound(note_id.to_string()))
}

fn normalize_title(value: &str) -> Result<String, NoteServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(NoteServiceError::InvalidTitle);
    }
    Ok(trimmed.to_string())
}

fn transaction_error(err: rusqlite::Error) -> NoteServiceError {
    NoteServiceError::Transaction(DbError::Sqlite(err))
}
