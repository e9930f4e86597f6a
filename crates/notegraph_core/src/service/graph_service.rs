//! Note graph mutation service.
//!
//! # Responsibility
//! - Link and unlink notes under parents inside one immediate transaction.
//! - Reject edges that would break the DAG before they reach storage.
//!
//! # Invariants
//! - `root` never gains a parent.
//! - A parent may not become a child of one of its own descendants.
//! - One active edge per `(parent, child)` pair; relinking revives a
//!   soft-deleted edge instead of inserting a duplicate.

use crate::db::DbError;
use crate::model::note::{branch_id_for, Branch, BranchId, NoteId, ROOT_NOTE_ID};
use crate::model::timestamp::Timestamp;
use crate::repo::error::RepoError;
use crate::repo::graph_repo::{NoteGraph, SqliteNoteGraph};
use log::{info, warn};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from graph mutations.
#[derive(Debug)]
pub enum GraphServiceError {
    /// Child note does not exist or is deleted.
    NoteNotFound(NoteId),
    /// Parent note does not exist or is deleted.
    ParentNotFound(NoteId),
    /// No active edge between the given notes.
    BranchNotFound {
        note_id: NoteId,
        parent_note_id: NoteId,
    },
    /// `root` cannot be placed under another note.
    RootCannotBeLinked,
    /// The edge would close a cycle.
    CycleDetected {
        note_id: NoteId,
        parent_note_id: NoteId,
    },
    /// The edge already exists and is active.
    BranchAlreadyExists(BranchId),
    /// Begin or commit of the transaction failed.
    Transaction(DbError),
    Repo(RepoError),
}

impl GraphServiceError {
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NoteNotFound(_) | Self::ParentNotFound(_) | Self::BranchNotFound { .. } => true,
            Self::Repo(err) => err.is_not_found(),
            _ => false,
        }
    }

    /// True for acyclicity and uniqueness violations.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::RootCannotBeLinked | Self::CycleDetected { .. } | Self::BranchAlreadyExists(_)
        )
    }
}

impl Display for GraphServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoteNotFound(id) => write!(f, "note not found: {id}"),
            Self::ParentNotFound(id) => write!(f, "parent note not found: {id}"),
            Self::BranchNotFound {
                note_id,
                parent_note_id,
            } => write!(f, "branch not found: {parent_note_id} -> {note_id}"),
            Self::RootCannotBeLinked => write!(f, "root note cannot have a parent"),
            Self::CycleDetected {
                note_id,
                parent_note_id,
            } => write!(
                f,
                "link would create cycle: note {note_id} under parent {parent_note_id}"
            ),
            Self::BranchAlreadyExists(id) => write!(f, "branch already exists: {id}"),
            Self::Transaction(err) => write!(f, "transaction failed: {err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for GraphServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Transaction(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for GraphServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Graph mutation facade over one connection.
pub struct GraphService<'conn> {
    conn: &'conn Connection,
}

impl<'conn> GraphService<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Places `note_id` under `parent_note_id`.
    ///
    /// `note_position` defaults to after the last active sibling.
    pub fn link(
        &self,
        parent_note_id: &str,
        note_id: &str,
        note_position: Option<i64>,
        prefix: Option<&str>,
    ) -> Result<Branch, GraphServiceError> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)
            .map_err(transaction_error)?;
        let branch = match link_in(&tx, parent_note_id, note_id, note_position, prefix) {
            Ok(branch) => branch,
            Err(err) => {
                warn!(
                    "event=note_link module=graph status=error note_id={note_id} parent_note_id={parent_note_id} error={err}"
                );
                return Err(err);
            }
        };
        tx.commit().map_err(transaction_error)?;

        info!(
            "event=note_link module=graph status=ok branch_id={} position={}",
            branch.branch_id, branch.note_position
        );
        Ok(branch)
    }

    /// Soft-deletes the edge placing `note_id` under `parent_note_id`.
    pub fn unlink(&self, parent_note_id: &str, note_id: &str) -> Result<(), GraphServiceError> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)
            .map_err(transaction_error)?;
        let graph = SqliteNoteGraph::try_new(&tx)?;
        let branch = graph.get_branch(note_id, parent_note_id)?.ok_or_else(|| {
            GraphServiceError::BranchNotFound {
                note_id: note_id.to_string(),
                parent_note_id: parent_note_id.to_string(),
            }
        })?;
        graph.mark_branch_deleted(&branch.branch_id)?;
        tx.commit().map_err(transaction_error)?;

        info!(
            "event=note_unlink module=graph status=ok branch_id={}",
            branch.branch_id
        );
        Ok(())
    }
}

/// Link step usable inside an outer transaction.
pub(crate) fn link_in(
    conn: &Connection,
    parent_note_id: &str,
    note_id: &str,
    note_position: Option<i64>,
    prefix: Option<&str>,
) -> Result<Branch, GraphServiceError> {
    if note_id == ROOT_NOTE_ID {
        return Err(GraphServiceError::RootCannotBeLinked);
    }

    let graph = SqliteNoteGraph::try_new(conn)?;
    graph
        .note(note_id)?
        .filter(|note| !note.is_deleted)
        .ok_or_else(|| GraphServiceError::NoteNotFound(note_id.to_string()))?;
    graph
        .note(parent_note_id)?
        .filter(|note| !note.is_deleted)
        .ok_or_else(|| GraphServiceError::ParentNotFound(parent_note_id.to_string()))?;

    if parent_note_id == note_id || graph.has_ancestor(parent_note_id, note_id)? {
        return Err(GraphServiceError::CycleDetected {
            note_id: note_id.to_string(),
            parent_note_id: parent_note_id.to_string(),
        });
    }

    let note_position = match note_position {
        Some(value) => value,
        None => graph.next_note_position(parent_note_id)?,
    };
    let prefix = prefix
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string);

    match graph.find_branch(note_id, parent_note_id)? {
        Some(existing) if !existing.is_deleted => {
            Err(GraphServiceError::BranchAlreadyExists(existing.branch_id))
        }
        Some(existing) => {
            graph.reactivate_branch(&existing.branch_id, note_position, prefix.as_deref())?;
            graph
                .get_branch(note_id, parent_note_id)?
                .ok_or_else(|| GraphServiceError::BranchNotFound {
                    note_id: note_id.to_string(),
                    parent_note_id: parent_note_id.to_string(),
                })
        }
        None => {
            let branch = Branch {
                branch_id: branch_id_for(parent_note_id, note_id),
                note_id: note_id.to_string(),
                parent_note_id: parent_note_id.to_string(),
                note_position,
                prefix,
                is_deleted: false,
                utc_date_modified: Timestamp::now().utc,
            };
            graph.insert_branch(&branch)?;
            Ok(branch)
        }
    }
}

fn transaction_error(err: rusqlite::Error) -> GraphServiceError {
    GraphServiceError::Transaction(DbError::Sqlite(err))
}
