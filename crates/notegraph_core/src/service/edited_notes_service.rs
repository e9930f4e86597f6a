//! "Notes edited on a date" listing.
//!
//! Matching is a string prefix over stored local timestamps, so `2024-03`
//! selects a month and `2024-03-05` a single day.

use crate::model::hoisting::HoistingContext;
use crate::model::note::{Note, NoteId};
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::graph_repo::{begin_read, NoteGraph};
use crate::repo::graph_snapshot::GraphSnapshot;
use crate::repo::note_repo::{NoteRepository, SqliteNoteRepository};
use crate::service::path_service::{retain_hoisted, PathResolver, PROTECTED_TITLE_PLACEHOLDER};
use log::debug;
use rusqlite::Connection;
use serde::Serialize;

/// Upper bound on notes returned by one listing.
pub const EDITED_NOTES_LIMIT: u32 = 50;

/// Edited note plus its best path; `note_path` is `None` for deleted notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditedNote {
    #[serde(flatten)]
    pub note: Note,
    pub note_path: Option<Vec<NoteId>>,
}

pub struct EditedNotesService<'conn> {
    conn: &'conn Connection,
    protected_session: bool,
}

impl<'conn> EditedNotesService<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            protected_session: false,
        }
    }

    pub fn with_protected_session(mut self, unlocked: bool) -> Self {
        self.protected_session = unlocked;
        self
    }

    /// Notes created, modified, or with a revision last edited on `date_prefix`.
    ///
    /// Non-deleted notes come first, most recently modified first. Notes
    /// outside the hoisted subtree are dropped. Protected titles are masked
    /// while the protected session is locked.
    pub fn edited_on_date(
        &self,
        date_prefix: &str,
        hoisting: &HoistingContext,
    ) -> RepoResult<Vec<EditedNote>> {
        let tx = begin_read(self.conn)?;
        let graph = GraphSnapshot::load(self.conn)?;
        let note_ids = SqliteNoteRepository::try_new(self.conn)?
            .note_ids_edited_on(date_prefix, EDITED_NOTES_LIMIT)?;
        if let Some(tx) = tx {
            tx.commit()?;
        }

        let mut notes = Vec::with_capacity(note_ids.len());
        for note_id in note_ids {
            let note = graph
                .note(&note_id)?
                .ok_or_else(|| RepoError::NoteNotFound(note_id.clone()))?;
            notes.push(note);
        }
        let notes = retain_hoisted(&graph, hoisting, notes)?;

        let resolver = PathResolver::new(&graph);
        let mut edited = Vec::with_capacity(notes.len());
        for mut note in notes {
            if note.is_protected && !self.protected_session {
                note.title = PROTECTED_TITLE_PLACEHOLDER.to_string();
            }
            let note_path = if note.is_deleted {
                None
            } else {
                resolver.best_path(&note.note_id)?
            };
            edited.push(EditedNote { note, note_path });
        }

        debug!(
            "event=edited_notes module=service status=ok date_prefix={} hoisted={} count={}",
            date_prefix,
            hoisting.hoisted_note_id,
            edited.len()
        );
        Ok(edited)
    }
}
