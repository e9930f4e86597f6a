//! In-memory arena of notes and branches.
//!
//! A snapshot is loaded inside one read transaction, so batch path resolution
//! over it observes either the state before or after any concurrent write,
//! never a mix.

use super::error::RepoResult;
use super::graph_repo::{begin_read, parse_branch_row, NoteGraph, BRANCH_SELECT_SQL};
use super::note_repo::{parse_note_row, NOTE_SELECT_SQL};
use crate::model::note::{Branch, Note, NoteId};
use log::debug;
use rusqlite::Connection;
use std::collections::HashMap;
use std::time::Instant;

/// Arena of notes indexed by id plus their active incoming edges.
#[derive(Debug, Clone, Default)]
pub struct GraphSnapshot {
    notes: HashMap<NoteId, Note>,
    parent_branches: HashMap<NoteId, Vec<Branch>>,
}

impl GraphSnapshot {
    /// Loads all notes and active branches in one consistent read.
    pub fn load(conn: &Connection) -> RepoResult<Self> {
        let started_at = Instant::now();
        let tx = begin_read(conn)?;

        let mut notes = Vec::new();
        {
            let mut stmt = conn.prepare(NOTE_SELECT_SQL)?;
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                notes.push(parse_note_row(row)?);
            }
        }

        let mut branches = Vec::new();
        {
            let mut stmt = conn.prepare(&format!("{BRANCH_SELECT_SQL} WHERE b.is_deleted = 0"))?;
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                branches.push(parse_branch_row(row)?);
            }
        }

        if let Some(tx) = tx {
            tx.commit()?;
        }

        let snapshot = Self::from_parts(notes, branches);
        debug!(
            "event=graph_snapshot module=repo status=ok notes={} duration_ms={}",
            snapshot.notes.len(),
            started_at.elapsed().as_millis()
        );
        Ok(snapshot)
    }

    /// Builds an arena from records. Deleted branches and branches whose parent
    /// is deleted or unknown are not edges and are dropped.
    pub fn from_parts(notes: Vec<Note>, branches: Vec<Branch>) -> Self {
        let notes: HashMap<NoteId, Note> = notes
            .into_iter()
            .map(|note| (note.note_id.clone(), note))
            .collect();

        let mut parent_branches: HashMap<NoteId, Vec<Branch>> = HashMap::new();
        for branch in branches {
            let parent_active = notes
                .get(&branch.parent_note_id)
                .is_some_and(|parent| !parent.is_deleted);
            if branch.is_deleted || !parent_active {
                continue;
            }
            parent_branches
                .entry(branch.note_id.clone())
                .or_default()
                .push(branch);
        }
        for edges in parent_branches.values_mut() {
            edges.sort_by(|left, right| {
                left.note_position
                    .cmp(&right.note_position)
                    .then_with(|| left.parent_note_id.cmp(&right.parent_note_id))
            });
        }

        Self {
            notes,
            parent_branches,
        }
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

impl NoteGraph for GraphSnapshot {
    fn note(&self, note_id: &str) -> RepoResult<Option<Note>> {
        Ok(self.notes.get(note_id).cloned())
    }

    fn get_branch(&self, note_id: &str, parent_note_id: &str) -> RepoResult<Option<Branch>> {
        Ok(self.parent_branches.get(note_id).and_then(|edges| {
            edges
                .iter()
                .find(|branch| branch.parent_note_id == parent_note_id)
                .cloned()
        }))
    }

    fn parent_branches(&self, note_id: &str) -> RepoResult<Vec<Branch>> {
        Ok(self
            .parent_branches
            .get(note_id)
            .cloned()
            .unwrap_or_default())
    }
}
