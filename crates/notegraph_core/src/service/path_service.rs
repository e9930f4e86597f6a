//! Best-path resolution over the multi-parent note graph.
//!
//! # Responsibility
//! - Choose one canonical `root -> note` path and render it as a breadcrumb.
//! - Apply hoisting as a filter over caller-provided result sets.
//!
//! # Invariants
//! - Paths are always computed against the true root; hoisting never changes
//!   a path, it only hides results.
//! - Deleted notes, orphans and notes reachable only through deleted branches
//!   have no path.
//! - Choice among several parents is deterministic for an unchanged graph:
//!   fewest hops, then lowest sum of `note_position` along the path, then the
//!   lexicographically smallest sequence of note ids.

use crate::model::hoisting::HoistingContext;
use crate::model::note::{Note, NoteId, ROOT_BRANCH_ID, ROOT_NOTE_ID};
use crate::model::path::{NotePathData, TITLE_SEPARATOR};
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::graph_repo::{NoteGraph, SqliteNoteGraph};
use rusqlite::Connection;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Title shown for protected notes while the protected session is locked.
pub const PROTECTED_TITLE_PLACEHOLDER: &str = "[protected]";

#[derive(Debug, Clone)]
struct Route {
    notes: Vec<NoteId>,
    position_sum: i64,
}

impl Route {
    fn root() -> Self {
        Self {
            notes: vec![ROOT_NOTE_ID.to_string()],
            position_sum: 0,
        }
    }

    fn extended(&self, note_id: &str, note_position: i64) -> Self {
        let mut notes = self.notes.clone();
        notes.push(note_id.to_string());
        Self {
            notes,
            position_sum: self.position_sum.saturating_add(note_position),
        }
    }

    fn rank(&self, other: &Self) -> Ordering {
        self.notes
            .len()
            .cmp(&other.notes.len())
            .then_with(|| self.position_sum.cmp(&other.position_sum))
            .then_with(|| self.notes.cmp(&other.notes))
    }
}

/// Computes best paths through any [`NoteGraph`].
pub struct PathResolver<'g, G: NoteGraph> {
    graph: &'g G,
    protected_session: bool,
}

impl<'g, G: NoteGraph> PathResolver<'g, G> {
    pub fn new(graph: &'g G) -> Self {
        Self {
            graph,
            protected_session: false,
        }
    }

    /// Reveals protected titles in breadcrumbs when the session is unlocked.
    pub fn with_protected_session(mut self, unlocked: bool) -> Self {
        self.protected_session = unlocked;
        self
    }

    /// Best `root -> note` path, or `None` when the note has no visible path.
    pub fn best_path(&self, note_id: &str) -> RepoResult<Option<Vec<NoteId>>> {
        match self.graph.note(note_id)? {
            Some(note) if !note.is_deleted => {}
            _ => return Ok(None),
        }

        let mut memo = HashMap::new();
        let mut visiting = HashSet::new();
        Ok(self
            .best_route(note_id, &mut memo, &mut visiting)?
            .map(|route| route.notes))
    }

    /// Best path plus branch id and breadcrumb title.
    pub fn note_path_data(&self, note_id: &str) -> RepoResult<Option<NotePathData>> {
        let Some(note_path) = self.best_path(note_id)? else {
            return Ok(None);
        };

        let branch_id = match note_path.len() {
            0 | 1 => ROOT_BRANCH_ID.to_string(),
            len => {
                let parent_note_id = &note_path[len - 2];
                self.graph
                    .get_branch(note_id, parent_note_id)?
                    .map(|branch| branch.branch_id)
                    .ok_or_else(|| {
                        RepoError::InvalidData(format!(
                            "missing branch {parent_note_id} -> {note_id} on resolved path"
                        ))
                    })?
            }
        };

        Ok(Some(NotePathData {
            note_id: note_id.to_string(),
            branch_id,
            title: self.title_for_path(&note_path)?,
            path: note_path.join("/"),
            note_path,
        }))
    }

    /// Joins the titles of every note after `root` with `" / "`.
    ///
    /// A path consisting of `root` alone renders as the root title.
    pub fn title_for_path(&self, note_path: &[NoteId]) -> RepoResult<String> {
        if note_path.len() == 1 {
            return self.display_title(&note_path[0], None);
        }

        let mut titles = Vec::with_capacity(note_path.len().saturating_sub(1));
        for pair in note_path.windows(2) {
            let (parent_note_id, note_id) = (&pair[0], &pair[1]);
            let prefix = self
                .graph
                .get_branch(note_id, parent_note_id)?
                .and_then(|branch| branch.prefix);
            titles.push(self.display_title(note_id, prefix.as_deref())?);
        }
        Ok(titles.join(TITLE_SEPARATOR))
    }

    fn display_title(&self, note_id: &str, prefix: Option<&str>) -> RepoResult<String> {
        let note = self
            .graph
            .note(note_id)?
            .ok_or_else(|| RepoError::NoteNotFound(note_id.to_string()))?;
        let title = if note.is_protected && !self.protected_session {
            PROTECTED_TITLE_PLACEHOLDER.to_string()
        } else {
            note.title
        };
        Ok(match prefix.filter(|value| !value.trim().is_empty()) {
            Some(prefix) => format!("{prefix} - {title}"),
            None => title,
        })
    }

    fn best_route(
        &self,
        note_id: &str,
        memo: &mut HashMap<NoteId, Option<Route>>,
        visiting: &mut HashSet<NoteId>,
    ) -> RepoResult<Option<Route>> {
        if self.graph.is_root(note_id) {
            return Ok(Some(Route::root()));
        }
        if let Some(cached) = memo.get(note_id) {
            return Ok(cached.clone());
        }
        // Cycles are rejected at link time; this only stops a walk over corrupt data.
        if !visiting.insert(note_id.to_string()) {
            return Ok(None);
        }

        let mut best: Option<Route> = None;
        for branch in self.graph.parent_branches(note_id)? {
            let Some(parent_route) = self.best_route(&branch.parent_note_id, memo, visiting)?
            else {
                continue;
            };
            let candidate = parent_route.extended(note_id, branch.note_position);
            let replace = best
                .as_ref()
                .map_or(true, |current| candidate.rank(current) == Ordering::Less);
            if replace {
                best = Some(candidate);
            }
        }

        visiting.remove(note_id);
        memo.insert(note_id.to_string(), best.clone());
        Ok(best)
    }
}

/// Path lookups against the live database, each pinned to one read.
pub struct NotePathService<'conn> {
    conn: &'conn Connection,
    protected_session: bool,
}

impl<'conn> NotePathService<'conn> {
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

    pub fn best_path(&self, note_id: &str) -> RepoResult<Option<Vec<NoteId>>> {
        SqliteNoteGraph::read_consistent(self.conn, |graph| {
            PathResolver::new(graph).best_path(note_id)
        })
    }

    pub fn note_path_data(&self, note_id: &str) -> RepoResult<Option<NotePathData>> {
        let unlocked = self.protected_session;
        SqliteNoteGraph::read_consistent(self.conn, |graph| {
            PathResolver::new(graph)
                .with_protected_session(unlocked)
                .note_path_data(note_id)
        })
    }
}

/// Keeps only notes inside the hoisted subtree (the hoisted note included).
pub fn retain_hoisted<G: NoteGraph>(
    graph: &G,
    hoisting: &HoistingContext,
    notes: Vec<Note>,
) -> RepoResult<Vec<Note>> {
    if !hoisting.is_scoped() {
        return Ok(notes);
    }

    let mut visible = Vec::with_capacity(notes.len());
    for note in notes {
        if graph.has_ancestor(&note.note_id, &hoisting.hoisted_note_id)? {
            visible.push(note);
        }
    }
    Ok(visible)
}
