//! Note graph contract and SQLite implementation.
//!
//! # Responsibility
//! - Expose the read side of the multi-parent note DAG (`parents_of`,
//!   `get_branch`, `ancestors_of`).
//! - Provide the raw branch writes used by the graph service, which owns the
//!   acyclicity check and the transaction boundary.
//!
//! # Invariants
//! - Only active branches whose parent note is not deleted count as edges.
//! - Parent order is deterministic: `note_position ASC, parent_note_id ASC`.

use super::error::{RepoError, RepoResult};
use super::note_repo::{parse_note_row, NOTE_SELECT_SQL};
use super::schema::{bool_to_int, ensure_connection_ready, parse_flag};
use crate::model::note::{Branch, Note, NoteId, ROOT_NOTE_ID};
use crate::model::timestamp::Timestamp;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::collections::{HashSet, VecDeque};

pub(crate) const BRANCH_SELECT_SQL: &str = "SELECT
    b.branch_id AS branch_id,
    b.note_id AS note_id,
    b.parent_note_id AS parent_note_id,
    b.note_position AS note_position,
    b.prefix AS prefix,
    b.is_deleted AS is_deleted,
    b.utc_date_modified AS utc_date_modified
FROM branches b";

/// Read contract over the note DAG.
pub trait NoteGraph {
    /// Loads a note whether or not it is deleted.
    fn note(&self, note_id: &str) -> RepoResult<Option<Note>>;

    /// Exact lookup of the active edge attaching `note_id` under `parent_note_id`.
    fn get_branch(&self, note_id: &str, parent_note_id: &str) -> RepoResult<Option<Branch>>;

    /// Active incoming edges of `note_id` from non-deleted parents, in parent order.
    fn parent_branches(&self, note_id: &str) -> RepoResult<Vec<Branch>>;

    /// Current parent notes; empty for `root` and for orphans.
    fn parents_of(&self, note_id: &str) -> RepoResult<Vec<Note>> {
        let mut parents = Vec::new();
        for branch in self.parent_branches(note_id)? {
            let parent = self
                .note(&branch.parent_note_id)?
                .ok_or_else(|| RepoError::NoteNotFound(branch.parent_note_id.clone()))?;
            parents.push(parent);
        }
        Ok(parents)
    }

    fn is_root(&self, note_id: &str) -> bool {
        note_id == ROOT_NOTE_ID
    }

    /// Every note reachable by following parents transitively, excluding `note_id`.
    fn ancestors_of(&self, note_id: &str) -> RepoResult<HashSet<NoteId>> {
        let mut ancestors = HashSet::new();
        let mut queue = VecDeque::from([note_id.to_string()]);
        while let Some(current) = queue.pop_front() {
            for branch in self.parent_branches(&current)? {
                if branch.parent_note_id != note_id
                    && ancestors.insert(branch.parent_note_id.clone())
                {
                    queue.push_back(branch.parent_note_id);
                }
            }
        }
        Ok(ancestors)
    }

    /// True when `ancestor_id` is `note_id` itself or one of its ancestors.
    fn has_ancestor(&self, note_id: &str, ancestor_id: &str) -> RepoResult<bool> {
        if note_id == ancestor_id {
            return Ok(true);
        }
        Ok(self.ancestors_of(note_id)?.contains(ancestor_id))
    }
}

/// Opens a deferred read transaction, or `None` when `conn` is already inside one.
pub(crate) fn begin_read(conn: &Connection) -> rusqlite::Result<Option<Transaction<'_>>> {
    if conn.is_autocommit() {
        conn.unchecked_transaction().map(Some)
    } else {
        Ok(None)
    }
}

/// SQLite-backed note graph.
///
/// Each call is one statement. Multi-step walks that must not observe a
/// concurrent commit go through [`SqliteNoteGraph::read_consistent`].
pub struct SqliteNoteGraph<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNoteGraph<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(
            conn,
            "branches",
            &[
                "branch_id",
                "note_id",
                "parent_note_id",
                "note_position",
                "prefix",
                "is_deleted",
                "utc_date_modified",
            ],
        )?;
        Ok(Self { conn })
    }

    /// Runs `read` over a graph view pinned to one read transaction, so every
    /// lookup sees the same committed state.
    pub fn read_consistent<T>(
        conn: &'conn Connection,
        read: impl FnOnce(&SqliteNoteGraph<'conn>) -> RepoResult<T>,
    ) -> RepoResult<T> {
        let tx = begin_read(conn)?;
        let graph = Self::try_new(conn)?;
        let value = read(&graph)?;
        if let Some(tx) = tx {
            tx.commit()?;
        }
        Ok(value)
    }

    /// Loads an edge by endpoints, including soft-deleted ones.
    pub fn find_branch(&self, note_id: &str, parent_note_id: &str) -> RepoResult<Option<Branch>> {
        let mut stmt = self.conn.prepare(&format!(
            "{BRANCH_SELECT_SQL}
             WHERE b.note_id = ?1
               AND b.parent_note_id = ?2;"
        ))?;
        let mut rows = stmt.query([note_id, parent_note_id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_branch_row(row)?));
        }
        Ok(None)
    }

    pub fn insert_branch(&self, branch: &Branch) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO branches (
                branch_id,
                note_id,
                parent_note_id,
                note_position,
                prefix,
                is_deleted,
                utc_date_modified
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                branch.branch_id.as_str(),
                branch.note_id.as_str(),
                branch.parent_note_id.as_str(),
                branch.note_position,
                branch.prefix.as_deref(),
                bool_to_int(branch.is_deleted),
                branch.utc_date_modified.as_str(),
            ],
        )?;
        Ok(())
    }

    /// Revives a soft-deleted edge with new ordering data.
    pub fn reactivate_branch(
        &self,
        branch_id: &str,
        note_position: i64,
        prefix: Option<&str>,
    ) -> RepoResult<()> {
        self.conn.execute(
            "UPDATE branches
             SET is_deleted = 0,
                 note_position = ?2,
                 prefix = ?3,
                 utc_date_modified = ?4
             WHERE branch_id = ?1;",
            params![branch_id, note_position, prefix, Timestamp::now().utc],
        )?;
        Ok(())
    }

    /// Soft-deletes one edge. Returns whether an active edge was changed.
    pub fn mark_branch_deleted(&self, branch_id: &str) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "UPDATE branches
             SET is_deleted = 1,
                 utc_date_modified = ?2
             WHERE branch_id = ?1
               AND is_deleted = 0;",
            params![branch_id, Timestamp::now().utc],
        )?;
        Ok(changed > 0)
    }

    /// Soft-deletes every incoming and outgoing edge of `note_id`.
    pub fn mark_note_branches_deleted(&self, note_id: &str) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "UPDATE branches
             SET is_deleted = 1,
                 utc_date_modified = ?2
             WHERE (note_id = ?1 OR parent_note_id = ?1)
               AND is_deleted = 0;",
            params![note_id, Timestamp::now().utc],
        )?;
        Ok(changed)
    }

    /// Position placing a new child after every active child of `parent_note_id`.
    pub fn next_note_position(&self, parent_note_id: &str) -> RepoResult<i64> {
        let next = self.conn.query_row(
            "SELECT COALESCE(MAX(note_position), -1) + 1
             FROM branches
             WHERE parent_note_id = ?1
               AND is_deleted = 0;",
            [parent_note_id],
            |row| row.get(0),
        )?;
        Ok(next)
    }

    /// Active children of `parent_note_id`, in sibling order.
    pub fn child_branches(&self, parent_note_id: &str) -> RepoResult<Vec<Branch>> {
        let mut stmt = self.conn.prepare(&format!(
            "{BRANCH_SELECT_SQL}
             INNER JOIN notes n ON n.note_id = b.note_id
             WHERE b.parent_note_id = ?1
               AND b.is_deleted = 0
               AND n.is_deleted = 0
             ORDER BY b.note_position ASC, b.note_id ASC;"
        ))?;
        let rows = stmt.query([parent_note_id])?;
        collect_branches(rows)
    }
}

impl NoteGraph for SqliteNoteGraph<'_> {
    fn note(&self, note_id: &str) -> RepoResult<Option<Note>> {
        self.conn
            .query_row(
                &format!("{NOTE_SELECT_SQL} WHERE note_id = ?1;"),
                [note_id],
                |row| Ok(parse_note_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn get_branch(&self, note_id: &str, parent_note_id: &str) -> RepoResult<Option<Branch>> {
        Ok(self
            .find_branch(note_id, parent_note_id)?
            .filter(|branch| !branch.is_deleted))
    }

    fn parent_branches(&self, note_id: &str) -> RepoResult<Vec<Branch>> {
        let mut stmt = self.conn.prepare(&format!(
            "{BRANCH_SELECT_SQL}
             INNER JOIN notes p ON p.note_id = b.parent_note_id
             WHERE b.note_id = ?1
               AND b.is_deleted = 0
               AND p.is_deleted = 0
             ORDER BY b.note_position ASC, b.parent_note_id ASC;"
        ))?;
        let rows = stmt.query([note_id])?;
        collect_branches(rows)
    }
}

fn collect_branches(mut rows: rusqlite::Rows<'_>) -> RepoResult<Vec<Branch>> {
    let mut branches = Vec::new();
    while let Some(row) = rows.next()? {
        branches.push(parse_branch_row(row)?);
    }
    Ok(branches)
}

pub(crate) fn parse_branch_row(row: &Row<'_>) -> RepoResult<Branch> {
    Ok(Branch {
        branch_id: row.get("branch_id")?,
        note_id: row.get("note_id")?,
        parent_note_id: row.get("parent_note_id")?,
        note_position: row.get("note_position")?,
        prefix: row.get("prefix")?,
        is_deleted: parse_flag(row.get("is_deleted")?, "branches.is_deleted")?,
        utc_date_modified: row.get("utc_date_modified")?,
    })
}
