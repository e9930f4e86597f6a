//! Note and branch records of the multi-parent note graph.
//!
//! # Invariants
//! - `root` has no parent branch and can never be linked under another note.
//! - A branch id is derived from its endpoints, so one parent holds a child at
//!   most once.

use super::blob::BlobId;
use serde::Serialize;

pub type NoteId = String;
pub type BranchId = String;

/// Id of the hierarchy root.
pub const ROOT_NOTE_ID: &str = "root";
/// Branch id reported for the root note, which has no incoming edge.
pub const ROOT_BRANCH_ID: &str = "none_root";

/// Derives the branch id for a `parent -> child` edge.
pub fn branch_id_for(parent_note_id: &str, note_id: &str) -> BranchId {
    format!("{parent_note_id}_{note_id}")
}

/// Mutable versioned document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub note_id: NoteId,
    pub title: String,
    /// Serialized as `type` to match external naming.
    #[serde(rename = "type")]
    pub note_type: String,
    pub mime: String,
    /// Current content reference.
    pub blob_id: BlobId,
    pub is_protected: bool,
    pub is_deleted: bool,
    pub date_created: String,
    pub date_modified: String,
    pub utc_date_created: String,
    pub utc_date_modified: String,
}

impl Note {
    pub fn is_root(&self) -> bool {
        self.note_id == ROOT_NOTE_ID
    }
}

/// Ordered `parent -> child` edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    pub branch_id: BranchId,
    pub note_id: NoteId,
    pub parent_note_id: NoteId,
    /// Ordering key among the children of `parent_note_id`.
    pub note_position: i64,
    /// Optional label shown before the child title in breadcrumbs.
    pub prefix: Option<String>,
    pub is_deleted: bool,
    pub utc_date_modified: String,
}
