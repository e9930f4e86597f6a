//! Resolved display path of a note.

use super::note::{BranchId, NoteId};
use serde::Serialize;

/// Breadcrumb separator used in display titles.
pub const TITLE_SEPARATOR: &str = " / ";

/// Best path from `root` to a note, ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotePathData {
    pub note_id: NoteId,
    /// Edge to the parent on the path, or `none_root` for the root itself.
    pub branch_id: BranchId,
    /// Titles along the path joined with `" / "`.
    pub title: String,
    /// Note ids from `root` to `note_id`, both included.
    pub note_path: Vec<NoteId>,
    /// `note_path` joined with `/`.
    pub path: String,
}
