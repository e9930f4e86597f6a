//! Immutable note snapshots.

use super::blob::BlobId;
use super::note::NoteId;
use serde::Serialize;

pub type RevisionId = String;

/// Snapshot of a note's title, type, mime and content reference.
///
/// Never mutated after insert; removed only by explicit erasure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteRevision {
    pub revision_id: RevisionId,
    pub note_id: NoteId,
    #[serde(rename = "type")]
    pub note_type: String,
    pub mime: String,
    pub title: String,
    pub is_protected: bool,
    pub blob_id: BlobId,
    /// Modification date of the note at snapshot time.
    pub date_last_edited: String,
    pub date_created: String,
    pub utc_date_last_edited: String,
    /// Ordering key for revision listings.
    pub utc_date_created: String,
    pub utc_date_modified: String,
}

/// Listing row: a revision plus its content size, read without the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionListItem {
    #[serde(flatten)]
    pub revision: NoteRevision,
    pub content_length: i64,
}
