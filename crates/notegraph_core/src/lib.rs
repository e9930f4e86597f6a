//! Core of a hierarchical note store.
//!
//! Notes live in a multi-parent DAG (one branch per parent edge), keep their
//! content in content-addressed blobs, and can be snapshotted into revisions
//! and restored atomically.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::attachment::{Attachment, AttachmentId, AttachmentOwner};
pub use model::blob::{BlobContent, BlobId, BlobView};
pub use model::hoisting::HoistingContext;
pub use model::note::{Branch, BranchId, Note, NoteId, ROOT_BRANCH_ID, ROOT_NOTE_ID};
pub use model::path::NotePathData;
pub use model::revision::{NoteRevision, RevisionId, RevisionListItem};
pub use repo::blob_repo::{BlobStore, SqliteBlobStore};
pub use repo::error::{RepoError, RepoResult};
pub use repo::graph_repo::{NoteGraph, SqliteNoteGraph};
pub use repo::graph_snapshot::GraphSnapshot;
pub use service::edited_notes_service::{EditedNote, EditedNotesService, EDITED_NOTES_LIMIT};
pub use service::graph_service::{GraphService, GraphServiceError};
pub use service::note_service::{NewAttachment, NewNote, NoteService, NoteServiceError};
pub use service::path_service::{retain_hoisted, NotePathService, PathResolver};
pub use service::revision_service::{RevisionService, RevisionServiceError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
