//! Domain model for versioned, multi-parent notes.
//!
//! # Responsibility
//! - Define the records shared by the blob store, the note graph, the
//!   revision history and path resolution.
//! - Keep identifier, timestamp and content-reference conventions in one place.
//!
//! # Invariants
//! - Identifiers are opaque strings; `root` is the only fixed note id.
//! - Deletion is represented by soft-delete tombstones, except for explicitly
//!   erased revisions.

pub mod attachment;
pub mod blob;
pub mod content;
pub mod hoisting;
pub mod note;
pub mod path;
pub mod revision;
pub mod timestamp;

use uuid::Uuid;

/// Generates a fresh opaque entity id for notes, revisions and attachments.
pub fn new_entity_id() -> String {
    Uuid::new_v4().simple().to_string()
}
