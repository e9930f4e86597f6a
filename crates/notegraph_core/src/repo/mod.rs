//! Repository layer abstractions and SQLite implementations.
//!
//! # Responsibility
//! - Define storage contracts for blobs, notes, the note graph, revisions and
//!   attachments.
//! - Isolate SQL details from service orchestration.
//!
//! # Invariants
//! - Repositories borrow a `&Connection`, so they work unchanged on top of a
//!   `rusqlite::Transaction`; the caller owns the transaction boundary.
//! - Repository APIs return semantic not-found errors in addition to DB
//!   transport errors.

pub mod attachment_repo;
pub mod blob_repo;
pub mod error;
pub mod graph_repo;
pub mod graph_snapshot;
pub mod note_repo;
pub mod revision_repo;
mod schema;
