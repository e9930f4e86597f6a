//! Use-case services.
//!
//! # Responsibility
//! - Own transaction boundaries; repositories below never begin or commit.
//! - Translate repository errors into per-use-case error taxonomies.

pub mod edited_notes_service;
pub mod graph_service;
pub mod note_service;
pub mod path_service;
pub mod revision_service;
