//! Hoisting scope supplied per call by the caller.

use super::note::{NoteId, ROOT_NOTE_ID};

/// Restricts visible results to the subtree of `hoisted_note_id`.
///
/// `root` means unscoped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoistingContext {
    pub hoisted_note_id: NoteId,
}

impl HoistingContext {
    pub fn new(hoisted_note_id: impl Into<NoteId>) -> Self {
        Self {
            hoisted_note_id: hoisted_note_id.into(),
        }
    }

    pub fn unscoped() -> Self {
        Self::new(ROOT_NOTE_ID)
    }

    pub fn is_scoped(&self) -> bool {
        self.hoisted_note_id != ROOT_NOTE_ID
    }
}

impl Default for HoistingContext {
    fn default() -> Self {
        Self::unscoped()
    }
}
