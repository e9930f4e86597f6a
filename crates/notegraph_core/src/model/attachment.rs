//! Attachments owned by a note or by a revision.
//!
//! # Invariants
//! - The owner is fixed at creation. Moving an attachment to another owner is
//!   always a copy with a fresh `attachment_id`.

use super::blob::BlobId;
use super::new_entity_id;
use super::note::NoteId;
use super::revision::RevisionId;
use serde::Serialize;

pub type AttachmentId = String;

/// Owning entity of an attachment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum AttachmentOwner {
    Note(NoteId),
    Revision(RevisionId),
}

impl AttachmentOwner {
    pub(crate) fn kind_str(&self) -> &'static str {
        match self {
            Self::Note(_) => "note",
            Self::Revision(_) => "revision",
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Note(id) | Self::Revision(id) => id.as_str(),
        }
    }

    pub(crate) fn from_parts(kind: &str, id: String) -> Option<Self> {
        match kind {
            "note" => Some(Self::Note(id)),
            "revision" => Some(Self::Revision(id)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub attachment_id: AttachmentId,
    pub owner: AttachmentOwner,
    /// `image`, `file`, ...
    pub role: String,
    pub mime: String,
    pub title: String,
    pub position: i64,
    pub blob_id: BlobId,
    pub is_protected: bool,
    pub is_deleted: bool,
    pub utc_date_modified: String,
}

impl Attachment {
    /// Copies metadata and content reference under a new owner and a new id.
    pub fn copy_to(&self, owner: AttachmentOwner, utc_now: &str) -> Self {
        Self {
            attachment_id: new_entity_id(),
            owner,
            role: self.role.clone(),
            mime: self.mime.clone(),
            title: self.title.clone(),
            position: self.position,
            blob_id: self.blob_id.clone(),
            is_protected: self.is_protected,
            is_deleted: false,
            utc_date_modified: utc_now.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Attachment, AttachmentOwner};

    #[test]
    fn copy_gets_new_id_and_owner_but_same_blob() {
        let source = Attachment {
            attachment_id: "att1".to_string(),
            owner: AttachmentOwner::Note("n1".to_string()),
            role: "image".to_string(),
            mime: "image/png".to_string(),
            title: "cat.png".to_string(),
            position: 10,
            blob_id: "h1".to_string(),
            is_protected: false,
            is_deleted: true,
            utc_date_modified: "2024-01-01 00:00:00.000Z".to_string(),
        };

        let copy = source.copy_to(
            AttachmentOwner::Revision("r1".to_string()),
            "2024-02-02 00:00:00.000Z",
        );
        assert_ne!(copy.attachment_id, source.attachment_id);
        assert_eq!(copy.owner, AttachmentOwner::Revision("r1".to_string()));
        assert_eq!(copy.blob_id, "h1");
        assert_eq!(copy.title, "cat.png");
        assert!(!copy.is_deleted);
    }
}
