//! Content-addressed blob identity and read projections.
//!
//! # Invariants
//! - `blob_id` is the lowercase hex SHA-256 of the payload, so identical bytes
//!   always map to one id.
//! - A `BlobView` built with `preview = true` never carries more than
//!   `PREVIEW_MAX_CHARS` characters (text) or bytes (binary).

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of a payload.
pub type BlobId = String;

/// Upper bound applied to preview reads.
pub const PREVIEW_MAX_CHARS: usize = 10_000;
/// Bytes fetched for a preview; enough for `PREVIEW_MAX_CHARS` UTF-8 chars.
pub const PREVIEW_MAX_BYTES: usize = PREVIEW_MAX_CHARS * 4;

/// Computes the content address of `bytes`.
pub fn blob_id_for(bytes: &[u8]) -> BlobId {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Decoded blob payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum BlobContent {
    Text(String),
    Binary(Vec<u8>),
}

impl BlobContent {
    /// Interprets raw bytes as UTF-8 text when possible.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        match String::from_utf8(bytes) {
            Ok(text) => Self::Text(text),
            Err(err) => Self::Binary(err.into_bytes()),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Binary(bytes) => bytes.as_slice(),
        }
    }

    fn truncated(self, max: usize) -> Self {
        match self {
            Self::Text(text) if text.chars().count() > max => {
                Self::Text(text.chars().take(max).collect())
            }
            Self::Binary(mut bytes) if bytes.len() > max => {
                bytes.truncate(max);
                Self::Binary(bytes)
            }
            other => other,
        }
    }
}

/// Blob payload as exposed to callers, optionally cut to a preview prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobView {
    pub blob_id: BlobId,
    pub content: BlobContent,
    /// Full stored length in bytes, independent of `preview`.
    pub content_length: i64,
    pub preview: bool,
}

impl BlobView {
    /// View over a fully loaded payload.
    pub fn full(blob_id: BlobId, bytes: Vec<u8>) -> Self {
        Self {
            blob_id,
            content_length: bytes.len() as i64,
            content: BlobContent::from_bytes(bytes),
            preview: false,
        }
    }

    /// View over a payload prefix read with at most `PREVIEW_MAX_BYTES` bytes.
    pub fn preview(blob_id: BlobId, prefix: Vec<u8>, content_length: i64) -> Self {
        Self {
            blob_id,
            content: decode_prefix(prefix).truncated(PREVIEW_MAX_CHARS),
            content_length,
            preview: true,
        }
    }
}

fn decode_prefix(bytes: Vec<u8>) -> BlobContent {
    match String::from_utf8(bytes) {
        Ok(text) => BlobContent::Text(text),
        Err(err) => {
            let utf8_error = err.utf8_error();
            let mut bytes = err.into_bytes();
            // A char cut by the prefix bound is incomplete, not invalid.
            if utf8_error.error_len().is_none() {
                bytes.truncate(utf8_error.valid_up_to());
                BlobContent::from_bytes(bytes)
            } else {
                BlobContent::Binary(bytes)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{blob_id_for, BlobContent, BlobView, PREVIEW_MAX_BYTES, PREVIEW_MAX_CHARS};

    #[test]
    fn blob_id_is_stable_hex_sha256() {
        assert_eq!(
            blob_id_for(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(blob_id_for(b"abc"), blob_id_for(b"abc"));
        assert_ne!(blob_id_for(b"abc"), blob_id_for(b"abd"));
    }

    #[test]
    fn preview_cuts_text_by_chars_and_keeps_full_length() {
        let text = "\u{e9}".repeat(PREVIEW_MAX_CHARS + 5);
        let full_len = text.len() as i64;
        let mut prefix = text.into_bytes();
        prefix.truncate(PREVIEW_MAX_BYTES);
        let view = BlobView::preview("id".to_string(), prefix, full_len);

        assert_eq!(view.content_length, full_len);
        assert!(view.preview);
        match view.content {
            BlobContent::Text(value) => assert_eq!(value.chars().count(), PREVIEW_MAX_CHARS),
            other => panic!("expected text content, got {other:?}"),
        }
    }

    #[test]
    fn preview_drops_char_split_by_prefix_bound() {
        let mut prefix = "ab\u{e9}".as_bytes().to_vec();
        prefix.pop();
        let view = BlobView::preview("id".to_string(), prefix, 4);
        assert_eq!(view.content, BlobContent::Text("ab".to_string()));
    }

    #[test]
    fn invalid_utf8_is_kept_as_binary() {
        let view = BlobView::full("id".to_string(), vec![0xff, 0xfe, 0x00]);
        assert_eq!(view.content, BlobContent::Binary(vec![0xff, 0xfe, 0x00]));
        assert_eq!(view.content_length, 3);
    }
}
