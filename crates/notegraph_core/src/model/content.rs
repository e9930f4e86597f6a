//! Textual attachment references inside note content.
//!
//! Content links to attachments with the literal form `attachments/<id>`.
//! Restoring a revision rewrites those links by plain substring replacement,
//! which keeps the stored content format untouched.

use super::attachment::AttachmentId;
use once_cell::sync::Lazy;
use regex::Regex;

static ATTACHMENT_REF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"attachments/([A-Za-z0-9_]+)").expect("valid attachment ref regex"));

/// Lists attachment ids referenced by `content`, in order of appearance.
pub fn attachment_references(content: &str) -> Vec<AttachmentId> {
    ATTACHMENT_REF_RE
        .captures_iter(content)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// Replaces every `attachments/<old>` with `attachments/<new>` for each pair.
pub fn rewrite_attachment_references(
    content: &str,
    mapping: &[(AttachmentId, AttachmentId)],
) -> String {
    let mut rewritten = content.to_string();
    for (old_id, new_id) in mapping {
        rewritten = rewritten.replace(
            &format!("attachments/{old_id}"),
            &format!("attachments/{new_id}"),
        );
    }
    rewritten
}

/// Byte-level variant: non UTF-8 payloads carry no textual references and are
/// returned unchanged.
pub fn rewrite_attachment_references_in_bytes(
    content: Vec<u8>,
    mapping: &[(AttachmentId, AttachmentId)],
) -> Vec<u8> {
    if mapping.is_empty() {
        return content;
    }
    match String::from_utf8(content) {
        Ok(text) => rewrite_attachment_references(&text, mapping).into_bytes(),
        Err(err) => err.into_bytes(),
    }
}
