//! Content-addressed blob store.
//!
//! # Responsibility
//! - Persist immutable payloads once per distinct byte sequence.
//! - Serve full payloads and payload lengths by `blob_id`.
//!
//! # Invariants
//! - `put` is idempotent: identical bytes yield the same id and one stored row.
//! - A payload is either fully present or absent; there are no partial reads.
//! - Blobs are removed only by `erase_unused_blobs`, which skips every blob
//!   still referenced by a note, revision or attachment.

use super::error::{RepoError, RepoResult};
use super::schema::ensure_connection_ready;
use crate::model::blob::{blob_id_for, BlobId, BlobView, PREVIEW_MAX_BYTES};
use crate::model::timestamp::Timestamp;
use log::debug;
use rusqlite::{params, Connection, OptionalExtension};

/// Storage contract for content-addressed payloads.
pub trait BlobStore {
    /// Stores `bytes` (if new) and returns their content address.
    fn put(&self, bytes: &[u8]) -> RepoResult<BlobId>;
    /// Loads a full payload.
    fn get(&self, blob_id: &str) -> RepoResult<Vec<u8>>;
    fn exists(&self, blob_id: &str) -> RepoResult<bool>;
    /// Payload length in bytes, read without loading the payload.
    fn content_length(&self, blob_id: &str) -> RepoResult<i64>;
    /// First `max_bytes` bytes of a payload.
    fn get_prefix(&self, blob_id: &str, max_bytes: usize) -> RepoResult<Vec<u8>>;

    /// Full payload, or a bounded prefix when `preview` is set.
    fn view(&self, blob_id: &str, preview: bool) -> RepoResult<BlobView> {
        if preview {
            let content_length = self.content_length(blob_id)?;
            let prefix = self.get_prefix(blob_id, PREVIEW_MAX_BYTES)?;
            Ok(BlobView::preview(blob_id.to_string(), prefix, content_length))
        } else {
            Ok(BlobView::full(blob_id.to_string(), self.get(blob_id)?))
        }
    }
}

/// SQLite-backed blob store.
pub struct SqliteBlobStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteBlobStore<'conn> {
    /// Creates the store from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "blobs", &["blob_id", "content", "utc_date_modified"])?;
        Ok(Self { conn })
    }

    /// Hard-deletes blobs that nothing references any more.
    ///
    /// Returns the number of erased payloads.
    pub fn erase_unused_blobs(&self) -> RepoResult<usize> {
        let erased = self.conn.execute(
            "DELETE FROM blobs
             WHERE blob_id NOT IN (SELECT blob_id FROM notes)
               AND blob_id NOT IN (SELECT blob_id FROM note_revisions)
               AND blob_id NOT IN (SELECT blob_id FROM attachments);",
            [],
        )?;
        debug!("event=blob_gc module=repo status=ok erased={erased}");
        Ok(erased)
    }

    /// Number of stored payloads.
    pub fn count(&self) -> RepoResult<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM blobs;", [], |row| row.get(0))?;
        Ok(count)
    }
}

impl BlobStore for SqliteBlobStore<'_> {
    fn put(&self, bytes: &[u8]) -> RepoResult<BlobId> {
        let blob_id = blob_id_for(bytes);
        self.conn.execute(
            "INSERT OR IGNORE INTO blobs (blob_id, content, utc_date_modified)
             VALUES (?1, ?2, ?3);",
            params![blob_id.as_str(), bytes, Timestamp::now().utc],
        )?;
        Ok(blob_id)
    }

    fn get(&self, blob_id: &str) -> RepoResult<Vec<u8>> {
        self.conn
            .query_row(
                "SELECT content FROM blobs WHERE blob_id = ?1;",
                [blob_id],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()?
            .ok_or_else(|| RepoError::BlobNotFound(blob_id.to_string()))
    }

    fn exists(&self, blob_id: &str) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM blobs WHERE blob_id = ?1);",
            [blob_id],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn content_length(&self, blob_id: &str) -> RepoResult<i64> {
        self.conn
            .query_row(
                "SELECT LENGTH(content) FROM blobs WHERE blob_id = ?1;",
                [blob_id],
                |row| row.get::<_, i64>(0),
            )
            .optional()?
            .ok_or_else(|| RepoError::BlobNotFound(blob_id.to_string()))
    }

    fn get_prefix(&self, blob_id: &str, max_bytes: usize) -> RepoResult<Vec<u8>> {
        let max_bytes = i64::try_from(max_bytes).unwrap_or(i64::MAX);
        self.conn
            .query_row(
                "SELECT SUBSTR(content, 1, ?2) FROM blobs WHERE blob_id = ?1;",
                params![blob_id, max_bytes],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()?
            .ok_or_else(|| RepoError::BlobNotFound(blob_id.to_string()))
    }
}
