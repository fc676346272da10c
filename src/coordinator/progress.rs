// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Transient per-object fetch state.
//!
//! A [`SyncProgress`] lives only while one object is being fetched. It is
//! dropped on abandonment or cancellation, so partial objects never reach
//! the cache.

use sha2::{Digest, Sha256};

use super::types::AbandonReason;
use crate::chunk::Chunk;
use crate::content::{CatalogEntry, ContentId};

#[derive(Debug)]
pub struct SyncProgress {
    pub content_id: ContentId,
    pub next_index: u64,
    pub accumulated_bytes: u64,
    expected_size: u64,
    /// Chunks the catalog size allows; only the end-of-stream marker may follow
    chunk_limit: u64,
    chunks: Vec<Chunk>,
    finished: bool,
}

impl SyncProgress {
    #[must_use]
    pub fn new(entry: &CatalogEntry, chunk_limit: u64) -> Self {
        Self {
            content_id: entry.id,
            next_index: 0,
            accumulated_bytes: 0,
            expected_size: entry.size,
            chunk_limit,
            chunks: Vec::new(),
            finished: false,
        }
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Take the chunk for `next_index`. Empty end-of-stream chunks are not
    /// kept. Returns `true` once the object is complete.
    pub fn accept(&mut self, chunk: Chunk) -> Result<bool, AbandonReason> {
        debug_assert_eq!(chunk.index, self.next_index);

        let end_marker = chunk.is_last && chunk.is_empty();
        if chunk.index >= self.chunk_limit && !end_marker {
            return Err(AbandonReason::TooManyChunks {
                expected_chunks: self.chunk_limit,
            });
        }

        self.accumulated_bytes += chunk.len() as u64;
        if self.accumulated_bytes > self.expected_size {
            return Err(AbandonReason::Overrun {
                expected: self.expected_size,
            });
        }

        self.next_index += 1;
        self.finished = chunk.is_last;
        if !chunk.is_empty() {
            self.chunks.push(chunk);
        }
        Ok(self.finished)
    }

    /// Validate the assembled object against its catalog entry and hand back
    /// the chunks ready to commit.
    pub fn finish(self, entry: &CatalogEntry, verify_digest: bool) -> Result<Vec<Chunk>, AbandonReason> {
        if self.accumulated_bytes != entry.size {
            return Err(AbandonReason::SizeMismatch {
                expected: entry.size,
                actual: self.accumulated_bytes,
            });
        }

        if let (true, Some(expected)) = (verify_digest, entry.sha256.as_deref()) {
            let mut hasher = Sha256::new();
            for chunk in &self.chunks {
                hasher.update(&chunk.bytes);
            }
            let actual = hex::encode(hasher.finalize());
            if !actual.eq_ignore_ascii_case(expected) {
                return Err(AbandonReason::DigestMismatch {
                    expected: expected.to_string(),
                    actual,
                });
            }
        }

        Ok(self.chunks)
    }
}
