// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Fixed-size chunking of content payloads.
//!
//! A chunk is addressed by `(content_id, index)`. The codec never stores
//! chunks; it slices them lazily out of a [`ContentObject`] and puts them
//! back together in index order.
//!
//! # Wire form
//!
//! Text transports carry a [`WireChunk`] whose `data` is standard base64 and
//! whose `more` flag is `false` on the last chunk. An empty `data` with
//! `more = false` marks the end of an object when the requested index is
//! past the last chunk. Binary transports use [`Chunk::bytes`] directly.
//!
//! ```text
//! payload (2500 bytes, chunk_size 1024)
//! ┌──────────┬──────────┬──────┐
//! │ idx 0    │ idx 1    │ idx 2│
//! │ 1024 B   │ 1024 B   │ 452 B│
//! │ more=true│ more=true│ last │
//! └──────────┴──────────┴──────┘
//! ```

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::content::{ContentId, ContentObject};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChunkError {
    #[error("chunk {index} of content {content_id} is out of range ({count} chunks)")]
    OutOfRange {
        content_id: ContentId,
        index: u64,
        count: u64,
    },
    #[error("chunk {found} of content {content_id} arrived where {expected} was expected")]
    OutOfOrder {
        content_id: ContentId,
        expected: u64,
        found: u64,
    },
    #[error("invalid chunk encoding: {0}")]
    Decode(#[from] base64::DecodeError),
}

/// A slice of a payload. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub content_id: ContentId,
    pub index: u64,
    pub bytes: Vec<u8>,
    pub is_last: bool,
}

impl Chunk {
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// JSON body of a `/sync-chunk` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireChunk {
    pub content_id: ContentId,
    pub chunk_index: u64,
    pub data: String,
    pub more: bool,
}

impl WireChunk {
    /// Response for an index past the last chunk.
    #[must_use]
    pub fn end_of_stream(content_id: ContentId, chunk_index: u64) -> Self {
        Self {
            content_id,
            chunk_index,
            data: String::new(),
            more: false,
        }
    }
}

/// Splits payloads into `chunk_size` slices and reassembles them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkCodec {
    chunk_size: usize,
}

impl Default for ChunkCodec {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl ChunkCodec {
    /// A zero chunk size is bumped to one byte.
    #[must_use]
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// `ceil(size / chunk_size)`
    #[must_use]
    pub fn chunk_count(&self, size: u64) -> u64 {
        size.div_ceil(self.chunk_size as u64)
    }

    pub fn chunk_at(&self, object: &ContentObject, index: u64) -> Result<Chunk, ChunkError> {
        let size = object.total_size();
        let count = self.chunk_count(size);
        if index >= count {
            return Err(ChunkError::OutOfRange {
                content_id: object.id,
                index,
                count,
            });
        }

        let chunk_size = self.chunk_size as u64;
        let start = index * chunk_size;
        let end = ((index + 1) * chunk_size).min(size);
        Ok(Chunk {
            content_id: object.id,
            index,
            bytes: object.payload[start as usize..end as usize].to_vec(),
            is_last: (index + 1) * chunk_size >= size,
        })
    }

    /// Lazily yields every chunk of `object` in index order.
    pub fn chunks<'a>(&'a self, object: &'a ContentObject) -> impl Iterator<Item = Chunk> + 'a {
        let count = self.chunk_count(object.total_size());
        (0..count).filter_map(move |index| self.chunk_at(object, index).ok())
    }

    /// Concatenate chunks that must be in contiguous index order from 0.
    pub fn reassemble(&self, chunks: &[Chunk]) -> Result<Vec<u8>, ChunkError> {
        let total: usize = chunks.iter().map(Chunk::len).sum();
        let mut payload = Vec::with_capacity(total);
        for (expected, chunk) in chunks.iter().enumerate() {
            if chunk.index != expected as u64 {
                return Err(ChunkError::OutOfOrder {
                    content_id: chunk.content_id,
                    expected: expected as u64,
                    found: chunk.index,
                });
            }
            payload.extend_from_slice(&chunk.bytes);
        }
        Ok(payload)
    }

    #[must_use]
    pub fn encode(&self, chunk: &Chunk) -> WireChunk {
        WireChunk {
            content_id: chunk.content_id,
            chunk_index: chunk.index,
            data: STANDARD.encode(&chunk.bytes),
            more: !chunk.is_last,
        }
    }

    pub fn decode(&self, wire: &WireChunk) -> Result<Chunk, ChunkError> {
        let bytes = if wire.data.is_empty() {
            Vec::new()
        } else {
            STANDARD.decode(wire.data.as_bytes())?
        };
        Ok(Chunk {
            content_id: wire.content_id,
            index: wire.chunk_index,
            bytes,
            is_last: !wire.more,
        })
    }

    /// Wire response for `(object, index)`, including the end-of-stream marker.
    #[must_use]
    pub fn wire_chunk_at(&self, object: &ContentObject, index: u64) -> WireChunk {
        match self.chunk_at(object, index) {
            Ok(chunk) => self.encode(&chunk),
            Err(_) => WireChunk::end_of_stream(object.id, index),
        }
    }
}
