// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Authoritative content catalog.
//!
//! The central side owns every [`ContentObject`] exclusively. Objects are
//! created once at ingestion and never mutated or deleted, so readers can
//! share them freely behind an `Arc`.
//!
//! # Example
//!
//! ```
//! use edge_sync::content::ContentStore;
//!
//! let store = ContentStore::new();
//! store.ingest(1, "Video1.mp4", vec![b'x'; 10 * 1024]).unwrap();
//!
//! let catalog = store.list();
//! assert_eq!(catalog.len(), 1);
//! assert_eq!(catalog[0].size, 10 * 1024);
//! assert!(store.get(2).is_err());
//! ```

mod store;

pub use store::ContentStore;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Content identifier, unique across the central catalog.
pub type ContentId = u64;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContentError {
    #[error("content {0} not found")]
    NotFound(ContentId),
    #[error("content {0} already exists and is immutable")]
    AlreadyExists(ContentId),
}

/// An immutable payload with its metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentObject {
    pub id: ContentId,
    pub title: String,
    pub payload: Vec<u8>,
    /// Hex sha256 of `payload`, computed at creation
    pub sha256: String,
}

impl ContentObject {
    pub fn new(id: ContentId, title: impl Into<String>, payload: Vec<u8>) -> Self {
        let sha256 = digest_hex(&payload);
        Self {
            id,
            title: title.into(),
            payload,
            sha256,
        }
    }

    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.payload.len() as u64
    }

    #[must_use]
    pub fn catalog_entry(&self) -> CatalogEntry {
        CatalogEntry {
            id: self.id,
            title: self.title.clone(),
            size: self.total_size(),
            sha256: Some(self.sha256.clone()),
        }
    }
}

/// One row of `GET /content`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: ContentId,
    pub title: String,
    pub size: u64,
    /// Not every catalog publishes digests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

/// Hex-encoded sha256 of `bytes`.
#[must_use]
pub fn digest_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
