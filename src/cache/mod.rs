// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Per-user bounded edge cache.
//!
//! Each user has one [`CacheEntry`] behind its own lock. A `put` and the
//! eviction pass it triggers run under that lock as one unit, so callers
//! working on different users never contend.
//!
//! # Example
//!
//! ```
//! use edge_sync::cache::EdgeCache;
//! use edge_sync::chunk::{ChunkCodec};
//! use edge_sync::content::ContentObject;
//!
//! let cache = EdgeCache::new(12 * 1024);
//! let codec = ChunkCodec::new(1024);
//!
//! let a = ContentObject::new(1, "A", vec![0; 10 * 1024]);
//! let b = ContentObject::new(2, "B", vec![0; 5 * 1024]);
//! cache.put("alice", 1, codec.chunks(&a).collect()).unwrap();
//! let outcome = cache.put("alice", 2, codec.chunks(&b).collect()).unwrap();
//!
//! assert_eq!(outcome.evicted, vec![1]);
//! assert!(!cache.has("alice", 1));
//! assert_eq!(cache.usage("alice").bytes_used, 5 * 1024);
//! ```

mod entry;

pub use entry::CacheEntry;

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::chunk::Chunk;
use crate::config::SyncConfig;
use crate::content::ContentId;
use crate::eviction::OldestFirstEviction;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("usage accounting inconsistency for '{user}': {bytes_used} bytes recorded with {owned} objects owned")]
    UsageAccountingInconsistency {
        user: String,
        bytes_used: u64,
        owned: usize,
    },
}

/// Result of a successful [`EdgeCache::put`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutOutcome {
    /// Objects removed to make room, oldest first
    pub evicted: Vec<ContentId>,
    pub bytes_used: u64,
}

/// Snapshot of one user's usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheUsage {
    pub bytes_used: u64,
    pub objects: usize,
    pub usage_limit: u64,
}

pub struct EdgeCache {
    entries: DashMap<String, Arc<Mutex<CacheEntry>>>,
    eviction: OldestFirstEviction,
}

impl EdgeCache {
    #[must_use]
    pub fn new(usage_limit: u64) -> Self {
        Self {
            entries: DashMap::new(),
            eviction: OldestFirstEviction::new(usage_limit),
        }
    }

    #[must_use]
    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.usage_limit_bytes)
    }

    #[must_use]
    pub fn usage_limit(&self) -> u64 {
        self.eviction.usage_limit()
    }

    /// Entry for `user`, created on first access.
    fn entry(&self, user: &str) -> Arc<Mutex<CacheEntry>> {
        if let Some(existing) = self.entries.get(user) {
            return existing.value().clone();
        }
        self.entries
            .entry(user.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(CacheEntry::new())))
            .value()
            .clone()
    }

    fn existing(&self, user: &str) -> Option<Arc<Mutex<CacheEntry>>> {
        self.entries.get(user).map(|e| e.value().clone())
    }

    /// Cached chunks of `id`, in index order. Does not affect eviction order.
    pub fn get(&self, user: &str, id: ContentId) -> Option<Vec<Chunk>> {
        let entry = self.existing(user)?;
        let guard = entry.lock();
        guard.chunks(id).map(<[Chunk]>::to_vec)
    }

    pub fn has(&self, user: &str, id: ContentId) -> bool {
        self.existing(user)
            .is_some_and(|entry| entry.lock().contains(id))
    }

    /// Store a fully assembled object and enforce the ceiling.
    ///
    /// The object just stored is exempt from the eviction pass it triggers.
    #[tracing::instrument(skip(self, chunks), fields(chunks = chunks.len()))]
    pub fn put(&self, user: &str, id: ContentId, chunks: Vec<Chunk>) -> Result<PutOutcome, CacheError> {
        let entry = self.entry(user);
        let mut guard = entry.lock();

        if guard.insert(id, chunks).is_err() {
            return Err(self.eviction.inconsistency(user, &guard));
        }
        debug!(bytes_used = guard.bytes_used(), "Object stored");

        let outcome = self.eviction.enforce(user, &mut guard, Some(id))?;
        if !outcome.evicted.is_empty() {
            info!(
                evicted = ?outcome.evicted,
                freed_bytes = outcome.freed_bytes,
                bytes_used = guard.bytes_used(),
                "Evicted objects to stay within usage limit"
            );
        }
        crate::metrics::set_cache_bytes(user, guard.bytes_used());

        Ok(PutOutcome {
            evicted: outcome.evicted,
            bytes_used: guard.bytes_used(),
        })
    }

    /// Run an eviction pass with nothing protected.
    pub fn enforce(&self, user: &str) -> Result<Vec<ContentId>, CacheError> {
        let entry = self.entry(user);
        let mut guard = entry.lock();
        let outcome = self.eviction.enforce(user, &mut guard, None)?;
        crate::metrics::set_cache_bytes(user, guard.bytes_used());
        Ok(outcome.evicted)
    }

    #[must_use]
    pub fn usage(&self, user: &str) -> CacheUsage {
        let (bytes_used, objects) = self
            .existing(user)
            .map(|entry| {
                let guard = entry.lock();
                (guard.bytes_used(), guard.len())
            })
            .unwrap_or((0, 0));
        CacheUsage {
            bytes_used,
            objects,
            usage_limit: self.usage_limit(),
        }
    }

    /// Owned ids, oldest first.
    #[must_use]
    pub fn owned_ids(&self, user: &str) -> Vec<ContentId> {
        self.existing(user)
            .map(|entry| entry.lock().owned_ids())
            .unwrap_or_default()
    }

    /// Copy of a user's entry, for invariant checks.
    #[must_use]
    pub fn snapshot(&self, user: &str) -> CacheEntry {
        self.existing(user)
            .map(|entry| entry.lock().clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn users(&self) -> Vec<String> {
        let mut users: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        users.sort();
        users
    }

    #[cfg(test)]
    pub(crate) fn corrupt_usage(&self, user: &str, bytes: u64) {
        self.entry(user).lock().force_bytes_used(bytes);
    }
}
