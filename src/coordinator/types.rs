// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Public types for the sync orchestrator.

use serde::Serialize;
use thiserror::Error;

use crate::cache::CacheError;
use crate::content::ContentId;
use crate::transport::TransportError;

/// Orchestrator state.
///
/// Use [`super::SyncOrchestrator::state()`] to check the current state or
/// [`super::SyncOrchestrator::state_receiver()`] to watch for changes.
///
/// ```text
/// Idle → DiffingCatalog → FetchingObject* → Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// No run in progress
    Idle,
    /// Listing the central catalog and comparing with the edge
    DiffingCatalog,
    /// Requesting chunks of one object. With concurrent fetches this is the
    /// most recently started object.
    FetchingObject { content_id: ContentId },
}

impl std::fmt::Display for SyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::DiffingCatalog => write!(f, "DiffingCatalog"),
            Self::FetchingObject { content_id } => write!(f, "FetchingObject({})", content_id),
        }
    }
}

/// Why an object was given up on. It is never committed in any of these cases.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum AbandonReason {
    #[error("chunk {chunk_index} failed: {error}")]
    Transfer { chunk_index: u64, error: String },
    #[error("content no longer exists on central")]
    NotFound,
    #[error("central sent more data than the catalog size of {expected} bytes")]
    Overrun { expected: u64 },
    #[error("central sent chunks past the {expected_chunks} the catalog size allows")]
    TooManyChunks { expected_chunks: u64 },
    #[error("assembled {actual} bytes, catalog says {expected}")]
    SizeMismatch { expected: u64, actual: u64 },
    #[error("digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },
}

impl AbandonReason {
    /// Short label for metrics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transfer { .. } => "retries_exhausted",
            Self::NotFound => "not_found",
            Self::Overrun { .. } => "overrun",
            Self::TooManyChunks { .. } => "too_many_chunks",
            Self::SizeMismatch { .. } => "size_mismatch",
            Self::DigestMismatch { .. } => "digest_mismatch",
        }
    }
}

/// One object a run gave up on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AbandonedObject {
    pub content_id: ContentId,
    /// Attempts made at the failing step
    pub attempts: usize,
    pub reason: AbandonReason,
}

impl From<AbandonedObject> for SyncError {
    fn from(abandoned: AbandonedObject) -> Self {
        SyncError::ObjectSyncAbandoned {
            content_id: abandoned.content_id,
            attempts: abandoned.attempts,
            reason: abandoned.reason.to_string(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Catalog or credential listing failed after its retries
    #[error("central listing failed: {0}")]
    Catalog(TransportError),
    /// Committing to the edge cache hit an accounting inconsistency
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error("sync of content {content_id} abandoned after {attempts} attempts: {reason}")]
    ObjectSyncAbandoned {
        content_id: ContentId,
        attempts: usize,
        reason: String,
    },
}

/// Outcome of one sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub user: String,
    /// Committed this run, in commit order
    pub fetched: Vec<ContentId>,
    /// Already owned before the run
    pub skipped: Vec<ContentId>,
    pub abandoned: Vec<AbandonedObject>,
    /// Evicted by this run's commits
    pub evicted: Vec<ContentId>,
    pub chunks_fetched: u64,
    /// Failed chunk attempts that were retried
    pub retries: usize,
    /// Stopped early by the cancel signal
    pub cancelled: bool,
}

impl SyncReport {
    #[must_use]
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            ..Default::default()
        }
    }

    /// Every missing object was committed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.abandoned.is_empty() && !self.cancelled
    }

    /// Abandonments as errors, for callers that want to propagate them.
    #[must_use]
    pub fn errors(&self) -> Vec<SyncError> {
        self.abandoned.iter().cloned().map(SyncError::from).collect()
    }
}
