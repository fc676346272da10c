// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Transports between an edge and the central authority.
//!
//! The orchestrator only talks to a [`ChunkTransport`]. Two are provided:
//! - [`LocalTransport`]: in-process calls into a [`crate::central::CentralService`]
//! - [`HttpTransport`]: JSON over HTTP against the central router
//!
//! Transports never retry on their own. Every failure is surfaced once and
//! classified by [`TransportError`]'s `is_transient`.

mod http;
mod local;

pub use http::HttpTransport;
pub use local::LocalTransport;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::UserRecord;
use crate::chunk::WireChunk;
use crate::content::{CatalogEntry, ContentError, ContentId};
use crate::resilience::retry::Transient;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transient transport failure: {0}")]
    Transient(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("content {0} not found")]
    NotFound(ContentId),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("malformed response: {0}")]
    Protocol(String),
}

impl Transient for TransportError {
    /// Drops, timeouts and garbled responses are worth another attempt.
    fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Timeout(_) | Self::Protocol(_))
    }
}

impl TransportError {
    /// Short label for metrics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transient(_) => "transient",
            Self::Timeout(_) => "timeout",
            Self::NotFound(_) => "not_found",
            Self::InvalidCredentials => "invalid_credentials",
            Self::BadRequest(_) => "bad_request",
            Self::Protocol(_) => "protocol",
        }
    }
}

impl From<ContentError> for TransportError {
    fn from(err: ContentError) -> Self {
        match err {
            ContentError::NotFound(id) => Self::NotFound(id),
            ContentError::AlreadyExists(_) => Self::BadRequest(err.to_string()),
        }
    }
}

/// Body of `POST /sync-chunk`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncChunkRequest {
    pub content_id: ContentId,
    pub chunk_index: u64,
}

/// Body of the `POST /auth/sync` response.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserSnapshot {
    pub users: Vec<UserRecord>,
}

#[async_trait]
pub trait ChunkTransport: Send + Sync {
    /// Full central catalog.
    async fn fetch_catalog(&self) -> Result<Vec<CatalogEntry>, TransportError>;

    /// One chunk of one object. An index past the end yields an
    /// end-of-stream [`WireChunk`] rather than an error.
    async fn fetch_chunk(&self, content_id: ContentId, chunk_index: u64) -> Result<WireChunk, TransportError>;

    /// Full credential snapshot.
    async fn fetch_users(&self) -> Result<Vec<UserRecord>, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(TransportError::Transient("drop".into()).is_transient());
        assert!(TransportError::Timeout(Duration::from_secs(1)).is_transient());
        assert!(TransportError::Protocol("bad base64".into()).is_transient());
        assert!(!TransportError::NotFound(3).is_transient());
        assert!(!TransportError::InvalidCredentials.is_transient());
        assert!(!TransportError::BadRequest("missing field".into()).is_transient());
    }

    #[test]
    fn test_content_errors_map_by_kind() {
        assert_eq!(TransportError::from(ContentError::NotFound(4)), TransportError::NotFound(4));
        assert!(matches!(
            TransportError::from(ContentError::AlreadyExists(4)),
            TransportError::BadRequest(msg) if msg.contains("already exists")
        ));
    }

    #[test]
    fn test_user_snapshot_wire_shape() {
        let snapshot: UserSnapshot = serde_json::from_str(
            r#"{"users": [{"username": "user1", "password": "pass1"}]}"#,
        )
        .unwrap();
        assert_eq!(snapshot.users.len(), 1);
        assert_eq!(snapshot.users[0].username, "user1");
    }
}
