// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};

use super::{ChunkTransport, SyncChunkRequest, TransportError, UserSnapshot};
use crate::auth::UserRecord;
use crate::chunk::WireChunk;
use crate::content::{CatalogEntry, ContentId};

/// Default connection timeout for central requests.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// JSON-over-HTTP client for the central router.
#[derive(Clone)]
pub struct HttpTransport {
    base_url: String,
    client: Client,
    request_timeout: Duration,
}

impl HttpTransport {
    /// `base_url` like `http://127.0.0.1:5000`, without a trailing slash.
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT.min(request_timeout))
            .timeout(request_timeout)
            .build()
            .map_err(|e| TransportError::BadRequest(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            request_timeout,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn network_error(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout(self.request_timeout)
        } else {
            TransportError::Transient(err.to_string())
        }
    }

    async fn check_status(response: Response, content_id: Option<ContentId>) -> Result<Response, TransportError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(match (status, content_id) {
            (StatusCode::NOT_FOUND, Some(id)) => TransportError::NotFound(id),
            (StatusCode::UNAUTHORIZED, _) => TransportError::InvalidCredentials,
            (StatusCode::BAD_REQUEST, _) => TransportError::BadRequest(body),
            _ => TransportError::Transient(format!("central returned {}: {}", status, body)),
        })
    }
}

#[async_trait]
impl ChunkTransport for HttpTransport {
    async fn fetch_catalog(&self) -> Result<Vec<CatalogEntry>, TransportError> {
        let url = format!("{}/content", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.network_error(e))?;
        let response = Self::check_status(response, None).await?;
        response
            .json()
            .await
            .map_err(|e| TransportError::Protocol(e.to_string()))
    }

    async fn fetch_chunk(&self, content_id: ContentId, chunk_index: u64) -> Result<WireChunk, TransportError> {
        let url = format!("{}/sync-chunk", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&SyncChunkRequest { content_id, chunk_index })
            .send()
            .await
            .map_err(|e| self.network_error(e))?;
        let response = Self::check_status(response, Some(content_id)).await?;
        response
            .json()
            .await
            .map_err(|e| TransportError::Protocol(e.to_string()))
    }

    async fn fetch_users(&self) -> Result<Vec<UserRecord>, TransportError> {
        let url = format!("{}/auth/sync", self.base_url);
        let response = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(|e| self.network_error(e))?;
        let response = Self::check_status(response, None).await?;
        let snapshot: UserSnapshot = response
            .json()
            .await
            .map_err(|e| TransportError::Protocol(e.to_string()))?;
        Ok(snapshot.users)
    }
}
