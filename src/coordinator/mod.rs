// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Sync orchestrator.
//!
//! The [`SyncOrchestrator`] brings one edge up to date with the central
//! catalog:
//! - lists the catalog and diffs it against what the edge already owns
//! - fetches each missing object chunk by chunk, retrying at the same index
//! - verifies size (and digest when published) of the reassembled object
//! - commits complete objects to the edge cache in catalog order
//!
//! # Lifecycle
//!
//! ```text
//! Idle → DiffingCatalog → FetchingObject* → Idle
//! ```
//!
//! An object that exhausts its retry budget is reported in
//! [`SyncReport::abandoned`] and the run moves on. Only a failed catalog
//! listing or a cache accounting inconsistency fails the run as a whole.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use edge_sync::{EdgeNode, SyncConfig, SyncOrchestrator, SyncState};
//! use edge_sync::transport::HttpTransport;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let config = SyncConfig::default();
//! let transport = HttpTransport::new("http://127.0.0.1:5000", config.request_timeout()).unwrap();
//! let edge = Arc::new(EdgeNode::from_config(&config));
//! let orchestrator = SyncOrchestrator::new(Arc::new(transport), edge, config);
//!
//! assert_eq!(orchestrator.state(), SyncState::Idle);
//! let report = orchestrator.run_full("pool").await.unwrap();
//! println!("fetched {:?}, abandoned {}", report.fetched, report.abandoned.len());
//! # }
//! ```

mod fetch;
mod progress;
mod types;

pub use progress::SyncProgress;
pub use types::{AbandonReason, AbandonedObject, SyncError, SyncReport, SyncState};

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::chunk::ChunkCodec;
use crate::config::SyncConfig;
use crate::content::{CatalogEntry, ContentId};
use crate::edge::EdgeNode;
use crate::resilience::retry::retry;
use crate::transport::{ChunkTransport, TransportError};

use fetch::FetchOutcome;

pub struct SyncOrchestrator {
    transport: Arc<dyn ChunkTransport>,
    edge: Arc<EdgeNode>,
    codec: ChunkCodec,
    config: SyncConfig,
    state: watch::Sender<SyncState>,
    state_rx: watch::Receiver<SyncState>,
}

impl SyncOrchestrator {
    pub fn new(transport: Arc<dyn ChunkTransport>, edge: Arc<EdgeNode>, config: SyncConfig) -> Self {
        let (state, state_rx) = watch::channel(SyncState::Idle);
        Self {
            transport,
            edge,
            codec: ChunkCodec::new(config.chunk_size),
            config,
            state,
            state_rx,
        }
    }

    #[must_use]
    pub fn state(&self) -> SyncState {
        *self.state_rx.borrow()
    }

    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<SyncState> {
        self.state_rx.clone()
    }

    #[must_use]
    pub fn edge(&self) -> &Arc<EdgeNode> {
        &self.edge
    }

    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Sync every missing object for `user`.
    pub async fn run(&self, user: &str) -> Result<SyncReport, SyncError> {
        let (_never_cancel, cancel) = watch::channel(false);
        self.run_with_cancel(user, cancel).await
    }

    /// Credential snapshot first, then content. A failed credential sync is
    /// logged and does not stop the content sync.
    pub async fn run_full(&self, user: &str) -> Result<SyncReport, SyncError> {
        if let Err(e) = self.sync_users().await {
            warn!(error = %e, "Credential sync failed, continuing with content sync");
        }
        self.run(user).await
    }

    /// Like [`Self::run`], stopping between objects once `cancel` reads `true`.
    #[tracing::instrument(skip(self, cancel))]
    pub async fn run_with_cancel(
        &self,
        user: &str,
        cancel: watch::Receiver<bool>,
    ) -> Result<SyncReport, SyncError> {
        let started = Instant::now();
        let result = self.sync(user, &cancel).await;
        let _ = self.state.send(SyncState::Idle);
        crate::metrics::record_sync_latency(started.elapsed());

        let report = result?;
        info!(
            fetched = report.fetched.len(),
            skipped = report.skipped.len(),
            abandoned = report.abandoned.len(),
            evicted = report.evicted.len(),
            retries = report.retries,
            cancelled = report.cancelled,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Sync run finished"
        );
        Ok(report)
    }

    /// Fetch the central credential snapshot and apply it to the edge.
    #[tracing::instrument(skip(self))]
    pub async fn sync_users(&self) -> Result<usize, SyncError> {
        let timeout = self.config.request_timeout();
        let transport = &self.transport;
        let users = retry("fetch_users", &self.config.listing_retry(), || async move {
            with_timeout(timeout, transport.fetch_users()).await
        })
        .await
        .map_err(|failure| SyncError::Catalog(failure.error))?
        .value;

        let applied = self.edge.apply_user_update(users);
        info!(applied, "Credential snapshot applied");
        Ok(applied)
    }

    /// Catalog entries `user` does not own yet, ascending by id, and the ids
    /// already owned.
    pub fn diff(&self, user: &str, mut catalog: Vec<CatalogEntry>) -> (Vec<CatalogEntry>, Vec<ContentId>) {
        catalog.sort_by_key(|entry| entry.id);
        catalog.dedup_by_key(|entry| entry.id);

        let (owned, missing): (Vec<_>, Vec<_>) = catalog
            .into_iter()
            .partition(|entry| self.edge.owns(user, entry.id));
        (missing, owned.into_iter().map(|entry| entry.id).collect())
    }

    async fn sync(&self, user: &str, cancel: &watch::Receiver<bool>) -> Result<SyncReport, SyncError> {
        let mut report = SyncReport::new(user);

        let _ = self.state.send(SyncState::DiffingCatalog);
        let catalog = self.fetch_catalog().await?;
        let (missing, skipped) = self.diff(user, catalog);
        report.skipped = skipped;
        info!(missing = missing.len(), skipped = report.skipped.len(), "Catalog diffed");

        // Fetches overlap; commits happen here, one at a time, in catalog order.
        // A fetch that has not started once cancel is set yields None.
        let fetches = missing.into_iter().map(|entry| {
            let cancel = cancel.clone();
            async move {
                if *cancel.borrow() {
                    return None;
                }
                Some(self.fetch_object(entry).await)
            }
        });
        let mut results = std::pin::pin!(stream::iter(fetches).buffered(self.config.max_concurrent_fetches.max(1)));

        while let Some(result) = results.next().await {
            let Some(outcome) = result else {
                warn!("Sync cancelled, dropping remaining objects");
                report.cancelled = true;
                break;
            };

            match outcome {
                FetchOutcome::Complete(fetched) => {
                    report.chunks_fetched += fetched.chunks_fetched;
                    report.retries += fetched.retries;

                    let bytes = fetched.entry.size;
                    let put = self.edge.apply_content_update(user, &fetched.entry, fetched.chunks)?;
                    crate::metrics::record_object_synced();
                    crate::metrics::record_bytes_synced(bytes);

                    report.fetched.push(fetched.entry.id);
                    report.evicted.extend(put.evicted);
                }
                FetchOutcome::Abandoned { abandoned, chunks_fetched, retries } => {
                    warn!(
                        content_id = abandoned.content_id,
                        attempts = abandoned.attempts,
                        reason = %abandoned.reason,
                        "Object sync abandoned"
                    );
                    crate::metrics::record_abandoned(abandoned.reason.kind());
                    report.chunks_fetched += chunks_fetched;
                    report.retries += retries;
                    report.abandoned.push(abandoned);
                }
            }
        }

        Ok(report)
    }

    async fn fetch_catalog(&self) -> Result<Vec<CatalogEntry>, SyncError> {
        let timeout = self.config.request_timeout();
        let transport = &self.transport;
        retry("fetch_catalog", &self.config.listing_retry(), || async move {
            with_timeout(timeout, transport.fetch_catalog()).await
        })
        .await
        .map(|attempted| attempted.value)
        .map_err(|failure| SyncError::Catalog(failure.error))
    }
}

/// Bound a transport call. Elapsing counts as one failed attempt.
async fn with_timeout<T>(
    limit: Duration,
    call: impl Future<Output = Result<T, TransportError>>,
) -> Result<T, TransportError> {
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| TransportError::Timeout(limit))?
}
