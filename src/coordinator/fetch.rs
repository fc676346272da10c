// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Per-object chunk loop: request, retry at the same index, accumulate,
//! verify.

use std::time::Duration;

use tracing::debug;

use super::progress::SyncProgress;
use super::types::{AbandonReason, AbandonedObject, SyncState};
use super::{with_timeout, SyncOrchestrator};
use crate::chunk::Chunk;
use crate::content::{CatalogEntry, ContentId};
use crate::resilience::retry::{retry, Attempted, RetryFailure};
use crate::transport::TransportError;

/// A verified object, ready to commit.
pub(super) struct FetchedObject {
    pub entry: CatalogEntry,
    pub chunks: Vec<Chunk>,
    pub chunks_fetched: u64,
    pub retries: usize,
}

pub(super) enum FetchOutcome {
    Complete(FetchedObject),
    Abandoned {
        abandoned: AbandonedObject,
        chunks_fetched: u64,
        retries: usize,
    },
}

impl SyncOrchestrator {
    #[tracing::instrument(skip(self, entry), fields(content_id = entry.id, size = entry.size))]
    pub(super) async fn fetch_object(&self, entry: CatalogEntry) -> FetchOutcome {
        let _ = self.state.send(SyncState::FetchingObject { content_id: entry.id });

        let retry_config = self.config.chunk_retry();
        let timeout = self.config.request_timeout();
        let mut progress = SyncProgress::new(&entry, self.codec.chunk_count(entry.size));
        let mut retries = 0;

        let abandon = |progress: &SyncProgress, attempts, reason, retries| FetchOutcome::Abandoned {
            abandoned: AbandonedObject {
                content_id: progress.content_id,
                attempts,
                reason,
            },
            chunks_fetched: progress.next_index,
            retries,
        };

        while !progress.is_finished() {
            let index = progress.next_index;
            let chunk = match retry("sync_chunk", &retry_config, || {
                self.request_chunk(entry.id, index, timeout)
            })
            .await
            {
                Ok(Attempted { value, retries: r }) => {
                    crate::metrics::record_chunk_fetch("ok");
                    retries += r;
                    value
                }
                Err(RetryFailure { attempts, error }) => {
                    crate::metrics::record_chunk_fetch(error.kind());
                    retries += attempts.saturating_sub(1);
                    let reason = match error {
                        TransportError::NotFound(_) => AbandonReason::NotFound,
                        other => AbandonReason::Transfer {
                            chunk_index: index,
                            error: other.to_string(),
                        },
                    };
                    return abandon(&progress, attempts, reason, retries);
                }
            };

            if let Err(reason) = progress.accept(chunk) {
                return abandon(&progress, 1, reason, retries);
            }
        }

        let chunks_fetched = progress.next_index;
        match progress.finish(&entry, self.config.verify_digests) {
            Ok(chunks) => {
                debug!(chunks = chunks.len(), retries, "Object fetched");
                FetchOutcome::Complete(FetchedObject {
                    entry,
                    chunks,
                    chunks_fetched,
                    retries,
                })
            }
            Err(reason) => FetchOutcome::Abandoned {
                abandoned: AbandonedObject {
                    content_id: entry.id,
                    attempts: 1,
                    reason,
                },
                chunks_fetched,
                retries,
            },
        }
    }

    /// One bounded request for `(content_id, index)`, checked and decoded.
    async fn request_chunk(
        &self,
        content_id: ContentId,
        index: u64,
        timeout: Duration,
    ) -> Result<Chunk, TransportError> {
        let wire = with_timeout(timeout, self.transport.fetch_chunk(content_id, index)).await?;
        if wire.content_id != content_id || wire.chunk_index != index {
            return Err(TransportError::Protocol(format!(
                "asked for chunk {} of content {}, got chunk {} of content {}",
                index, content_id, wire.chunk_index, wire.content_id
            )));
        }
        let chunk = self
            .codec
            .decode(&wire)
            .map_err(|e| TransportError::Protocol(e.to_string()))?;
        if chunk.is_empty() && !chunk.is_last {
            return Err(TransportError::Protocol(format!(
                "chunk {} of content {} is empty but more was promised",
                index, content_id
            )));
        }
        Ok(chunk)
    }
}
