// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! The central authority's request handling, independent of framing.
//!
//! Both the HTTP router and [`crate::transport::LocalTransport`] call into
//! [`CentralService`], so the in-process and networked paths answer
//! identically, simulated drops included.

use std::io;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::auth::{AuthError, CredentialStore, UserRecord};
use crate::chunk::{ChunkCodec, WireChunk};
use crate::content::{CatalogEntry, ContentId, ContentObject, ContentStore};
use crate::fault::{FaultInjector, TransferSimulator};
use crate::transport::TransportError;

pub struct CentralService {
    store: Arc<ContentStore>,
    users: Arc<CredentialStore>,
    codec: ChunkCodec,
    faults: Arc<dyn FaultInjector>,
}

impl CentralService {
    pub fn new(
        store: Arc<ContentStore>,
        users: Arc<CredentialStore>,
        codec: ChunkCodec,
        faults: Arc<dyn FaultInjector>,
    ) -> Self {
        Self {
            store,
            users,
            codec,
            faults,
        }
    }

    /// No drops, no transform.
    pub fn reliable(store: Arc<ContentStore>, users: Arc<CredentialStore>, codec: ChunkCodec) -> Self {
        Self::new(store, users, codec, Arc::new(TransferSimulator::reliable()))
    }

    #[must_use]
    pub fn store(&self) -> &Arc<ContentStore> {
        &self.store
    }

    #[must_use]
    pub fn codec(&self) -> ChunkCodec {
        self.codec
    }

    pub fn login(&self, username: &str, password: &str) -> Result<String, AuthError> {
        self.users.login(username, password)
    }

    #[must_use]
    pub fn catalog(&self) -> Vec<CatalogEntry> {
        self.store.list()
    }

    #[must_use]
    pub fn user_snapshot(&self) -> Vec<UserRecord> {
        self.users.snapshot()
    }

    /// Answer one chunk request, subject to a simulated drop.
    pub fn sync_chunk(&self, content_id: ContentId, chunk_index: u64) -> Result<WireChunk, TransportError> {
        let object = self.object(content_id)?;
        if self.faults.maybe_fail() {
            warn!(content_id, chunk_index, "Simulated drop on chunk transfer");
            return Err(TransportError::Transient("simulated drop".into()));
        }
        let wire = self.codec.wire_chunk_at(&object, chunk_index);
        debug!(content_id, chunk_index, more = wire.more, "Served chunk");
        Ok(wire)
    }

    /// Stream of transformed chunk units for `/download/{id}`.
    pub fn download(&self, content_id: ContentId) -> Result<DownloadUnits, TransportError> {
        let object = self.object(content_id)?;
        Ok(DownloadUnits {
            object,
            codec: self.codec,
            faults: self.faults.clone(),
            next: 0,
            aborted: false,
        })
    }

    fn object(&self, content_id: ContentId) -> Result<Arc<ContentObject>, TransportError> {
        Ok(self.store.get(content_id)?)
    }
}

/// Lazily produced download units. Each unit is `transform(chunk)`; a
/// simulated drop yields one error and ends the stream.
pub struct DownloadUnits {
    object: Arc<ContentObject>,
    codec: ChunkCodec,
    faults: Arc<dyn FaultInjector>,
    next: u64,
    aborted: bool,
}

impl Iterator for DownloadUnits {
    type Item = Result<Vec<u8>, io::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.aborted {
            return None;
        }
        let chunk = self.codec.chunk_at(&self.object, self.next).ok()?;
        self.next += 1;

        let unit = self.faults.transform(chunk.bytes);
        if self.faults.maybe_fail() {
            warn!(content_id = self.object.id, chunk_index = chunk.index, "Simulated drop, aborting download");
            self.aborted = true;
            return Some(Err(io::Error::new(io::ErrorKind::ConnectionAborted, "simulated drop")));
        }
        Some(Ok(unit))
    }
}
