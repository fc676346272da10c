// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use std::sync::Arc;

use async_trait::async_trait;

use super::{ChunkTransport, TransportError};
use crate::auth::UserRecord;
use crate::central::CentralService;
use crate::chunk::WireChunk;
use crate::content::{CatalogEntry, ContentId};

/// In-process transport straight into a [`CentralService`].
#[derive(Clone)]
pub struct LocalTransport {
    central: Arc<CentralService>,
}

impl LocalTransport {
    #[must_use]
    pub fn new(central: Arc<CentralService>) -> Self {
        Self { central }
    }
}

#[async_trait]
impl ChunkTransport for LocalTransport {
    async fn fetch_catalog(&self) -> Result<Vec<CatalogEntry>, TransportError> {
        Ok(self.central.catalog())
    }

    async fn fetch_chunk(&self, content_id: ContentId, chunk_index: u64) -> Result<WireChunk, TransportError> {
        self.central.sync_chunk(content_id, chunk_index)
    }

    async fn fetch_users(&self) -> Result<Vec<UserRecord>, TransportError> {
        Ok(self.central.user_snapshot())
    }
}
