// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use super::{CatalogEntry, ContentError, ContentId, ContentObject};

/// Append-only map from id to immutable object.
///
/// Listing is ordered by ascending id, which is the catalog order the
/// orchestrator fetches in.
pub struct ContentStore {
    objects: RwLock<BTreeMap<ContentId, Arc<ContentObject>>>,
}

impl ContentStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
        }
    }

    /// Build a store from pre-made objects. Later duplicates are rejected.
    pub fn with_objects(objects: impl IntoIterator<Item = ContentObject>) -> Result<Self, ContentError> {
        let store = Self::new();
        for object in objects {
            store.insert(object)?;
        }
        Ok(store)
    }

    pub fn ingest(
        &self,
        id: ContentId,
        title: impl Into<String>,
        payload: Vec<u8>,
    ) -> Result<Arc<ContentObject>, ContentError> {
        self.insert(ContentObject::new(id, title, payload))
    }

    fn insert(&self, object: ContentObject) -> Result<Arc<ContentObject>, ContentError> {
        let mut objects = self.objects.write();
        if objects.contains_key(&object.id) {
            return Err(ContentError::AlreadyExists(object.id));
        }
        let id = object.id;
        let size = object.total_size();
        let object = Arc::new(object);
        objects.insert(id, object.clone());
        info!(content_id = id, size, "Content ingested");
        Ok(object)
    }

    pub fn list(&self) -> Vec<CatalogEntry> {
        self.objects
            .read()
            .values()
            .map(|object| object.catalog_entry())
            .collect()
    }

    pub fn get(&self, id: ContentId) -> Result<Arc<ContentObject>, ContentError> {
        self.objects
            .read()
            .get(&id)
            .cloned()
            .ok_or(ContentError::NotFound(id))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }
}

impl Default for ContentStore {
    fn default() -> Self {
        Self::new()
    }
}
