// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Edge node host service.
//!
//! Owns the edge's cache, its copy of the credential directory, and the
//! metadata of what has been synced. Everything that changes edge state from
//! outside goes through the administrative calls
//! [`EdgeNode::apply_user_update`] and [`EdgeNode::apply_content_update`].

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::auth::{AuthError, CredentialStore, UserRecord};
use crate::cache::{CacheError, EdgeCache, PutOutcome};
use crate::chunk::Chunk;
use crate::config::SyncConfig;
use crate::content::{CatalogEntry, ContentError, ContentId};

pub struct EdgeNode {
    cache: Arc<EdgeCache>,
    users: Arc<CredentialStore>,
    metadata: DashMap<ContentId, CatalogEntry>,
}

impl EdgeNode {
    pub fn new(cache: Arc<EdgeCache>, users: Arc<CredentialStore>) -> Self {
        Self {
            cache,
            users,
            metadata: DashMap::new(),
        }
    }

    /// Empty edge sized from `config`.
    #[must_use]
    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(
            Arc::new(EdgeCache::from_config(config)),
            Arc::new(CredentialStore::new()),
        )
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<EdgeCache> {
        &self.cache
    }

    #[must_use]
    pub fn users(&self) -> &Arc<CredentialStore> {
        &self.users
    }

    pub fn login(&self, username: &str, password: &str) -> Result<String, AuthError> {
        self.users.login(username, password)
    }

    /// Replace-or-add every user in the snapshot.
    pub fn apply_user_update(&self, users: Vec<UserRecord>) -> usize {
        self.users.apply(users)
    }

    /// Commit a fully assembled object for `user`.
    pub fn apply_content_update(
        &self,
        user: &str,
        entry: &CatalogEntry,
        chunks: Vec<Chunk>,
    ) -> Result<PutOutcome, CacheError> {
        self.metadata.insert(entry.id, entry.clone());
        let outcome = self.cache.put(user, entry.id, chunks)?;
        debug!(user = %user, content_id = entry.id, evicted = outcome.evicted.len(), "Content committed to edge");
        Ok(outcome)
    }

    #[must_use]
    pub fn owns(&self, user: &str, id: ContentId) -> bool {
        self.cache.has(user, id)
    }

    /// What `user` currently holds at this edge, oldest first.
    #[must_use]
    pub fn owned_catalog(&self, user: &str) -> Vec<CatalogEntry> {
        self.cache
            .owned_ids(user)
            .into_iter()
            .map(|id| match self.metadata.get(&id) {
                Some(entry) => entry.value().clone(),
                None => CatalogEntry {
                    id,
                    title: format!("Content {}", id),
                    size: self.read_content(user, id).map_or(0, |b| b.len() as u64),
                    sha256: None,
                },
            })
            .collect()
    }

    /// Assembled bytes of a cached object.
    pub fn read_content(&self, user: &str, id: ContentId) -> Result<Vec<u8>, ContentError> {
        let chunks = self.cache.get(user, id).ok_or(ContentError::NotFound(id))?;
        Ok(chunks.into_iter().flat_map(|c| c.bytes).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkCodec;
    use crate::content::ContentObject;

    fn edge(limit: u64) -> EdgeNode {
        EdgeNode::new(
            Arc::new(EdgeCache::new(limit)),
            Arc::new(CredentialStore::with_users([("user1", "pass1")])),
        )
    }

    fn commit(edge: &EdgeNode, user: &str, object: &ContentObject) -> PutOutcome {
        let chunks = ChunkCodec::new(1024).chunks(object).collect();
        edge.apply_content_update(user, &object.catalog_entry(), chunks).unwrap()
    }

    #[test]
    fn test_content_update_is_listed_and_readable() {
        let edge = edge(1 << 20);
        let object = ContentObject::new(1, "Video1.mp4", vec![b'x'; 10 * 1024]);
        commit(&edge, "pool", &object);

        let catalog = edge.owned_catalog("pool");
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog[0].title, "Video1.mp4");
        assert_eq!(catalog[0].size, 10 * 1024);
        assert_eq!(edge.read_content("pool", 1).unwrap(), object.payload);
        assert_eq!(edge.read_content("pool", 2).unwrap_err(), ContentError::NotFound(2));
    }

    #[test]
    fn test_evicted_content_disappears_from_listing() {
        let edge = edge(12 * 1024);
        commit(&edge, "pool", &ContentObject::new(1, "A", vec![0; 10 * 1024]));
        let outcome = commit(&edge, "pool", &ContentObject::new(2, "B", vec![0; 5 * 1024]));

        assert_eq!(outcome.evicted, vec![1]);
        let ids: Vec<_> = edge.owned_catalog("pool").iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![2]);
    }

    #[test]
    fn test_user_update_enables_login() {
        let edge = edge(1024);
        assert!(edge.login("user2", "pass2").is_err());

        edge.apply_user_update(vec![UserRecord {
            username: "user2".into(),
            password: "pass2".into(),
        }]);
        assert!(edge.login("user2", "pass2").is_ok());
    }
}
