// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use std::collections::{HashMap, VecDeque};

use crate::chunk::Chunk;
use crate::content::ContentId;

/// One user's cached objects.
///
/// `owned` is in first-insertion order: the head is the oldest object and
/// the next eviction candidate. `bytes_used` always equals the total chunk
/// bytes of every owned object, and `owned` mirrors the keys of `chunks`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    owned: VecDeque<ContentId>,
    chunks: HashMap<ContentId, Vec<Chunk>>,
    bytes_used: u64,
}

/// An object removed from the head of the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Removed {
    pub id: ContentId,
    pub bytes: u64,
}

fn chunk_bytes(chunks: &[Chunk]) -> u64 {
    chunks.iter().map(|c| c.len() as u64).sum()
}

impl CacheEntry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn bytes_used(&self) -> u64 {
        self.bytes_used
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.owned.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.owned.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: ContentId) -> bool {
        self.chunks.contains_key(&id)
    }

    /// Oldest first.
    #[must_use]
    pub fn owned_ids(&self) -> Vec<ContentId> {
        self.owned.iter().copied().collect()
    }

    #[must_use]
    pub fn chunks(&self, id: ContentId) -> Option<&[Chunk]> {
        self.chunks.get(&id).map(Vec::as_slice)
    }

    /// Recount bytes from the stored chunks.
    #[must_use]
    pub fn recomputed_bytes(&self) -> u64 {
        self.chunks.values().map(|c| chunk_bytes(c)).sum()
    }

    /// Both entry invariants hold.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.bytes_used == self.recomputed_bytes()
            && self.owned.len() == self.chunks.len()
            && self.owned.iter().all(|id| self.chunks.contains_key(id))
    }

    /// Store `chunks` under `id`. A new id goes to the tail; a known id keeps
    /// its position and has its old chunks replaced.
    ///
    /// `Err(released)` when the replaced object's chunks exceed the recorded
    /// usage; the entry is left untouched in that case.
    pub(crate) fn insert(&mut self, id: ContentId, chunks: Vec<Chunk>) -> Result<(), u64> {
        let added = chunk_bytes(&chunks);
        match self.chunks.get(&id) {
            Some(previous) => {
                let released = chunk_bytes(previous);
                let remaining = self.bytes_used.checked_sub(released).ok_or(released)?;
                self.bytes_used = remaining + added;
                self.chunks.insert(id, chunks);
            }
            None => {
                self.chunks.insert(id, chunks);
                self.owned.push_back(id);
                self.bytes_used += added;
            }
        }
        Ok(())
    }

    /// Remove the oldest object that is not `protected`.
    ///
    /// `Err(bytes)` when the removed object's chunks exceed the recorded
    /// usage; the entry is left with `bytes_used` untouched in that case.
    pub(crate) fn pop_oldest_except(
        &mut self,
        protected: Option<ContentId>,
    ) -> Option<Result<Removed, Removed>> {
        let position = self
            .owned
            .iter()
            .position(|id| Some(*id) != protected)?;
        let id = self.owned.remove(position)?;
        let bytes = self.chunks.remove(&id).map_or(0, |c| chunk_bytes(&c));

        let removed = Removed { id, bytes };
        match self.bytes_used.checked_sub(bytes) {
            Some(remaining) => {
                self.bytes_used = remaining;
                Some(Ok(removed))
            }
            None => Some(Err(removed)),
        }
    }

    #[cfg(test)]
    pub(crate) fn force_bytes_used(&mut self, bytes: u64) {
        self.bytes_used = bytes;
    }
}
