// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Storage-ceiling enforcement for edge caches.
//!
//! # Policy
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                 Oldest-first whole-object eviction           │
//! ├──────────────────────────────────────────────────────────────┤
//! │  owned: [ oldest ─────────────────────────────── newest ]    │
//! │            ▲                                        ▲        │
//! │            └─ popped while bytes_used > limit       │        │
//! │                       never evicted by its own put ─┘        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Recency is first-insertion order. Reads never move an object, so this is
//! FIFO rather than LRU.
//!
//! The engine is invoked by [`crate::cache::EdgeCache::put`] with the
//! just-added object protected, and by [`crate::cache::EdgeCache::enforce`]
//! with nothing protected.

pub mod fifo;

pub use fifo::{EvictionOutcome, OldestFirstEviction};
