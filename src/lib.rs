// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! # Edge Sync
//!
//! Chunked content distribution from a central authority to bounded,
//! per-user edge caches.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Central Authority                       │
//! │  • ContentStore: immutable objects by id                   │
//! │  • ChunkCodec: fixed-size slices, base64 on the wire       │
//! │  • TransferSimulator: injected drops and transforms        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!               (catalog, /sync-chunk, /auth/sync)
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     SyncOrchestrator                        │
//! │  • Diffs central catalog against edge ownership            │
//! │  • Fetches chunk by chunk, retrying at the same index      │
//! │  • Abandons an object without failing the run              │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                    (commit complete objects)
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Edge Node                               │
//! │  • EdgeCache: per-user entries behind their own lock       │
//! │  • Oldest-first eviction under a byte ceiling              │
//! │  • Offline logins from a synced credential copy            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use edge_sync::{
//!     CentralService, ChunkCodec, ContentStore, CredentialStore, EdgeNode, SyncConfig,
//!     SyncOrchestrator,
//! };
//! use edge_sync::transport::LocalTransport;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let store = ContentStore::new();
//! store.ingest(1, "Video1.mp4", vec![0u8; 10 * 1024]).unwrap();
//!
//! let config = SyncConfig::default();
//! let central = CentralService::reliable(
//!     Arc::new(store),
//!     Arc::new(CredentialStore::with_users([("user1", "pass1")])),
//!     ChunkCodec::new(config.chunk_size),
//! );
//!
//! let edge = Arc::new(EdgeNode::from_config(&config));
//! let transport = Arc::new(LocalTransport::new(Arc::new(central)));
//! let orchestrator = SyncOrchestrator::new(transport, edge.clone(), config);
//!
//! let report = orchestrator.run_full("pool").await.unwrap();
//! assert_eq!(report.fetched, vec![1]);
//! assert!(edge.login("user1", "pass1").is_ok());
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`content`]: Central object store and catalog entries
//! - [`chunk`]: Splitting, reassembly and wire encoding
//! - [`cache`]: Per-user edge cache with byte accounting
//! - [`eviction`]: Oldest-first eviction policy
//! - [`coordinator`]: The [`SyncOrchestrator`] state machine
//! - [`transport`]: In-process and HTTP transports to central
//! - [`server`]: Axum routers for central and edge
//! - [`resilience`]: Retry with exponential backoff
//! - [`fault`]: Drop and transform injection

pub mod auth;
pub mod cache;
pub mod central;
pub mod chunk;
pub mod config;
pub mod content;
pub mod coordinator;
pub mod edge;
pub mod eviction;
pub mod fault;
pub mod metrics;
pub mod resilience;
pub mod server;
pub mod transport;

// Note: We don't expose a `tracing` module to avoid conflict with the tracing crate

pub use auth::{AuthError, CredentialStore, UserRecord};
pub use cache::{CacheEntry, CacheError, CacheUsage, EdgeCache, PutOutcome};
pub use central::CentralService;
pub use chunk::{Chunk, ChunkCodec, ChunkError, WireChunk};
pub use config::SyncConfig;
pub use content::{CatalogEntry, ContentError, ContentId, ContentObject, ContentStore};
pub use coordinator::{AbandonReason, AbandonedObject, SyncError, SyncOrchestrator, SyncReport, SyncState};
pub use edge::EdgeNode;
pub use eviction::{EvictionOutcome, OldestFirstEviction};
pub use fault::{FaultInjector, TransferSimulator};
pub use resilience::retry::RetryConfig;
pub use transport::{ChunkTransport, TransportError};
