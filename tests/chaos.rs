// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Chaos testing for the sync orchestrator.
//!
//! Failures are injected with transport wrappers:
//! 1. **FailingTransport** - errors at specific chunk call counts, or forever
//! 2. **PoisonedContent** - one object always fails, its siblings do not
//! 3. **HangingTransport** - chunk calls never answer, so only timeouts end them
//! 4. **TamperingTransport** - garbled, misnumbered or altered chunks
//! 5. **EmptyForeverTransport** - every chunk is empty yet promises more
//!
//! # Running Chaos Tests
//! ```bash
//! cargo test --test chaos -- --nocapture
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tokio::sync::watch;

use edge_sync::transport::LocalTransport;
use edge_sync::{
    AbandonReason, CatalogEntry, CentralService, ChunkCodec, ChunkTransport, ContentId, ContentStore,
    CredentialStore, EdgeNode, SyncConfig, SyncError, SyncOrchestrator, SyncState, TransportError,
    UserRecord, WireChunk,
};

const KB: usize = 1024;
const POOL: &str = "pool";

// =============================================================================
// Failing Transport Wrappers - Precise Error Injection
// =============================================================================

/// Injects failures into `fetch_chunk` at specific call counts.
pub struct FailingTransport<T: ChunkTransport> {
    inner: T,
    call_count: AtomicU64,
    /// Fail on these call numbers (1-indexed)
    fail_on_calls: Vec<u64>,
    error: TransportError,
    /// Whether to fail every call from the first listed one onwards
    fail_permanently: AtomicBool,
    /// Also fail the catalog listing
    fail_catalog: bool,
    /// Also fail the credential listing
    fail_users: bool,
}

impl<T: ChunkTransport> FailingTransport<T> {
    pub fn new(inner: T, fail_on_calls: Vec<u64>, error: TransportError) -> Self {
        Self {
            inner,
            call_count: AtomicU64::new(0),
            fail_on_calls,
            error,
            fail_permanently: AtomicBool::new(false),
            fail_catalog: false,
            fail_users: false,
        }
    }

    /// Create a transport that fails permanently after N chunk calls
    pub fn fail_after(inner: T, n: u64, error: TransportError) -> Self {
        let transport = Self::new(inner, vec![n + 1], error);
        transport.fail_permanently.store(true, Ordering::SeqCst);
        transport
    }

    /// Catalog and credential listings always fail
    pub fn failing_listings(inner: T, error: TransportError) -> Self {
        let mut transport = Self::new(inner, vec![], error);
        transport.fail_catalog = true;
        transport.fail_users = true;
        transport
    }

    /// Only the credential listing fails
    pub fn failing_users(inner: T, error: TransportError) -> Self {
        let mut transport = Self::new(inner, vec![], error);
        transport.fail_users = true;
        transport
    }

    pub fn calls(&self) -> u64 {
        self.call_count.load(Ordering::SeqCst)
    }

    fn should_fail(&self) -> bool {
        let count = self.call_count.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_permanently.load(Ordering::SeqCst) && !self.fail_on_calls.is_empty() {
            count >= self.fail_on_calls[0]
        } else {
            self.fail_on_calls.contains(&count)
        }
    }
}

#[async_trait]
impl<T: ChunkTransport> ChunkTransport for FailingTransport<T> {
    async fn fetch_catalog(&self) -> Result<Vec<CatalogEntry>, TransportError> {
        if self.fail_catalog {
            return Err(self.error.clone());
        }
        self.inner.fetch_catalog().await
    }

    async fn fetch_chunk(&self, content_id: ContentId, chunk_index: u64) -> Result<WireChunk, TransportError> {
        if self.should_fail() {
            return Err(self.error.clone());
        }
        self.inner.fetch_chunk(content_id, chunk_index).await
    }

    async fn fetch_users(&self) -> Result<Vec<UserRecord>, TransportError> {
        if self.fail_users {
            return Err(self.error.clone());
        }
        self.inner.fetch_users().await
    }
}

/// Every chunk request for one object fails with `error`.
pub struct PoisonedContent<T: ChunkTransport> {
    inner: T,
    poisoned: ContentId,
    error: TransportError,
}

#[async_trait]
impl<T: ChunkTransport> ChunkTransport for PoisonedContent<T> {
    async fn fetch_catalog(&self) -> Result<Vec<CatalogEntry>, TransportError> {
        self.inner.fetch_catalog().await
    }

    async fn fetch_chunk(&self, content_id: ContentId, chunk_index: u64) -> Result<WireChunk, TransportError> {
        if content_id == self.poisoned {
            return Err(self.error.clone());
        }
        self.inner.fetch_chunk(content_id, chunk_index).await
    }

    async fn fetch_users(&self) -> Result<Vec<UserRecord>, TransportError> {
        self.inner.fetch_users().await
    }
}

/// Chunk requests for one object never complete.
pub struct HangingTransport<T: ChunkTransport> {
    inner: T,
    hangs: ContentId,
}

#[async_trait]
impl<T: ChunkTransport> ChunkTransport for HangingTransport<T> {
    async fn fetch_catalog(&self) -> Result<Vec<CatalogEntry>, TransportError> {
        self.inner.fetch_catalog().await
    }

    async fn fetch_chunk(&self, content_id: ContentId, chunk_index: u64) -> Result<WireChunk, TransportError> {
        if content_id == self.hangs {
            std::future::pending::<()>().await;
        }
        self.inner.fetch_chunk(content_id, chunk_index).await
    }

    async fn fetch_users(&self) -> Result<Vec<UserRecord>, TransportError> {
        self.inner.fetch_users().await
    }
}

#[derive(Clone, Copy)]
enum Tamper {
    /// Invalid base64 on the first call
    GarbleOnce,
    /// Wrong chunk index echoed on the first call
    MisnumberOnce,
    /// Every chunk has its first byte flipped
    FlipAlways,
}

/// Alters responses from the inner transport.
pub struct TamperingTransport<T: ChunkTransport> {
    inner: T,
    mode: Tamper,
    tampered: AtomicBool,
}

impl<T: ChunkTransport> TamperingTransport<T> {
    fn new(inner: T, mode: Tamper) -> Self {
        Self {
            inner,
            mode,
            tampered: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl<T: ChunkTransport> ChunkTransport for TamperingTransport<T> {
    async fn fetch_catalog(&self) -> Result<Vec<CatalogEntry>, TransportError> {
        self.inner.fetch_catalog().await
    }

    async fn fetch_chunk(&self, content_id: ContentId, chunk_index: u64) -> Result<WireChunk, TransportError> {
        let mut wire = self.inner.fetch_chunk(content_id, chunk_index).await?;
        match self.mode {
            Tamper::GarbleOnce if !self.tampered.swap(true, Ordering::SeqCst) => {
                wire.data = "!!! not base64 !!!".into();
            }
            Tamper::MisnumberOnce if !self.tampered.swap(true, Ordering::SeqCst) => {
                wire.chunk_index += 1;
            }
            Tamper::FlipAlways if !wire.data.is_empty() => {
                let mut bytes = STANDARD.decode(&wire.data).unwrap();
                bytes[0] ^= 0xFF;
                wire.data = STANDARD.encode(bytes);
            }
            _ => {}
        }
        Ok(wire)
    }

    async fn fetch_users(&self) -> Result<Vec<UserRecord>, TransportError> {
        self.inner.fetch_users().await
    }
}

/// Answers every chunk request with no data and `more = true`.
pub struct EmptyForeverTransport<T: ChunkTransport> {
    inner: T,
    call_count: AtomicU64,
}

#[async_trait]
impl<T: ChunkTransport> ChunkTransport for EmptyForeverTransport<T> {
    async fn fetch_catalog(&self) -> Result<Vec<CatalogEntry>, TransportError> {
        self.inner.fetch_catalog().await
    }

    async fn fetch_chunk(&self, content_id: ContentId, chunk_index: u64) -> Result<WireChunk, TransportError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        Ok(WireChunk {
            content_id,
            chunk_index,
            data: String::new(),
            more: true,
        })
    }

    async fn fetch_users(&self) -> Result<Vec<UserRecord>, TransportError> {
        self.inner.fetch_users().await
    }
}

/// Flips a cancel flag once `after` chunk calls have been made.
pub struct CancellingTransport<T: ChunkTransport> {
    inner: T,
    call_count: AtomicU64,
    after: u64,
    cancel: watch::Sender<bool>,
}

#[async_trait]
impl<T: ChunkTransport> ChunkTransport for CancellingTransport<T> {
    async fn fetch_catalog(&self) -> Result<Vec<CatalogEntry>, TransportError> {
        self.inner.fetch_catalog().await
    }

    async fn fetch_chunk(&self, content_id: ContentId, chunk_index: u64) -> Result<WireChunk, TransportError> {
        let count = self.call_count.fetch_add(1, Ordering::SeqCst) + 1;
        if count == self.after {
            let _ = self.cancel.send(true);
        }
        self.inner.fetch_chunk(content_id, chunk_index).await
    }

    async fn fetch_users(&self) -> Result<Vec<UserRecord>, TransportError> {
        self.inner.fetch_users().await
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn config() -> SyncConfig {
    SyncConfig {
        retry_initial_delay_ms: 1,
        retry_max_delay_ms: 5,
        request_timeout_ms: 200,
        chunk_max_attempts: 4,
        max_concurrent_fetches: 1,
        ..Default::default()
    }
}

/// Central with 1 (2500 bytes), 2 (5 KB) and 3 (3 KB).
fn local_central() -> LocalTransport {
    let store = ContentStore::new();
    store.ingest(1, "Video1.mp4", vec![b'1'; 2500]).unwrap();
    store.ingest(2, "Video2.mp4", vec![b'2'; 5 * KB]).unwrap();
    store.ingest(3, "Video3.mp4", (0..3 * KB).map(|i| (i % 7) as u8).collect()).unwrap();
    let central = CentralService::reliable(
        Arc::new(store),
        Arc::new(CredentialStore::with_users([("user1", "pass1")])),
        ChunkCodec::new(KB),
    );
    LocalTransport::new(Arc::new(central))
}

fn orchestrator(transport: impl ChunkTransport + 'static, config: SyncConfig) -> SyncOrchestrator {
    let edge = Arc::new(EdgeNode::from_config(&config));
    SyncOrchestrator::new(Arc::new(transport), edge, config)
}

fn assert_nothing_partial(orchestrator: &SyncOrchestrator) {
    let cache = orchestrator.edge().cache();
    let snapshot = cache.snapshot(POOL);
    assert!(snapshot.is_consistent(), "byte accounting drifted");
    for id in cache.owned_ids(POOL) {
        let expected = match id {
            1 => 2500,
            2 => 5 * KB,
            3 => 3 * KB,
            other => panic!("unexpected id {}", other),
        };
        assert_eq!(orchestrator.edge().read_content(POOL, id).unwrap().len(), expected);
    }
}

// =============================================================================
// Chaos Tests
// =============================================================================

#[tokio::test]
async fn chaos_failures_at_specific_calls_are_retried_at_same_index() {
    let transport = FailingTransport::new(
        local_central(),
        vec![1, 2, 5],
        TransportError::Transient("connection reset".into()),
    );
    let orchestrator = orchestrator(transport, config());

    let report = orchestrator.run(POOL).await.unwrap();

    assert_eq!(report.fetched, vec![1, 2, 3]);
    assert_eq!(report.retries, 3);
    assert!(report.abandoned.is_empty());
    assert_nothing_partial(&orchestrator);
}

#[tokio::test]
async fn chaos_permanent_failure_abandons_within_bound() {
    // Object 1 needs 3 calls; everything after fails
    let transport = FailingTransport::fail_after(
        local_central(),
        3,
        TransportError::Transient("link down".into()),
    );
    let orchestrator = orchestrator(transport, config());

    let report = orchestrator.run(POOL).await.unwrap();

    assert_eq!(report.fetched, vec![1]);
    let abandoned: Vec<_> = report.abandoned.iter().map(|a| a.content_id).collect();
    assert_eq!(abandoned, vec![2, 3]);
    assert!(report.abandoned.iter().all(|a| a.attempts == 4));
    assert_eq!(orchestrator.edge().cache().owned_ids(POOL), vec![1]);
    assert_nothing_partial(&orchestrator);
}

#[tokio::test]
async fn chaos_abandoned_object_does_not_abort_siblings() {
    let transport = PoisonedContent {
        inner: local_central(),
        poisoned: 2,
        error: TransportError::Transient("simulated drop".into()),
    };
    let config = SyncConfig {
        max_concurrent_fetches: 3,
        ..config()
    };
    let orchestrator = orchestrator(transport, config);

    let report = orchestrator.run(POOL).await.unwrap();

    assert_eq!(report.fetched, vec![1, 3]);
    assert_eq!(report.abandoned.len(), 1);
    let abandoned = &report.abandoned[0];
    assert_eq!(abandoned.content_id, 2);
    assert_eq!(abandoned.attempts, 4);
    assert!(matches!(abandoned.reason, AbandonReason::Transfer { chunk_index: 0, .. }));

    let errors = report.errors();
    assert!(matches!(errors[0], SyncError::ObjectSyncAbandoned { content_id: 2, attempts: 4, .. }));
    assert!(!orchestrator.edge().owns(POOL, 2));
}

#[tokio::test]
async fn chaos_vanished_content_is_not_retried() {
    let transport = PoisonedContent {
        inner: local_central(),
        poisoned: 3,
        error: TransportError::NotFound(3),
    };
    let orchestrator = orchestrator(transport, config());

    let report = orchestrator.run(POOL).await.unwrap();

    assert_eq!(report.fetched, vec![1, 2]);
    assert_eq!(report.abandoned[0].attempts, 1);
    assert_eq!(report.abandoned[0].reason, AbandonReason::NotFound);
}

#[tokio::test(start_paused = true)]
async fn chaos_hanging_chunk_requests_time_out() {
    let transport = HangingTransport {
        inner: local_central(),
        hangs: 1,
    };
    let orchestrator = orchestrator(transport, config());

    let report = orchestrator.run(POOL).await.unwrap();

    assert_eq!(report.fetched, vec![2, 3]);
    let abandoned = &report.abandoned[0];
    assert_eq!(abandoned.content_id, 1);
    assert_eq!(abandoned.attempts, 4);
    match &abandoned.reason {
        AbandonReason::Transfer { error, .. } => assert!(error.contains("timed out"), "{}", error),
        other => panic!("unexpected reason {:?}", other),
    }
    assert_eq!(orchestrator.state(), SyncState::Idle);
}

#[tokio::test]
async fn chaos_catalog_failure_fails_the_run() {
    let transport = FailingTransport::failing_listings(
        local_central(),
        TransportError::Transient("central unreachable".into()),
    );
    let orchestrator = orchestrator(transport, config());

    let err = orchestrator.run(POOL).await.unwrap_err();

    assert!(matches!(err, SyncError::Catalog(TransportError::Transient(_))));
    assert_eq!(orchestrator.state(), SyncState::Idle);
    assert!(orchestrator.edge().cache().owned_ids(POOL).is_empty());
}

#[tokio::test]
async fn chaos_credential_failure_does_not_block_content() {
    let transport = FailingTransport::failing_users(local_central(), TransportError::InvalidCredentials);
    let orchestrator = orchestrator(transport, config());

    assert!(matches!(
        orchestrator.sync_users().await,
        Err(SyncError::Catalog(TransportError::InvalidCredentials))
    ));

    let report = orchestrator.run_full(POOL).await.unwrap();
    assert_eq!(report.fetched, vec![1, 2, 3]);
    assert!(orchestrator.edge().login("user1", "pass1").is_err());
}

#[tokio::test]
async fn chaos_garbled_chunk_is_retried() {
    let transport = TamperingTransport::new(local_central(), Tamper::GarbleOnce);
    let orchestrator = orchestrator(transport, config());

    let report = orchestrator.run(POOL).await.unwrap();

    assert_eq!(report.fetched, vec![1, 2, 3]);
    assert_eq!(report.retries, 1);
    assert_nothing_partial(&orchestrator);
}

#[tokio::test]
async fn chaos_misnumbered_chunk_is_retried() {
    let transport = TamperingTransport::new(local_central(), Tamper::MisnumberOnce);
    let orchestrator = orchestrator(transport, config());

    let report = orchestrator.run(POOL).await.unwrap();

    assert_eq!(report.fetched, vec![1, 2, 3]);
    assert_eq!(report.retries, 1);
}

#[tokio::test]
async fn chaos_altered_content_is_never_committed() {
    let transport = TamperingTransport::new(local_central(), Tamper::FlipAlways);
    let orchestrator = orchestrator(transport, config());

    let report = orchestrator.run(POOL).await.unwrap();

    assert!(report.fetched.is_empty());
    assert_eq!(report.abandoned.len(), 3);
    assert!(report
        .abandoned
        .iter()
        .all(|a| matches!(a.reason, AbandonReason::DigestMismatch { .. })));
    assert!(orchestrator.edge().cache().owned_ids(POOL).is_empty());
}

#[tokio::test]
async fn chaos_cancel_between_objects() {
    let (cancel_tx, cancel_rx) = watch::channel(false);
    // Object 1 takes 3 chunk calls; cancel lands on its last one
    let transport = CancellingTransport {
        inner: local_central(),
        call_count: AtomicU64::new(0),
        after: 3,
        cancel: cancel_tx,
    };
    let orchestrator = orchestrator(transport, config());

    let report = orchestrator.run_with_cancel(POOL, cancel_rx).await.unwrap();

    assert!(report.cancelled);
    assert_eq!(report.fetched, vec![1]);
    assert_eq!(orchestrator.edge().cache().owned_ids(POOL), vec![1]);
    assert_nothing_partial(&orchestrator);
}

#[tokio::test]
async fn chaos_retry_count_is_bounded_per_chunk() {
    let transport = Arc::new(FailingTransport::fail_after(
        local_central(),
        0,
        TransportError::Timeout(std::time::Duration::from_millis(1)),
    ));
    let config = SyncConfig {
        chunk_max_attempts: 2,
        ..config()
    };
    let edge = Arc::new(EdgeNode::from_config(&config));
    let orchestrator = SyncOrchestrator::new(transport.clone(), edge, config);

    let report = orchestrator.run(POOL).await.unwrap();

    // Three objects, two attempts each at chunk 0
    assert_eq!(report.abandoned.len(), 3);
    assert_eq!(transport.calls(), 6);
}

#[tokio::test]
async fn chaos_empty_chunks_promising_more_terminate() {
    let transport = Arc::new(EmptyForeverTransport {
        inner: local_central(),
        call_count: AtomicU64::new(0),
    });
    let config = config();
    let edge = Arc::new(EdgeNode::from_config(&config));
    let orchestrator = SyncOrchestrator::new(transport.clone(), edge, config);

    let report = tokio::time::timeout(std::time::Duration::from_secs(5), orchestrator.run(POOL))
        .await
        .expect("sync run never terminated")
        .unwrap();

    // Rejected at chunk 0 every time, four attempts per object
    assert!(report.fetched.is_empty());
    assert_eq!(report.abandoned.len(), 3);
    for abandoned in &report.abandoned {
        assert_eq!(abandoned.attempts, 4);
        match &abandoned.reason {
            AbandonReason::Transfer { chunk_index, error } => {
                assert_eq!(*chunk_index, 0);
                assert!(error.contains("empty"), "{}", error);
            }
            other => panic!("unexpected reason {:?}", other),
        }
    }
    assert_eq!(transport.call_count.load(Ordering::SeqCst), 12);
    assert!(orchestrator.edge().cache().owned_ids(POOL).is_empty());
    assert_eq!(orchestrator.state(), SyncState::Idle);
}
