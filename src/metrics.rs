// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for edge-sync.
//!
//! Uses the `metrics` crate for backend-agnostic metrics collection.
//! The host process is responsible for choosing the exporter (Prometheus, OTEL, etc.)
//!
//! # Metric Naming Convention
//! - `edge_sync_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//! - `_bytes` suffix for sizes
//!
//! # Labels
//! - `status`: ok, transient, abandoned, not_found
//! - `operation`: name passed to the retry helper
//! - `user`: cache owner

use metrics::{counter, gauge, histogram};
use std::time::Duration;

/// Record one chunk request and its outcome
pub fn record_chunk_fetch(status: &str) {
    counter!(
        "edge_sync_chunk_fetches_total",
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record bytes received for committed objects
pub fn record_bytes_synced(bytes: u64) {
    counter!("edge_sync_synced_bytes_total").increment(bytes);
}

/// Record a retry of a failed operation
pub fn record_retry(operation: &str) {
    counter!(
        "edge_sync_retries_total",
        "operation" => operation.to_string()
    )
    .increment(1);
}

/// Record an object given up on after its retry budget ran out
pub fn record_abandoned(reason: &str) {
    counter!(
        "edge_sync_objects_abandoned_total",
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// Record an object committed into an edge cache
pub fn record_object_synced() {
    counter!("edge_sync_objects_synced_total").increment(1);
}

/// Record eviction event
pub fn record_eviction(count: usize, bytes: u64) {
    counter!("edge_sync_evictions_total").increment(count as u64);
    counter!("edge_sync_evicted_bytes_total").increment(bytes);
}

/// Record a usage accounting inconsistency found during eviction
pub fn record_accounting_inconsistency(user: &str) {
    counter!(
        "edge_sync_accounting_inconsistencies_total",
        "user" => user.to_string()
    )
    .increment(1);
}

/// Set current cache usage for a user
pub fn set_cache_bytes(user: &str, bytes: u64) {
    gauge!(
        "edge_sync_cache_bytes",
        "user" => user.to_string()
    )
    .set(bytes as f64);
}

/// Record the wall time of one sync run
pub fn record_sync_latency(duration: Duration) {
    histogram!("edge_sync_run_seconds").record(duration.as_secs_f64());
}
