// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Configuration for edge synchronization.
//!
//! # Example
//!
//! ```
//! use edge_sync::SyncConfig;
//!
//! // Minimal config (uses defaults)
//! let config = SyncConfig::default();
//! assert_eq!(config.chunk_size, 1024);
//! assert_eq!(config.usage_limit_bytes, 10 * 1024 * 1024 * 1024); // 10 GiB
//!
//! // Tight budget for a small edge box
//! let config = SyncConfig {
//!     usage_limit_bytes: 12 * 1024,
//!     max_concurrent_fetches: 1,
//!     ..Default::default()
//! };
//! assert_eq!(config.usage_limit_bytes, 12 * 1024);
//! ```

use std::time::Duration;

use serde::Deserialize;

use crate::resilience::retry::RetryConfig;

/// Configuration for the sync orchestrator, chunk codec and edge cache.
///
/// Fixed for the lifetime of the instances built from it.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Bytes per chunk (default: 1024)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Per-user storage ceiling in bytes (default: 10 GiB)
    #[serde(default = "default_usage_limit_bytes")]
    pub usage_limit_bytes: u64,

    /// Attempts per chunk index before the object is abandoned
    #[serde(default = "default_chunk_max_attempts")]
    pub chunk_max_attempts: usize,

    /// Backoff between attempts
    #[serde(default = "default_retry_initial_delay_ms")]
    pub retry_initial_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,

    /// Timeout for every network-facing call
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Objects fetched in parallel during one run
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,

    /// Probability of a simulated drop per chunk transfer (0.0 - 1.0)
    #[serde(default = "default_fail_probability")]
    pub fail_probability: f64,

    /// Verify the catalog sha256 digest of reassembled objects
    #[serde(default = "default_verify_digests")]
    pub verify_digests: bool,
}

fn default_chunk_size() -> usize { 1024 }
fn default_usage_limit_bytes() -> u64 { 10 * 1024 * 1024 * 1024 } // 10 GiB
fn default_chunk_max_attempts() -> usize { 5 }
fn default_retry_initial_delay_ms() -> u64 { 50 }
fn default_retry_max_delay_ms() -> u64 { 2000 }
fn default_request_timeout_ms() -> u64 { 5000 }
fn default_max_concurrent_fetches() -> usize { 4 }
fn default_fail_probability() -> f64 { 0.2 }
fn default_verify_digests() -> bool { true }

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            usage_limit_bytes: default_usage_limit_bytes(),
            chunk_max_attempts: default_chunk_max_attempts(),
            retry_initial_delay_ms: default_retry_initial_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            fail_probability: default_fail_probability(),
            verify_digests: default_verify_digests(),
        }
    }
}

impl SyncConfig {
    /// Parse a JSON config document. Missing fields take their defaults.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Retry policy for a single chunk index.
    #[must_use]
    pub fn chunk_retry(&self) -> RetryConfig {
        RetryConfig {
            max_retries: Some(self.chunk_max_attempts.max(1)),
            initial_delay: Duration::from_millis(self.retry_initial_delay_ms),
            max_delay: Duration::from_millis(self.retry_max_delay_ms),
            factor: 2.0,
        }
    }

    /// Retry policy for catalog and credential listings: the catalog preset's
    /// attempt count with this config's backoff.
    #[must_use]
    pub fn listing_retry(&self) -> RetryConfig {
        RetryConfig {
            initial_delay: Duration::from_millis(self.retry_initial_delay_ms),
            max_delay: Duration::from_millis(self.retry_max_delay_ms),
            ..RetryConfig::catalog()
        }
    }
}
