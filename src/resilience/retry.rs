// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Retry logic with exponential backoff.
//!
//! Only errors that report themselves as transient are retried. Anything
//! else (unknown content, bad credentials) fails on the first attempt.
//!
//! # Example
//!
//! ```
//! use edge_sync::RetryConfig;
//!
//! // Chunk transfer: a handful of attempts at the same index
//! let chunk = RetryConfig::chunk();
//! assert_eq!(chunk.max_retries, Some(5));
//!
//! // Catalog listing: quick retry, then fail
//! let catalog = RetryConfig::catalog();
//! assert_eq!(catalog.max_retries, Some(3));
//! ```

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// Classification used by [`retry`] to decide whether another attempt is allowed.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

/// Configuration for operation retry behavior.
///
/// `max_retries` counts total attempts. `None` retries forever and should
/// only be used for operations that are themselves bounded by a timeout.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub factor: f64,
    pub max_retries: Option<usize>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::chunk()
    }
}

impl RetryConfig {
    /// Retry for a single chunk index. 5 attempts, ~1.5s worst case of sleeping.
    #[must_use]
    pub fn chunk() -> Self {
        Self {
            max_retries: Some(5),
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(2),
            factor: 2.0,
        }
    }

    /// Quick retry for catalog and credential listings.
    #[must_use]
    pub fn catalog() -> Self {
        Self {
            max_retries: Some(3),
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
            factor: 2.0,
        }
    }

    /// Fast retry for tests (minimal delays)
    #[cfg(test)]
    pub fn test() -> Self {
        Self {
            max_retries: Some(3),
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(10),
            factor: 2.0,
        }
    }
}

/// Successful outcome plus the number of failed attempts that preceded it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempted<T> {
    pub value: T,
    pub retries: usize,
}

/// Last error seen, with the number of attempts made.
#[derive(Debug)]
pub struct RetryFailure<E> {
    pub attempts: usize,
    pub error: E,
}

pub async fn retry<F, Fut, T, E>(
    operation_name: &str,
    config: &RetryConfig,
    mut operation: F,
) -> Result<Attempted<T>, RetryFailure<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display + Transient,
{
    let mut delay = config.initial_delay;
    let mut attempts = 0;

    loop {
        match operation().await {
            Ok(value) => {
                if attempts > 0 {
                    info!("Operation '{}' succeeded after {} retries", operation_name, attempts);
                }
                return Ok(Attempted { value, retries: attempts });
            }
            Err(err) => {
                attempts += 1;

                if !err.is_transient() {
                    return Err(RetryFailure { attempts, error: err });
                }

                if let Some(max) = config.max_retries {
                    if attempts >= max {
                        warn!(
                            "Operation '{}' failed (attempt {}/{}): {}. Giving up",
                            operation_name, attempts, max, err
                        );
                        return Err(RetryFailure { attempts, error: err });
                    }
                    warn!(
                        "Operation '{}' failed (attempt {}/{}): {}. Retrying in {:?}...",
                        operation_name, attempts, max, err, delay
                    );
                } else {
                    warn!(
                        "Operation '{}' failed (attempt {}, will retry forever): {}. Next retry in {:?}...",
                        operation_name, attempts, err, delay
                    );
                }

                crate::metrics::record_retry(operation_name);
                sleep(delay).await;
                delay = (delay.mul_f64(config.factor)).min(config.max_delay);
            }
        }
    }
}
