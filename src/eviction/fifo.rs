// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use tracing::{debug, error};

use crate::cache::{CacheEntry, CacheError};
use crate::content::ContentId;

/// What one enforcement pass removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvictionOutcome {
    /// Oldest first
    pub evicted: Vec<ContentId>,
    pub freed_bytes: u64,
}

/// Whole-object, oldest-first eviction against a fixed ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OldestFirstEviction {
    usage_limit: u64,
}

impl OldestFirstEviction {
    #[must_use]
    pub fn new(usage_limit: u64) -> Self {
        Self { usage_limit }
    }

    #[must_use]
    pub fn usage_limit(&self) -> u64 {
        self.usage_limit
    }

    /// Pop objects off the head of `entry` until it fits under the ceiling.
    ///
    /// `protected` is never evicted. When it alone exceeds the ceiling every
    /// other object goes and `bytes_used` stays above the limit.
    pub fn enforce(
        &self,
        user: &str,
        entry: &mut CacheEntry,
        protected: Option<ContentId>,
    ) -> Result<EvictionOutcome, CacheError> {
        let mut outcome = EvictionOutcome::default();

        while entry.bytes_used() > self.usage_limit {
            match entry.pop_oldest_except(protected) {
                Some(Ok(removed)) => {
                    debug!(
                        user = %user,
                        content_id = removed.id,
                        bytes = removed.bytes,
                        "Evicted cached object"
                    );
                    outcome.evicted.push(removed.id);
                    outcome.freed_bytes += removed.bytes;
                }
                Some(Err(removed)) => {
                    outcome.evicted.push(removed.id);
                    return Err(self.inconsistency(user, entry));
                }
                None => break,
            }
        }

        if entry.is_empty() && entry.bytes_used() > 0 {
            return Err(self.inconsistency(user, entry));
        }

        if !outcome.evicted.is_empty() {
            crate::metrics::record_eviction(outcome.evicted.len(), outcome.freed_bytes);
        }
        Ok(outcome)
    }

    /// Log and count an accounting drift, and build the error for it.
    pub(crate) fn inconsistency(&self, user: &str, entry: &CacheEntry) -> CacheError {
        error!(
            user = %user,
            bytes_used = entry.bytes_used(),
            owned = entry.len(),
            "Usage accounting inconsistency, halting eviction"
        );
        crate::metrics::record_accounting_inconsistency(user);
        CacheError::UsageAccountingInconsistency {
            user: user.to_string(),
            bytes_used: entry.bytes_used(),
            owned: entry.len(),
        }
    }
}
