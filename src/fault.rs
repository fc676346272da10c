// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Fault injection for outgoing chunk streams.
//!
//! Transports consult a [`FaultInjector`] once per chunk transfer: a `true`
//! from [`FaultInjector::maybe_fail`] drops that transfer, and
//! [`FaultInjector::transform`] rewrites the bytes that do get sent.
//!
//! # Example
//!
//! ```
//! use edge_sync::fault::{FaultInjector, TransferSimulator, Halve};
//!
//! // Never drops, never rewrites: deterministic tests
//! let reliable = TransferSimulator::reliable();
//! assert!(!reliable.maybe_fail());
//! assert_eq!(reliable.transform(vec![1, 2, 3, 4]), vec![1, 2, 3, 4]);
//!
//! // Lossy placeholder "compression"
//! let lossy = TransferSimulator::seeded(0.0, 7).with_transform(Halve);
//! assert_eq!(lossy.transform(vec![1, 2, 3, 4]), vec![1, 2]);
//! ```

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Pluggable fault-injection strategy consulted per chunk transfer.
pub trait FaultInjector: Send + Sync {
    /// Independent outcome per call. `true` means drop this transfer.
    fn maybe_fail(&self) -> bool;

    fn transform(&self, bytes: Vec<u8>) -> Vec<u8>;
}

/// Byte rewrite applied to each outgoing unit.
pub trait ChunkTransform: Send + Sync {
    fn apply(&self, bytes: Vec<u8>) -> Vec<u8>;
}

impl<F> ChunkTransform for F
where
    F: Fn(Vec<u8>) -> Vec<u8> + Send + Sync,
{
    fn apply(&self, bytes: Vec<u8>) -> Vec<u8> {
        self(bytes)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl ChunkTransform for Identity {
    fn apply(&self, bytes: Vec<u8>) -> Vec<u8> {
        bytes
    }
}

/// Keeps the first half of every unit. Lossy; stands in for compression.
#[derive(Debug, Clone, Copy, Default)]
pub struct Halve;

impl ChunkTransform for Halve {
    fn apply(&self, mut bytes: Vec<u8>) -> Vec<u8> {
        bytes.truncate(bytes.len() / 2);
        bytes
    }
}

/// Random drops at a fixed probability plus a swappable transform.
pub struct TransferSimulator {
    fail_probability: f64,
    rng: Mutex<StdRng>,
    transform: Box<dyn ChunkTransform>,
}

impl TransferSimulator {
    /// Drops with `fail_probability` (clamped to 0.0 - 1.0), identity transform.
    #[must_use]
    pub fn new(fail_probability: f64) -> Self {
        Self::from_rng(fail_probability, StdRng::from_entropy())
    }

    /// Same as [`new`](Self::new) with a reproducible drop sequence.
    #[must_use]
    pub fn seeded(fail_probability: f64, seed: u64) -> Self {
        Self::from_rng(fail_probability, StdRng::seed_from_u64(seed))
    }

    /// Never drops, never rewrites.
    #[must_use]
    pub fn reliable() -> Self {
        Self::seeded(0.0, 0)
    }

    fn from_rng(fail_probability: f64, rng: StdRng) -> Self {
        let fail_probability = if fail_probability.is_nan() {
            0.0
        } else {
            fail_probability.clamp(0.0, 1.0)
        };
        Self {
            fail_probability,
            rng: Mutex::new(rng),
            transform: Box::new(Identity),
        }
    }

    #[must_use]
    pub fn with_transform(mut self, transform: impl ChunkTransform + 'static) -> Self {
        self.transform = Box::new(transform);
        self
    }

    #[must_use]
    pub fn fail_probability(&self) -> f64 {
        self.fail_probability
    }
}

impl FaultInjector for TransferSimulator {
    fn maybe_fail(&self) -> bool {
        if self.fail_probability <= 0.0 {
            return false;
        }
        self.rng.lock().gen_bool(self.fail_probability)
    }

    fn transform(&self, bytes: Vec<u8>) -> Vec<u8> {
        self.transform.apply(bytes)
    }
}

impl std::fmt::Debug for TransferSimulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferSimulator")
            .field("fail_probability", &self.fail_probability)
            .finish_non_exhaustive()
    }
}
