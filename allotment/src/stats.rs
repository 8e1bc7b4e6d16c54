//! Cumulative allocator counters.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A point-in-time copy of the allocator's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocatorStats {
    /// Successful reservations (one per minted token).
    pub reservations: u64,
    /// Reservations served from a larger category than requested.
    pub upgrades: u64,
    /// Requests rejected with `NoCapacity`.
    pub rejections: u64,
    /// Tokens confirmed.
    pub confirmations: u64,
    /// Tokens cancelled by a caller.
    pub cancellations: u64,
    /// Tokens cancelled by an expiry sweep.
    pub expirations: u64,
    /// Occupied resources released.
    pub releases: u64,
    /// Tokens rejected as unknown or already used.
    pub invalid_tokens: u64,
}

#[derive(Debug, Default)]
pub(crate) struct StatsRecorder {
    reservations: AtomicU64,
    upgrades: AtomicU64,
    rejections: AtomicU64,
    confirmations: AtomicU64,
    cancellations: AtomicU64,
    expirations: AtomicU64,
    releases: AtomicU64,
    invalid_tokens: AtomicU64,
}

impl StatsRecorder {
    pub(crate) fn reserved(&self, count: u64, upgraded: bool) {
        self.reservations.fetch_add(count, Ordering::Relaxed);
        if upgraded {
            self.upgrades.fetch_add(count, Ordering::Relaxed);
        }
    }

    pub(crate) fn rejected(&self) {
        self.rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn confirmed(&self) {
        self.confirmations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn cancelled(&self) {
        self.cancellations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn expired(&self, count: u64) {
        self.expirations.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn released(&self) {
        self.releases.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn invalid_token(&self) {
        self.invalid_tokens.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> AllocatorStats {
        AllocatorStats {
            reservations: self.reservations.load(Ordering::Relaxed),
            upgrades: self.upgrades.load(Ordering::Relaxed),
            rejections: self.rejections.load(Ordering::Relaxed),
            confirmations: self.confirmations.load(Ordering::Relaxed),
            cancellations: self.cancellations.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            releases: self.releases.load(Ordering::Relaxed),
            invalid_tokens: self.invalid_tokens.load(Ordering::Relaxed),
        }
    }
}
