//! Test support for `allotment`.
//!
//! - [`SequentialTokenIds`] and [`ManualClock`] replace the random id source
//!   and wall clock so tests are reproducible.
//! - [`fixtures`] builds the allocators the test suites share.
//! - [`assertions`] checks the allocator's invariants from the outside.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod assertions;
pub mod fixtures;

use allotment::{Clock, Timestamp, TokenId, TokenIdSource};
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub use assertions::*;
pub use fixtures::*;

/// Token ids `1, 2, 3, ...` encoded as UUIDs.
#[derive(Debug, Default)]
pub struct SequentialTokenIds {
    next: AtomicU64,
}

impl SequentialTokenIds {
    /// A source whose first id is 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// The id this source returns for its `n`th call, counting from 1.
    pub fn nth(n: u64) -> TokenId {
        TokenId::new(Uuid::from_u128(u128::from(n)))
    }
}

impl TokenIdSource for SequentialTokenIds {
    fn next_token_id(&self) -> TokenId {
        Self::nth(self.next.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same time, so a test can keep one handle and give another
/// to the allocator.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Timestamp>>,
}

impl ManualClock {
    /// A clock stopped at 2024-01-01T00:00:00Z.
    pub fn new() -> Self {
        let epoch = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single();
        Self::starting_at(epoch.map_or_else(Timestamp::now, Timestamp::new))
    }

    /// A clock stopped at `start`.
    pub fn starting_at(start: Timestamp) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now = now.saturating_add(by);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock()
    }
}

/// Installs a `tracing` subscriber honouring `RUST_LOG` for the current test
/// binary. Safe to call from every test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_ids_start_at_one() {
        let source = SequentialTokenIds::new();
        assert_eq!(source.next_token_id(), SequentialTokenIds::nth(1));
        assert_eq!(source.next_token_id(), SequentialTokenIds::nth(2));
    }

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new();
        let handle = clock.clone();
        let before = clock.now();

        handle.advance(Duration::from_secs(10));

        assert_eq!(clock.now(), before.saturating_add(Duration::from_secs(10)));
    }
}
