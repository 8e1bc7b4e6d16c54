//! Time source used to stamp and expire reservations.

use crate::types::Timestamp;

/// Supplies the current time to an allocator.
///
/// Read before any pool lock is taken; an implementation may query the
/// allocator it serves.
pub trait Clock: Send + Sync {
    /// The current moment.
    fn now(&self) -> Timestamp;
}

/// Wall-clock time in UTC. The default clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}
