//! Shared allocator fixtures.

use crate::{ManualClock, SequentialTokenIds};
use allotment::{Allocator, AllocatorConfig, Category, Size};
use std::fmt;
use std::time::Duration;

/// Airline-style seat classes, for tests that need a second category type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SeatClass {
    /// Rank 1.
    Economy,
    /// Rank 2.
    Business,
    /// Rank 3.
    First,
}

impl Category for SeatClass {
    fn rank(self) -> u8 {
        match self {
            Self::Economy => 1,
            Self::Business => 2,
            Self::First => 3,
        }
    }
}

impl fmt::Display for SeatClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A locker bank with the given number of lockers per size and sequential
/// token ids. Sizes with a count of zero get no pool.
pub fn locker_bank(small: u32, medium: u32, large: u32, extra_large: u32) -> Allocator<Size> {
    let mut builder = Allocator::builder().token_ids(SequentialTokenIds::new());
    for (size, count) in [
        (Size::Small, small),
        (Size::Medium, medium),
        (Size::Large, large),
        (Size::ExtraLarge, extra_large),
    ] {
        if count > 0 {
            builder = builder.pool(size, count);
        }
    }
    builder.build().expect("fixture layout is valid")
}

/// A single pool of `count` small lockers.
pub fn small_lockers(count: u32) -> Allocator<Size> {
    locker_bank(count, 0, 0, 0)
}

/// A locker bank whose reservations expire after `ttl`, driven by the
/// returned manual clock.
pub fn expiring_lockers(small: u32, ttl: Duration) -> (Allocator<Size>, ManualClock) {
    let clock = ManualClock::new();
    let config = AllocatorConfig::default()
        .with_reservation_ttl(ttl)
        .expect("fixture ttl is valid");
    let allocator = Allocator::builder()
        .pool(Size::Small, small)
        .config(config)
        .token_ids(SequentialTokenIds::new())
        .clock(clock.clone())
        .build()
        .expect("fixture layout is valid");
    (allocator, clock)
}

/// A small cabin with the given number of seats per class. Classes with a
/// count of zero get no pool.
pub fn cabin(economy: u32, business: u32, first: u32) -> Allocator<SeatClass> {
    let mut builder = Allocator::builder().token_ids(SequentialTokenIds::new());
    for (class, count) in [
        (SeatClass::Economy, economy),
        (SeatClass::Business, business),
        (SeatClass::First, first),
    ] {
        if count > 0 {
            builder = builder.pool(class, count);
        }
    }
    builder.build().expect("fixture layout is valid")
}
