//! Allotment Benchmarks
//!
//! Performance benchmarks for the allotment allocator: the uncontended
//! reserve/confirm/release cycle, upgrade search across exhausted pools,
//! and contended reservation from many threads.

use allotment::{Allocator, Size};
use allotment_testing::SequentialTokenIds;

/// Builds a locker bank with `per_size` lockers in every size.
///
/// # Panics
///
/// Panics if `per_size` is zero or above the allowed pool capacity.
pub fn uniform_locker_bank(per_size: u32) -> Allocator<Size> {
    Size::ALL
        .into_iter()
        .fold(Allocator::builder(), |builder, size| builder.pool(size, per_size))
        .token_ids(SequentialTokenIds::new())
        .build()
        .expect("benchmark layout is valid")
}

/// Occupies every free resource in `size`, leaving its pool exhausted.
///
/// # Panics
///
/// Panics if `size` has no pool.
pub fn fill(allocator: &Allocator<Size>, size: Size) {
    let free = allocator
        .availability(size)
        .expect("benchmark size has a pool")
        .free;
    for token in allocator
        .reserve_many(size, free)
        .expect("free resources are reservable")
    {
        allocator.confirm(&token).expect("fresh token confirms");
    }
}
