//! Invariant assertions for allocator tests.

use allotment::{Allocator, Category, PoolAvailability, ResourceId, ResourceStatus};
use std::collections::HashSet;

/// Asserts the allocator's internal audit passes.
pub fn assert_integrity<C: Category>(allocator: &Allocator<C>) {
    if let Err(e) = allocator.verify_integrity() {
        panic!("allocator integrity violated: {e}");
    }
}

/// Asserts that every pool's status counts add up to its capacity, and that
/// the pools together hold the allocator's full capacity.
pub fn assert_conservation<C: Category>(allocator: &Allocator<C>) {
    let mut total = 0;
    for category in allocator.categories() {
        let PoolAvailability {
            free,
            reserved,
            occupied,
            capacity,
        } = allocator
            .availability(*category)
            .unwrap_or_else(|e| panic!("no availability for {category}: {e}"));
        assert_eq!(
            free + reserved + occupied,
            capacity,
            "pool {category} lost or duplicated resources"
        );
        total += capacity;
    }
    assert_eq!(total, allocator.capacity());
}

/// Asserts every resource is free and no token is live.
pub fn assert_all_free<C: Category>(allocator: &Allocator<C>) {
    for category in allocator.categories() {
        let availability = allocator
            .availability(*category)
            .unwrap_or_else(|e| panic!("no availability for {category}: {e}"));
        assert_eq!(
            availability.free, availability.capacity,
            "pool {category} still has resources in use"
        );
    }
    assert_eq!(allocator.live_reservations(), 0);
}

/// Asserts that no resource id appears twice in `granted`.
pub fn assert_no_double_grant(granted: &[ResourceId]) {
    let mut seen = HashSet::with_capacity(granted.len());
    for id in granted {
        assert!(seen.insert(*id), "resource {id} was granted twice");
    }
}

/// Asserts the status of one resource.
pub fn assert_status<C: Category>(allocator: &Allocator<C>, id: ResourceId, expected: ResourceStatus) {
    match allocator.status(id) {
        Ok(status) => assert_eq!(status, expected, "resource {id}"),
        Err(e) => panic!("status of {id} failed: {e}"),
    }
}
