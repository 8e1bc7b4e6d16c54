//! Per-category resource pool.
//!
//! A [`ResourcePool`] tracks the status of every resource in one category. It
//! keeps one ordered bucket per status so that "find a free resource" never
//! scans occupied entries, and it always hands out the lowest free id so
//! allocation order is deterministic.
//!
//! The pool itself is not synchronized. The [`Allocator`](crate::Allocator)
//! owns each pool behind its own lock.

use crate::category::Category;
use crate::errors::PoolError;
use crate::status::ResourceStatus;
use crate::types::ResourceId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Per-status counts for one pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolAvailability {
    /// Resources that can be reserved right now.
    pub free: usize,
    /// Resources held by a live token.
    pub reserved: usize,
    /// Resources confirmed and in use.
    pub occupied: usize,
    /// Fixed number of resources in the pool.
    pub capacity: usize,
}

/// The resources of a single category, partitioned by status.
#[derive(Debug, Clone)]
pub struct ResourcePool<C: Category> {
    category: C,
    statuses: BTreeMap<ResourceId, ResourceStatus>,
    buckets: [BTreeSet<ResourceId>; 3],
}

impl<C: Category> ResourcePool<C> {
    /// Creates a pool whose resources all start out free.
    pub fn new(category: C, ids: impl IntoIterator<Item = ResourceId>) -> Self {
        let free: BTreeSet<ResourceId> = ids.into_iter().collect();
        let statuses = free.iter().map(|id| (*id, ResourceStatus::Free)).collect();

        Self {
            category,
            statuses,
            buckets: [free, BTreeSet::new(), BTreeSet::new()],
        }
    }

    /// The category every resource in this pool belongs to.
    pub const fn category(&self) -> C {
        self.category
    }

    /// Total number of resources, regardless of status.
    pub fn capacity(&self) -> usize {
        self.statuses.len()
    }

    /// Returns true if `id` belongs to this pool.
    pub fn contains(&self, id: ResourceId) -> bool {
        self.statuses.contains_key(&id)
    }

    /// Returns the lowest free id, if any. Never changes state.
    pub fn find_free(&self) -> Option<ResourceId> {
        self.bucket(ResourceStatus::Free).first().copied()
    }

    /// Returns the lowest `count` free ids, or `None` if fewer are free.
    pub fn find_free_many(&self, count: usize) -> Option<Vec<ResourceId>> {
        let free = self.bucket(ResourceStatus::Free);
        if free.len() < count {
            return None;
        }
        Some(free.iter().take(count).copied().collect())
    }

    /// Current status of `id`.
    pub fn status_of(&self, id: ResourceId) -> Result<ResourceStatus, PoolError> {
        self.statuses
            .get(&id)
            .copied()
            .ok_or(PoolError::UnknownResource(id))
    }

    /// Moves `id` to `next`, rejecting anything outside the transition table.
    pub fn mark(&mut self, id: ResourceId, next: ResourceStatus) -> Result<(), PoolError> {
        let current = self.status_of(id)?;
        if !current.can_transition_to(next) {
            return Err(PoolError::InvalidTransition {
                resource: id,
                from: current,
                to: next,
            });
        }

        self.buckets[current.bucket()].remove(&id);
        self.buckets[next.bucket()].insert(id);
        self.statuses.insert(id, next);
        Ok(())
    }

    /// Per-status counts.
    pub fn availability(&self) -> PoolAvailability {
        PoolAvailability {
            free: self.bucket(ResourceStatus::Free).len(),
            reserved: self.bucket(ResourceStatus::Reserved).len(),
            occupied: self.bucket(ResourceStatus::Occupied).len(),
            capacity: self.capacity(),
        }
    }

    /// Ids currently in `status`, ascending.
    pub fn ids_with(&self, status: ResourceStatus) -> impl Iterator<Item = ResourceId> + '_ {
        self.bucket(status).iter().copied()
    }

    /// Checks that the buckets partition the pool exactly.
    pub fn check_partition(&self) -> Result<(), String> {
        let bucketed: usize = self.buckets.iter().map(BTreeSet::len).sum();
        if bucketed != self.capacity() {
            return Err(format!(
                "pool {} holds {} ids in buckets but has capacity {}",
                self.category,
                bucketed,
                self.capacity()
            ));
        }

        for (id, status) in &self.statuses {
            for candidate in ResourceStatus::ALL {
                let present = self.bucket(candidate).contains(id);
                if present != (candidate == *status) {
                    return Err(format!(
                        "resource {id} is {status} but bucket {candidate} membership is {present}"
                    ));
                }
            }
        }
        Ok(())
    }

    fn bucket(&self, status: ResourceStatus) -> &BTreeSet<ResourceId> {
        &self.buckets[status.bucket()]
    }
}
