//! The allocator: the only way to change a resource's status.
//!
//! An [`Allocator`] owns one shard per category. Each shard is a
//! [`ResourcePool`] plus the live tokens that reference it, behind a single
//! `parking_lot::Mutex`. Every operation locks exactly one shard for one
//! check-and-set, so:
//!
//! - a free resource is granted to at most one caller,
//! - a token and the status it guards always change together,
//! - operations on different categories never contend.
//!
//! Upgrades walk the shards one at a time in rank order and never hold two
//! locks at once.
//!
//! # Example
//! ```
//! use allotment::{Allocator, ResourceStatus, Size};
//!
//! let allocator = Allocator::builder()
//!     .pool(Size::Small, 2)
//!     .pool(Size::Large, 1)
//!     .build()
//!     .unwrap();
//!
//! let token = allocator.reserve(Size::Small).unwrap();
//! allocator.confirm(&token).unwrap();
//! assert_eq!(allocator.status(token.resource_id()).unwrap(), ResourceStatus::Occupied);
//!
//! allocator.release(token.resource_id()).unwrap();
//! assert_eq!(allocator.status(token.resource_id()).unwrap(), ResourceStatus::Free);
//! ```

use crate::category::{sort_ladder, Category};
use crate::clock::{Clock, SystemClock};
use crate::config::{AllocatorConfig, PoolCapacity, PoolLayout};
use crate::errors::{AllocatorError, AllocatorResult, ConfigError};
use crate::pool::{PoolAvailability, ResourcePool};
use crate::stats::{AllocatorStats, StatsRecorder};
use crate::status::ResourceStatus;
use crate::token::{RandomTokenIds, ReservationToken, TokenIdSource};
use crate::types::{ResourceId, Timestamp, TokenId};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug, Clone, Copy)]
struct LiveReservation {
    resource_id: ResourceId,
    issued_at: Timestamp,
}

/// Token ids and issue time drawn for one grant, outside any shard lock.
#[derive(Debug)]
struct Draw {
    token_ids: Vec<TokenId>,
    issued_at: Timestamp,
}

fn duplicate_token_id<C: Category>() -> AllocatorError<C> {
    AllocatorError::Corrupted("token id source returned a duplicate id".to_string())
}

#[derive(Debug)]
struct ShardState<C: Category> {
    pool: ResourcePool<C>,
    live: HashMap<TokenId, LiveReservation>,
}

/// Thread-safe reserve/confirm/release allocator over categorized pools.
///
/// Share it between threads or tasks with `Arc<Allocator<C>>`.
pub struct Allocator<C: Category> {
    shards: BTreeMap<C, Mutex<ShardState<C>>>,
    ladder: Vec<C>,
    directory: HashMap<ResourceId, C>,
    config: AllocatorConfig,
    token_ids: Arc<dyn TokenIdSource>,
    clock: Arc<dyn Clock>,
    stats: StatsRecorder,
}

impl<C: Category> Allocator<C> {
    /// Starts building an allocator.
    pub fn builder() -> AllocatorBuilder<C> {
        AllocatorBuilder::new()
    }

    /// Reserves one free resource of `category`, or of a larger category if
    /// the upgrade policy allows it.
    #[instrument(skip(self), level = "debug")]
    pub fn reserve(&self, category: C) -> AllocatorResult<ReservationToken<C>, C> {
        let mut granted = self.grant(category, 1)?;
        granted.pop().ok_or_else(|| {
            AllocatorError::Corrupted("grant of one resource returned nothing".to_string())
        })
    }

    /// Reserves `count` resources from a single pool, all or nothing.
    ///
    /// Pools are tried in upgrade order; the first one with `count` free
    /// resources grants all of them. Asking for zero returns no tokens.
    #[instrument(skip(self), level = "debug")]
    pub fn reserve_many(
        &self,
        category: C,
        count: usize,
    ) -> AllocatorResult<Vec<ReservationToken<C>>, C> {
        if count == 0 {
            return Ok(Vec::new());
        }
        self.grant(category, count)
    }

    /// Reserves one specific resource, which must currently be free.
    #[instrument(skip(self), level = "debug")]
    pub fn reserve_resource(&self, resource_id: ResourceId) -> AllocatorResult<ReservationToken<C>, C> {
        let category = self.category_of(resource_id)?;
        let shard = self.shard(category)?;
        let draw = self.draw(1)?;
        let mut state = shard.lock();

        let current = state.pool.status_of(resource_id)?;
        if current != ResourceStatus::Free {
            return Err(AllocatorError::InvalidTransition {
                resource: resource_id,
                from: current,
                to: ResourceStatus::Reserved,
            });
        }

        let mut tokens = Self::mint(&mut state, &[resource_id], draw)?;
        drop(state);

        self.stats.reserved(1, false);
        tokens.pop().ok_or_else(|| {
            AllocatorError::Corrupted("minting one token returned nothing".to_string())
        })
    }

    /// Confirms a reservation: the resource becomes occupied and the token is
    /// consumed.
    #[instrument(
        skip(self, token),
        fields(token_id = %token.token_id(), resource_id = %token.resource_id()),
        level = "debug"
    )]
    pub fn confirm(&self, token: &ReservationToken<C>) -> AllocatorResult<(), C> {
        self.settle(token, ResourceStatus::Occupied)?;
        self.stats.confirmed();
        debug!("reservation confirmed");
        Ok(())
    }

    /// Abandons a reservation: the resource becomes free and the token is
    /// consumed.
    #[instrument(
        skip(self, token),
        fields(token_id = %token.token_id(), resource_id = %token.resource_id()),
        level = "debug"
    )]
    pub fn cancel(&self, token: &ReservationToken<C>) -> AllocatorResult<(), C> {
        self.settle(token, ResourceStatus::Free)?;
        self.stats.cancelled();
        debug!("reservation cancelled");
        Ok(())
    }

    /// Returns an occupied resource to the free pool.
    ///
    /// A reserved resource cannot be released: settle it with
    /// [`cancel`](Self::cancel) and its token instead. Releasing one fails with
    /// `InvalidTransition { from: Reserved, to: Free }` and leaves the
    /// reservation untouched.
    #[instrument(skip(self), level = "debug")]
    pub fn release(&self, resource_id: ResourceId) -> AllocatorResult<(), C> {
        let category = self.category_of(resource_id)?;
        let shard = self.shard(category)?;
        let mut state = shard.lock();

        let current = state.pool.status_of(resource_id)?;
        if current != ResourceStatus::Occupied {
            return Err(AllocatorError::InvalidTransition {
                resource: resource_id,
                from: current,
                to: ResourceStatus::Free,
            });
        }
        state.pool.mark(resource_id, ResourceStatus::Free)?;
        drop(state);

        self.stats.released();
        debug!("resource released");
        Ok(())
    }

    /// Current status of a resource.
    pub fn status(&self, resource_id: ResourceId) -> AllocatorResult<ResourceStatus, C> {
        let category = self.category_of(resource_id)?;
        let status = self.shard(category)?.lock().pool.status_of(resource_id)?;
        Ok(status)
    }

    /// The category a resource belongs to.
    pub fn category_of(&self, resource_id: ResourceId) -> AllocatorResult<C, C> {
        self.directory
            .get(&resource_id)
            .copied()
            .ok_or(AllocatorError::UnknownResource(resource_id))
    }

    /// Per-status counts for one category's pool.
    pub fn availability(&self, category: C) -> AllocatorResult<PoolAvailability, C> {
        Ok(self.shard(category)?.lock().pool.availability())
    }

    /// Categories with a pool, in upgrade order.
    pub fn categories(&self) -> &[C] {
        &self.ladder
    }

    /// Total number of resources across every pool.
    pub fn capacity(&self) -> usize {
        self.directory.len()
    }

    /// Number of tokens that are currently live.
    pub fn live_reservations(&self) -> usize {
        self.shards.values().map(|shard| shard.lock().live.len()).sum()
    }

    /// The allocator's settings.
    pub const fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    /// A snapshot of the cumulative counters.
    pub fn stats(&self) -> AllocatorStats {
        self.stats.snapshot()
    }

    /// Cancels every reservation issued at least `max_age` ago.
    ///
    /// Returns the freed resource ids in ascending order. Tokens for those
    /// reservations become invalid.
    #[instrument(skip(self), level = "debug")]
    pub fn expire_older_than(&self, max_age: Duration) -> Vec<ResourceId> {
        let now = self.clock.now();
        let mut freed = Vec::new();

        for (category, shard) in &self.shards {
            let mut state = shard.lock();
            let expired: Vec<(TokenId, ResourceId)> = state
                .live
                .iter()
                .filter(|(_, live)| live.issued_at.saturating_add(max_age) <= now)
                .map(|(token_id, live)| (*token_id, live.resource_id))
                .collect();

            for (token_id, resource_id) in expired {
                match state.pool.mark(resource_id, ResourceStatus::Free) {
                    Ok(()) => {
                        state.live.remove(&token_id);
                        freed.push(resource_id);
                    }
                    Err(e) => {
                        error!(%category, %token_id, error = %e, "live token references a resource that is not reserved");
                    }
                }
            }
        }

        if !freed.is_empty() {
            self.stats.expired(freed.len() as u64);
            info!(count = freed.len(), "expired stale reservations");
        }
        freed.sort_unstable();
        freed
    }

    /// Cancels reservations older than the configured time-to-live.
    ///
    /// Does nothing when no time-to-live is configured.
    pub fn sweep_expired(&self) -> Vec<ResourceId> {
        self.config
            .reservation_ttl()
            .map_or_else(Vec::new, |ttl| self.expire_older_than(ttl))
    }

    /// Audits every shard.
    ///
    /// Checks that each pool's buckets partition its resources, that every
    /// reserved resource has exactly one live token, and that every live token
    /// references a reserved resource.
    pub fn verify_integrity(&self) -> AllocatorResult<(), C> {
        let mut pooled = 0;
        for (category, shard) in &self.shards {
            let state = shard.lock();
            state.pool.check_partition().map_err(AllocatorError::Corrupted)?;
            pooled += state.pool.capacity();

            let mut held = HashSet::with_capacity(state.live.len());
            for (token_id, live) in &state.live {
                if !held.insert(live.resource_id) {
                    return Err(AllocatorError::Corrupted(format!(
                        "resource {} is held by more than one token (one is {token_id})",
                        live.resource_id
                    )));
                }
            }

            let reserved: HashSet<ResourceId> =
                state.pool.ids_with(ResourceStatus::Reserved).collect();
            if reserved != held {
                return Err(AllocatorError::Corrupted(format!(
                    "pool {category} has {} reserved resources but {} live tokens",
                    reserved.len(),
                    held.len()
                )));
            }
        }

        if pooled != self.directory.len() {
            return Err(AllocatorError::Corrupted(format!(
                "pools hold {pooled} resources but the directory lists {}",
                self.directory.len()
            )));
        }
        Ok(())
    }

    fn shard(&self, category: C) -> AllocatorResult<&Mutex<ShardState<C>>, C> {
        self.shards
            .get(&category)
            .ok_or(AllocatorError::UnknownCategory(category))
    }

    fn grant(&self, requested: C, count: usize) -> AllocatorResult<Vec<ReservationToken<C>>, C> {
        let candidates = self.config.upgrade_policy.candidates(requested, &self.ladder);
        let draw = self.draw(count)?;

        for category in candidates {
            let Some(shard) = self.shards.get(&category) else {
                continue;
            };
            let mut state = shard.lock();
            let Some(ids) = state.pool.find_free_many(count) else {
                continue;
            };
            let tokens = Self::mint(&mut state, &ids, draw)?;
            drop(state);

            let upgraded = category != requested;
            self.stats.reserved(count as u64, upgraded);
            if upgraded {
                info!(%requested, granted = %category, count, "request upgraded to a larger category");
            }
            debug!(%category, count, "resources reserved");
            return Ok(tokens);
        }

        self.stats.rejected();
        debug!(%requested, count, "no capacity");
        Err(AllocatorError::NoCapacity {
            requested,
            wanted: count,
        })
    }

    /// Draws `count` token ids and a timestamp for a grant.
    ///
    /// Runs before any shard lock is taken, so the injected id source and
    /// clock may call back into the allocator.
    fn draw(&self, count: usize) -> AllocatorResult<Draw, C> {
        let token_ids: Vec<TokenId> = (0..count).map(|_| self.token_ids.next_token_id()).collect();
        let distinct: HashSet<&TokenId> = token_ids.iter().collect();
        if distinct.len() != token_ids.len() {
            return Err(duplicate_token_id());
        }
        Ok(Draw {
            token_ids,
            issued_at: self.clock.now(),
        })
    }

    /// Marks `ids` reserved and records one live token per id.
    ///
    /// Every id must be free and `draw` must hold one token id per resource.
    /// Token ids are checked against the live map before any status changes,
    /// so a misbehaving id source cannot leave a partial grant.
    fn mint(
        state: &mut ShardState<C>,
        ids: &[ResourceId],
        draw: Draw,
    ) -> AllocatorResult<Vec<ReservationToken<C>>, C> {
        let Draw {
            token_ids,
            issued_at,
        } = draw;
        if token_ids.len() != ids.len() {
            return Err(AllocatorError::Corrupted(format!(
                "drew {} token ids for {} resources",
                token_ids.len(),
                ids.len()
            )));
        }
        if token_ids.iter().any(|t| state.live.contains_key(t)) {
            return Err(duplicate_token_id());
        }

        let category = state.pool.category();
        let mut tokens = Vec::with_capacity(ids.len());
        for (resource_id, token_id) in ids.iter().copied().zip(token_ids) {
            state.pool.mark(resource_id, ResourceStatus::Reserved)?;
            let _ = state.live.insert(
                token_id,
                LiveReservation {
                    resource_id,
                    issued_at,
                },
            );
            tokens.push(ReservationToken::new(token_id, resource_id, category, issued_at));
        }
        Ok(tokens)
    }

    /// Moves a reserved resource to `next` and consumes its token.
    fn settle(&self, token: &ReservationToken<C>, next: ResourceStatus) -> AllocatorResult<(), C> {
        let token_id = token.token_id();
        let Some(shard) = self.shards.get(&token.category()) else {
            return Err(self.reject_token(token_id));
        };
        let mut state = shard.lock();

        let bound = state
            .live
            .get(&token_id)
            .is_some_and(|live| live.resource_id == token.resource_id());
        if !bound {
            drop(state);
            return Err(self.reject_token(token_id));
        }

        state.pool.mark(token.resource_id(), next)?;
        state.live.remove(&token_id);
        Ok(())
    }

    fn reject_token(&self, token_id: TokenId) -> AllocatorError<C> {
        self.stats.invalid_token();
        warn!(%token_id, "rejected unknown or already used reservation token");
        AllocatorError::InvalidToken(token_id)
    }
}

impl<C: Category> std::fmt::Debug for Allocator<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Allocator")
            .field("categories", &self.ladder)
            .field("capacity", &self.capacity())
            .field("live_reservations", &self.live_reservations())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Builds an [`Allocator`].
///
/// Resource ids are assigned in the order pools are added, starting at 1.
pub struct AllocatorBuilder<C: Category> {
    pools: Vec<(C, u32)>,
    config: AllocatorConfig,
    token_ids: Arc<dyn TokenIdSource>,
    clock: Arc<dyn Clock>,
}

impl<C: Category> AllocatorBuilder<C> {
    /// A builder with no pools, default settings, random token ids and the
    /// system clock.
    pub fn new() -> Self {
        Self {
            pools: Vec::new(),
            config: AllocatorConfig::default(),
            token_ids: Arc::new(RandomTokenIds),
            clock: Arc::new(SystemClock),
        }
    }

    /// A builder seeded from a parsed layout.
    pub fn from_layout(layout: PoolLayout<C>) -> Self {
        let pools = layout
            .pools
            .into_iter()
            .map(|spec| (spec.category, spec.capacity.into()))
            .collect();
        Self {
            pools,
            config: layout.config,
            ..Self::new()
        }
    }

    /// Adds a pool of `capacity` resources of `category`.
    #[must_use]
    pub fn pool(mut self, category: C, capacity: u32) -> Self {
        self.pools.push((category, capacity));
        self
    }

    /// Replaces the settings.
    #[must_use]
    pub const fn config(mut self, config: AllocatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Uses `source` for token ids.
    #[must_use]
    pub fn token_ids(mut self, source: impl TokenIdSource + 'static) -> Self {
        self.token_ids = Arc::new(source);
        self
    }

    /// Uses `clock` for reservation timestamps and expiry.
    #[must_use]
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Validates the layout and creates the allocator with every resource free.
    pub fn build(self) -> Result<Allocator<C>, ConfigError> {
        if self.pools.is_empty() {
            return Err(ConfigError::EmptyLayout);
        }

        let mut shards = BTreeMap::new();
        let mut directory = HashMap::new();
        let mut next_id = ResourceId::new(1);

        for (category, capacity) in self.pools {
            if shards.contains_key(&category) {
                return Err(ConfigError::DuplicatePool(category.to_string()));
            }
            let capacity = PoolCapacity::try_new(capacity).map_err(|e| ConfigError::InvalidValue {
                field: "capacity",
                reason: e.to_string(),
            })?;

            let mut ids = Vec::new();
            for _ in 0..u32::from(capacity) {
                ids.push(next_id);
                directory.insert(next_id, category);
                next_id = next_id.next();
            }

            shards.insert(
                category,
                Mutex::new(ShardState {
                    pool: ResourcePool::new(category, ids),
                    live: HashMap::new(),
                }),
            );
        }

        let mut ladder: Vec<C> = shards.keys().copied().collect();
        sort_ladder(&mut ladder);

        info!(
            pools = ladder.len(),
            capacity = directory.len(),
            policy = ?self.config.upgrade_policy,
            "allocator built"
        );

        Ok(Allocator {
            shards,
            ladder,
            directory,
            config: self.config,
            token_ids: self.token_ids,
            clock: self.clock,
            stats: StatsRecorder::default(),
        })
    }
}

impl<C: Category> Default for AllocatorBuilder<C> {
    fn default() -> Self {
        Self::new()
    }
}
