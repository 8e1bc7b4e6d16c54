//! `allotment` - concurrent reservation core for finite, categorized resources
//!
//! Parking spots, lockers, seats and vending slots all share one problem: a
//! fixed set of typed resources must be handed out under concurrent access
//! without ever granting the same resource twice. This crate solves it once.
//!
//! # Key Components
//!
//! - [`Allocator`] - the only entry point; owns every pool and live token.
//! - [`ResourcePool`] - one category's resources, partitioned by status.
//! - [`ReservationToken`] - single-use proof of a won reservation.
//! - [`Category`] / [`UpgradePolicy`] - how requests are matched to pools.
//! - [`Sweeper`] - optional background expiry of unconfirmed reservations.
//!
//! # Lifecycle
//!
//! ```text
//! Free --reserve--> Reserved --confirm--> Occupied --release--> Free
//!                   Reserved --cancel/expire--> Free
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod allocator;
pub mod category;
pub mod clock;
pub mod config;
pub mod errors;
pub mod pool;
pub mod stats;
pub mod status;
pub mod sweeper;
pub mod token;
pub mod types;

pub use allocator::{Allocator, AllocatorBuilder};
pub use category::{Category, Size, UpgradePolicy};
pub use clock::{Clock, SystemClock};
pub use config::{
    AllocatorConfig, PoolCapacity, PoolLayout, PoolSpec, ReservationTtlMs, SweepIntervalMs,
};
pub use errors::{AllocatorError, AllocatorResult, ConfigError, PoolError};
pub use pool::{PoolAvailability, ResourcePool};
pub use stats::AllocatorStats;
pub use status::ResourceStatus;
pub use sweeper::{Sweeper, SweeperHandle};
pub use token::{RandomTokenIds, ReservationToken, TokenIdSource};
pub use types::{ResourceId, Timestamp, TokenId};
