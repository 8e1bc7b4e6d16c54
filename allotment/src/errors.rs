//! Error types for the allocator.
//!
//! Errors are split by layer:
//!
//! - **PoolError**: a single pool rejected a status change
//! - **AllocatorError**: an allocator operation failed
//! - **ConfigError**: an allocator could not be built from its layout
//!
//! # Error Handling Strategy
//!
//! - **NoCapacity**: recoverable; retry later or ask for another category
//! - **InvalidToken**: the token was never issued, was already used, or lost a
//!   race against the expiry sweep; surface it to the caller
//! - **UnknownResource** / **InvalidTransition**: caller bug; never retried
//! - **Corrupted**: an internal invariant was broken; log and investigate
//!
//! No allocator operation fails for transient reasons, so nothing here is
//! retried internally.

use crate::category::Category;
use crate::status::ResourceStatus;
use crate::types::{ResourceId, TokenId};
use thiserror::Error;

/// Errors raised by a single [`ResourcePool`](crate::ResourcePool).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    /// The id does not belong to this pool.
    #[error("Unknown resource: {0}")]
    UnknownResource(ResourceId),

    /// The requested status change is not a legal edge.
    #[error("Invalid transition for resource {resource}: {from} -> {to}")]
    InvalidTransition {
        /// The resource that was asked to move
        resource: ResourceId,
        /// Its current status
        from: ResourceStatus,
        /// The status that was requested
        to: ResourceStatus,
    },
}

/// Errors raised by [`Allocator`](crate::Allocator) operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocatorError<C: Category> {
    /// No free resource of the requested category or an allowed upgrade.
    #[error("No capacity for {wanted} x {requested}")]
    NoCapacity {
        /// The category that was asked for
        requested: C,
        /// How many resources were asked for
        wanted: usize,
    },

    /// The token is unknown, already consumed, or expired.
    #[error("Invalid reservation token: {0}")]
    InvalidToken(TokenId),

    /// No resource with this id exists.
    #[error("Unknown resource: {0}")]
    UnknownResource(ResourceId),

    /// The category has no pool in this allocator.
    #[error("Unknown category: {0}")]
    UnknownCategory(C),

    /// The resource is not in a status that allows the operation.
    #[error("Invalid transition for resource {resource}: {from} -> {to}")]
    InvalidTransition {
        /// The resource that was asked to move
        resource: ResourceId,
        /// Its current status
        from: ResourceStatus,
        /// The status that was requested
        to: ResourceStatus,
    },

    /// An internal consistency check failed.
    #[error("Allocator integrity error: {0}")]
    Corrupted(String),
}

impl<C: Category> From<PoolError> for AllocatorError<C> {
    fn from(error: PoolError) -> Self {
        match error {
            PoolError::UnknownResource(id) => Self::UnknownResource(id),
            PoolError::InvalidTransition { resource, from, to } => {
                Self::InvalidTransition { resource, from, to }
            }
        }
    }
}

impl<C: Category> AllocatorError<C> {
    /// Returns true when retrying later may succeed.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::NoCapacity { .. })
    }
}

/// Errors raised while building an allocator from configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The layout defines no pools.
    #[error("Layout defines no pools")]
    EmptyLayout,

    /// The same category was given two pools.
    #[error("Duplicate pool for category {0}")]
    DuplicatePool(String),

    /// A configuration value is out of range.
    #[error("Invalid configuration value for {field}: {reason}")]
    InvalidValue {
        /// The offending field
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },

    /// The configuration could not be parsed.
    #[error("Configuration parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Type alias for allocator operation results.
pub type AllocatorResult<T, C> = Result<T, AllocatorError<C>>;
