//! Allocator configuration with type-safe validation.
//!
//! Numeric settings are `nutype` newtypes, so an out-of-range value is
//! rejected when the configuration is constructed or deserialized rather than
//! when the allocator first uses it.

use crate::category::{Category, UpgradePolicy};
use crate::errors::ConfigError;
use nutype::nutype;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Number of resources in one pool.
///
/// Validated to be between 1 and 1,000,000.
#[nutype(
    validate(greater_or_equal = 1, less_or_equal = 1_000_000),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Into,
        Serialize,
        Deserialize
    )
)]
pub struct PoolCapacity(u32);

/// Maximum age of an unconfirmed reservation, in milliseconds.
///
/// Validated to be between 1ms and 24 hours.
#[nutype(
    validate(greater_or_equal = 1, less_or_equal = 86_400_000),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Into,
        Serialize,
        Deserialize
    )
)]
pub struct ReservationTtlMs(u64);

impl ReservationTtlMs {
    /// Convert to a `Duration`.
    pub fn as_duration(self) -> Duration {
        Duration::from_millis(self.into())
    }
}

/// Delay between background expiry sweeps, in milliseconds.
///
/// Validated to be between 10ms and one hour.
#[nutype(
    validate(greater_or_equal = 10, less_or_equal = 3_600_000),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Into,
        Serialize,
        Deserialize
    )
)]
pub struct SweepIntervalMs(u64);

impl SweepIntervalMs {
    /// Convert to a `Duration` for use with `tokio::time::interval`.
    pub fn as_duration(self) -> Duration {
        Duration::from_millis(self.into())
    }
}

impl Default for SweepIntervalMs {
    fn default() -> Self {
        Self::try_new(1_000).expect("1000ms is a valid sweep interval")
    }
}

/// Behavioural settings for an allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocatorConfig {
    /// How requests are matched to pools.
    pub upgrade_policy: UpgradePolicy,
    /// Reservations older than this are cancelled by the sweep. `None` keeps
    /// reservations until the caller acts.
    pub reservation_ttl_ms: Option<ReservationTtlMs>,
    /// How often a spawned [`Sweeper`](crate::Sweeper) runs.
    pub sweep_interval_ms: SweepIntervalMs,
}

impl AllocatorConfig {
    /// Sets the upgrade policy.
    #[must_use]
    pub const fn with_upgrade_policy(mut self, policy: UpgradePolicy) -> Self {
        self.upgrade_policy = policy;
        self
    }

    /// Sets the reservation time-to-live.
    pub fn with_reservation_ttl(mut self, ttl: Duration) -> Result<Self, ConfigError> {
        let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        let ttl = ReservationTtlMs::try_new(millis).map_err(|e| ConfigError::InvalidValue {
            field: "reservation_ttl_ms",
            reason: e.to_string(),
        })?;
        self.reservation_ttl_ms = Some(ttl);
        Ok(self)
    }

    /// Sets the sweep interval.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Result<Self, ConfigError> {
        let millis = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self.sweep_interval_ms =
            SweepIntervalMs::try_new(millis).map_err(|e| ConfigError::InvalidValue {
                field: "sweep_interval_ms",
                reason: e.to_string(),
            })?;
        Ok(self)
    }

    /// The configured time-to-live, if any.
    pub fn reservation_ttl(&self) -> Option<Duration> {
        self.reservation_ttl_ms.map(ReservationTtlMs::as_duration)
    }
}

/// One pool in a layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSpec<C> {
    /// The pool's category.
    pub category: C,
    /// How many resources it holds.
    pub capacity: PoolCapacity,
}

/// A complete allocator description: settings plus the pools to create.
///
/// ```json
/// {
///   "config": { "upgrade_policy": "ascending", "reservation_ttl_ms": 30000 },
///   "pools": [
///     { "category": "small", "capacity": 10 },
///     { "category": "medium", "capacity": 4 }
///   ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolLayout<C> {
    /// Behavioural settings.
    #[serde(default)]
    pub config: AllocatorConfig,
    /// Pools, in id-assignment order.
    pub pools: Vec<PoolSpec<C>>,
}

impl<C> PoolLayout<C>
where
    C: Category + DeserializeOwned,
{
    /// Parses a layout from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Size;

    #[test]
    fn default_config_has_no_ttl() {
        let config = AllocatorConfig::default();
        assert_eq!(config.upgrade_policy, UpgradePolicy::Ascending);
        assert_eq!(config.reservation_ttl(), None);
        assert_eq!(config.sweep_interval_ms.as_duration(), Duration::from_secs(1));
    }

    #[test]
    fn ttl_builder_validates_range() {
        let config = AllocatorConfig::default()
            .with_reservation_ttl(Duration::from_secs(30))
            .unwrap();
        assert_eq!(config.reservation_ttl(), Some(Duration::from_secs(30)));

        let too_long = AllocatorConfig::default().with_reservation_ttl(Duration::from_secs(90_000));
        assert!(matches!(
            too_long,
            Err(ConfigError::InvalidValue {
                field: "reservation_ttl_ms",
                ..
            })
        ));
    }

    #[test]
    fn sweep_interval_rejects_tiny_values() {
        let result = AllocatorConfig::default().with_sweep_interval(Duration::from_millis(1));
        assert!(result.is_err());
    }

    #[test]
    fn layout_parses_from_json() {
        let layout = PoolLayout::<Size>::from_json(
            r#"{
                "config": { "upgrade_policy": "exact", "reservation_ttl_ms": 500 },
                "pools": [
                    { "category": "small", "capacity": 3 },
                    { "category": "extra_large", "capacity": 1 }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(layout.config.upgrade_policy, UpgradePolicy::Exact);
        assert_eq!(layout.config.reservation_ttl(), Some(Duration::from_millis(500)));
        assert_eq!(layout.pools.len(), 2);
        assert_eq!(layout.pools[1].category, Size::ExtraLarge);
        assert_eq!(u32::from(layout.pools[0].capacity), 3);
    }

    #[test]
    fn layout_without_config_uses_defaults() {
        let layout =
            PoolLayout::<Size>::from_json(r#"{ "pools": [{ "category": "medium", "capacity": 2 }] }"#)
                .unwrap();
        assert_eq!(layout.config, AllocatorConfig::default());
    }

    #[test]
    fn zero_capacity_is_rejected_at_parse_time() {
        let result =
            PoolLayout::<Size>::from_json(r#"{ "pools": [{ "category": "small", "capacity": 0 }] }"#);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
