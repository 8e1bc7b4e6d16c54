//! Reservation expiry tests, driven by a manual clock.

use allotment::{AllocatorConfig, AllocatorError, ConfigError, Size, SweepIntervalMs, Sweeper};
use allotment_testing::{assert_all_free, assert_integrity, expiring_lockers, init_test_tracing};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn sweep_frees_only_reservations_past_their_ttl() {
    let (allocator, clock) = expiring_lockers(3, Duration::from_secs(30));

    let old = allocator.reserve(Size::Small).unwrap();
    clock.advance(Duration::from_secs(20));
    let fresh = allocator.reserve(Size::Small).unwrap();

    clock.advance(Duration::from_secs(10));
    assert_eq!(allocator.sweep_expired(), vec![old.resource_id()]);

    assert!(matches!(
        allocator.confirm(&old),
        Err(AllocatorError::InvalidToken(_))
    ));
    allocator.confirm(&fresh).unwrap();
    assert_eq!(allocator.stats().expirations, 1);
    assert_integrity(&allocator);
}

#[test]
fn confirmed_reservations_are_never_expired() {
    let (allocator, clock) = expiring_lockers(1, Duration::from_millis(100));
    let token = allocator.reserve(Size::Small).unwrap();
    allocator.confirm(&token).unwrap();

    clock.advance(Duration::from_secs(60));
    assert!(allocator.sweep_expired().is_empty());
    assert_eq!(allocator.availability(Size::Small).unwrap().occupied, 1);
}

#[test]
fn caller_defined_timeout_overrides_configuration() {
    let (allocator, clock) = expiring_lockers(2, Duration::from_secs(3_600));
    allocator.reserve(Size::Small).unwrap();
    clock.advance(Duration::from_secs(5));

    assert!(allocator.sweep_expired().is_empty());
    assert_eq!(allocator.expire_older_than(Duration::from_secs(5)).len(), 1);
    assert_all_free(&allocator);
}

#[test]
fn zero_sweep_interval_is_rejected_before_spawning() {
    assert!(SweepIntervalMs::try_new(0).is_err());
    assert!(matches!(
        AllocatorConfig::default().with_sweep_interval(Duration::ZERO),
        Err(ConfigError::InvalidValue {
            field: "sweep_interval_ms",
            ..
        })
    ));
    // Sub-millisecond intervals round down to zero and are refused too.
    assert!(AllocatorConfig::default()
        .with_sweep_interval(Duration::from_micros(500))
        .is_err());
}

#[tokio::test(start_paused = true)]
async fn sweeper_at_minimum_interval_keeps_running() {
    let (allocator, clock) = expiring_lockers(1, Duration::from_millis(1));
    let allocator = Arc::new(allocator);
    allocator.reserve(Size::Small).unwrap();
    clock.advance(Duration::from_secs(1));

    let minimum = SweepIntervalMs::try_new(10).unwrap();
    let sweeper = Sweeper::spawn(Arc::clone(&allocator), minimum);
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(!sweeper.is_finished());
    assert_eq!(allocator.live_reservations(), 0);
    sweeper.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn background_sweeper_expires_stale_reservations() {
    init_test_tracing();
    let (allocator, clock) = expiring_lockers(2, Duration::from_secs(1));
    let allocator = Arc::new(allocator);

    let stale = allocator.reserve(Size::Small).unwrap();
    clock.advance(Duration::from_secs(2));

    let interval = SweepIntervalMs::try_new(10).unwrap();
    let sweeper = Sweeper::spawn(Arc::clone(&allocator), interval);
    let freed = tokio::time::timeout(Duration::from_secs(5), async {
        while allocator.live_reservations() > 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(freed.is_ok(), "sweeper never expired the reservation");

    assert!(allocator.confirm(&stale).is_err());
    sweeper.shutdown().await;
    assert_all_free(&allocator);
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_the_sweeper() {
    let (allocator, clock) = expiring_lockers(1, Duration::from_secs(1));
    let allocator = Arc::new(allocator);

    let sweeper = Sweeper::spawn_configured(Arc::clone(&allocator));
    assert!(!sweeper.is_finished());
    sweeper.shutdown().await;

    // With the sweeper gone, stale reservations stay put.
    let token = allocator.reserve(Size::Small).unwrap();
    clock.advance(Duration::from_secs(10));
    // Well past the configured interval on the paused runtime clock.
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(allocator.live_reservations(), 1);
    allocator.confirm(&token).unwrap();
}
