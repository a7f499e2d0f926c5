//! Behaviour of the location cascade against the scripted platform.
//! Runs on a paused tokio clock, so the 15s/8s budgets elapse instantly.

use std::sync::Arc;
use std::time::Duration;

use nearby_common::{Coordinate, LocatorConfig};
use nearby_locator::{
    AccuracyTier, FixScript, LocationOutcome, LocationResolver, PlatformError, SimPlatform,
    LOCATION_UNAVAILABLE,
};
use tokio::time::Instant;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const HOME: Coordinate = Coordinate::new(44.9537, -93.0900);
const GPS: Coordinate = Coordinate::new(44.9778, -93.2650);
const NETWORK: Coordinate = Coordinate::new(44.9800, -93.2700);

fn resolver(platform: &Arc<SimPlatform>) -> LocationResolver {
    LocationResolver::new(platform.clone(), LocatorConfig::default())
}

fn fix_after(ms: u64, coordinate: Coordinate) -> FixScript {
    FixScript::Fix {
        after: Duration::from_millis(ms),
        coordinate,
    }
}

fn assert_elapsed(start: Instant, expected: Duration) {
    let elapsed = start.elapsed();
    let slack = Duration::from_millis(100);
    assert!(
        elapsed >= expected && elapsed <= expected + slack,
        "expected ~{expected:?}, elapsed {elapsed:?}"
    );
}

// =========================================================================
// Preconditions
// =========================================================================

#[tokio::test(start_paused = true)]
async fn permission_denied_returns_before_any_timer() {
    let platform = Arc::new(
        SimPlatform::new()
            .with_permission(false)
            .with_cached(HOME)
            .on_high_accuracy(fix_after(10, GPS)),
    );

    let start = Instant::now();
    let outcome = resolver(&platform).resolve().await;

    assert_eq!(outcome, LocationOutcome::PermissionDenied);
    assert_eq!(start.elapsed(), Duration::ZERO);
    assert_eq!(platform.cache_lookups(), 0);
    assert!(platform.requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn disabled_services_return_before_any_timer() {
    let platform = Arc::new(
        SimPlatform::new()
            .with_service_enabled(false)
            .with_cached(HOME),
    );

    let start = Instant::now();
    let outcome = resolver(&platform).resolve().await;

    assert_eq!(outcome, LocationOutcome::ServiceDisabled);
    assert_eq!(start.elapsed(), Duration::ZERO);
    assert_eq!(platform.cache_lookups(), 0);
    assert!(platform.requests().is_empty());
}

// =========================================================================
// Cached fix
// =========================================================================

#[tokio::test(start_paused = true)]
async fn cached_fix_skips_fresh_requests() {
    let platform = Arc::new(
        SimPlatform::new()
            .with_cached(HOME)
            .on_high_accuracy(fix_after(10, GPS)),
    );

    let outcome = resolver(&platform).resolve().await;

    assert_eq!(outcome, LocationOutcome::Success(HOME));
    assert_eq!(platform.cache_lookups(), 1);
    assert!(platform.requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn cached_lookup_error_is_swallowed() {
    let platform = Arc::new(
        SimPlatform::new()
            .with_cached_error(PlatformError::Other("play services crashed".into()))
            .on_high_accuracy(fix_after(1_000, GPS)),
    );

    let outcome = resolver(&platform).resolve().await;

    assert_eq!(outcome, LocationOutcome::Success(GPS));
    assert_eq!(platform.requested_tiers(), vec![AccuracyTier::HighAccuracy]);
}

// =========================================================================
// Fresh fixes
// =========================================================================

#[tokio::test(start_paused = true)]
async fn high_accuracy_fix_at_five_seconds() {
    let platform = Arc::new(
        SimPlatform::new()
            .on_high_accuracy(fix_after(5_000, GPS))
            .on_low_power(fix_after(10, NETWORK)),
    );

    let start = Instant::now();
    let outcome = resolver(&platform).resolve().await;

    assert_eq!(outcome, LocationOutcome::Success(GPS));
    assert_elapsed(start, Duration::from_millis(5_000));
    assert_eq!(platform.requested_tiers(), vec![AccuracyTier::HighAccuracy]);
    assert_eq!(platform.active_subscriptions(), 0);
    assert_eq!(platform.removed().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn both_tiers_time_out() {
    let platform = Arc::new(
        SimPlatform::new()
            .on_high_accuracy(FixScript::Silent)
            .on_low_power(FixScript::Silent),
    );

    let start = Instant::now();
    let outcome = resolver(&platform).resolve().await;

    assert_eq!(outcome, LocationOutcome::Failure(LOCATION_UNAVAILABLE.to_string()));
    assert_elapsed(start, Duration::from_millis(23_000));
    assert_eq!(
        platform.requested_tiers(),
        vec![AccuracyTier::HighAccuracy, AccuracyTier::LowPower]
    );
    assert_eq!(platform.active_subscriptions(), 0);
    assert_eq!(platform.removed().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn low_power_fallback_after_high_accuracy_timeout() {
    let platform = Arc::new(
        SimPlatform::new()
            .on_high_accuracy(FixScript::Silent)
            .on_low_power(fix_after(2_000, NETWORK)),
    );

    let start = Instant::now();
    let outcome = resolver(&platform).resolve().await;

    assert_eq!(outcome, LocationOutcome::Success(NETWORK));
    assert_elapsed(start, Duration::from_millis(17_000));
    assert_eq!(platform.active_subscriptions(), 0);
}

#[tokio::test(start_paused = true)]
async fn null_high_accuracy_fix_falls_through_without_waiting() {
    let platform = Arc::new(
        SimPlatform::new()
            .on_high_accuracy(FixScript::NoFix {
                after: Duration::from_millis(1_000),
            })
            .on_low_power(fix_after(1_000, NETWORK)),
    );

    let start = Instant::now();
    let outcome = resolver(&platform).resolve().await;

    assert_eq!(outcome, LocationOutcome::Success(NETWORK));
    assert_elapsed(start, Duration::from_millis(2_000));
}

#[tokio::test(start_paused = true)]
async fn low_power_failure_is_location_unavailable() {
    let platform = Arc::new(
        SimPlatform::new()
            .on_high_accuracy(FixScript::Reject(PlatformError::Unavailable("gps off".into())))
            .on_low_power(FixScript::Error {
                after: Duration::from_millis(500),
                error: PlatformError::Other("modem reset".into()),
            }),
    );

    let start = Instant::now();
    let outcome = resolver(&platform).resolve().await;

    assert_eq!(outcome, LocationOutcome::Failure(LOCATION_UNAVAILABLE.to_string()));
    assert_elapsed(start, Duration::from_millis(500));
    // The rejected registration was never added, so only one removal.
    assert_eq!(platform.removed().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn update_requests_carry_tier_parameters() {
    let platform = Arc::new(SimPlatform::new());

    resolver(&platform).resolve().await;

    let requests = platform.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests.iter().all(|r| r.num_updates == 1));
    assert_eq!(requests[0].max_wait, Duration::from_millis(10_000));
    assert_eq!(requests[1].max_wait, Duration::from_millis(7_000));
}

#[tokio::test(start_paused = true)]
async fn configured_budgets_bound_the_cascade() {
    let platform = Arc::new(SimPlatform::new());
    let config = LocatorConfig::builder()
        .high_accuracy_timeout(Duration::from_millis(300))
        .low_power_timeout(Duration::from_millis(200))
        .build();

    let start = Instant::now();
    let outcome = LocationResolver::new(platform.clone(), config).resolve().await;

    assert!(!outcome.is_success());
    assert_elapsed(start, Duration::from_millis(500));
}

// =========================================================================
// Permission errors during fresh fixes
// =========================================================================

#[tokio::test(start_paused = true)]
async fn permission_revoked_mid_flight_is_permission_denied() {
    let platform = Arc::new(
        SimPlatform::new()
            .on_high_accuracy(FixScript::Silent)
            .on_low_power(fix_after(10, NETWORK)),
    );
    let resolver = Arc::new(resolver(&platform));

    let task = {
        let resolver = resolver.clone();
        tokio::spawn(async move { resolver.resolve().await })
    };

    tokio::time::sleep(Duration::from_secs(3)).await;
    platform.revoke_permission();

    let outcome = task.await.unwrap();
    assert_eq!(outcome, LocationOutcome::PermissionDenied);
    assert_eq!(platform.requested_tiers(), vec![AccuracyTier::HighAccuracy]);
    assert_eq!(platform.active_subscriptions(), 0);
}

#[tokio::test(start_paused = true)]
async fn rejected_registration_with_permission_error() {
    let platform = Arc::new(
        SimPlatform::new()
            .on_high_accuracy(FixScript::Reject(PlatformError::Permission("SecurityException".into()))),
    );

    let start = Instant::now();
    let outcome = resolver(&platform).resolve().await;

    assert_eq!(outcome, LocationOutcome::PermissionDenied);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn low_power_permission_error_is_permission_denied() {
    let platform = Arc::new(
        SimPlatform::new()
            .on_high_accuracy(FixScript::Silent)
            .on_low_power(FixScript::Error {
                after: Duration::from_millis(1_000),
                error: PlatformError::Permission("revoked".into()),
            }),
    );

    let start = Instant::now();
    let outcome = resolver(&platform).resolve().await;

    assert_eq!(outcome, LocationOutcome::PermissionDenied);
    assert_elapsed(start, Duration::from_millis(16_000));
}

// =========================================================================
// Cancellation
// =========================================================================

#[tokio::test(start_paused = true)]
async fn dropping_resolve_removes_the_registration() {
    let platform = Arc::new(
        SimPlatform::new()
            .on_high_accuracy(fix_after(10_000, GPS))
            .on_low_power(fix_after(10, NETWORK)),
    );
    let resolver = resolver(&platform);

    let cut_short = tokio::time::timeout(Duration::from_secs(2), resolver.resolve()).await;
    assert!(cut_short.is_err());
    assert_eq!(platform.active_subscriptions(), 0);
    assert_eq!(platform.removed().len(), 1);

    // The scripted delivery at 10s finds nothing to deliver into.
    tokio::time::sleep(Duration::from_secs(20)).await;
    assert_eq!(platform.active_subscriptions(), 0);
    assert_eq!(platform.requested_tiers(), vec![AccuracyTier::HighAccuracy]);
}
