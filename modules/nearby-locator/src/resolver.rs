//! Best-effort location resolution.
//!
//! Preconditions first (permission, then service availability), then the
//! acquisition cascade, short-circuiting on the first fix:
//!
//! 1. last known location from the platform cache
//! 2. fresh high-accuracy fix, bounded by `high_accuracy_timeout`
//! 3. fresh low-power fix, bounded by `low_power_timeout`
//!
//! Steps run strictly in sequence. A permission error from either fresh step
//! ends resolution with `PermissionDenied`.

use std::sync::Arc;
use std::time::Duration;

use nearby_common::{Coordinate, LocatorConfig};
use tracing::{debug, info, warn};

use crate::fix::request_one_update;
use crate::platform::{AccuracyTier, LocationPlatform, UpdateRequest};

/// Failure reason when every acquisition step came up empty.
pub const LOCATION_UNAVAILABLE: &str = "LOCATION_UNAVAILABLE";

/// Terminal result of one `resolve()` call.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationOutcome {
    Success(Coordinate),
    PermissionDenied,
    ServiceDisabled,
    Failure(String),
}

impl LocationOutcome {
    pub fn coordinate(&self) -> Option<Coordinate> {
        match self {
            LocationOutcome::Success(c) => Some(*c),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, LocationOutcome::Success(_))
    }
}

/// Result of a single fresh-fix step.
enum FreshFix {
    Fix(Coordinate),
    PermissionDenied,
    Missed,
}

pub struct LocationResolver {
    platform: Arc<dyn LocationPlatform>,
    config: LocatorConfig,
}

impl LocationResolver {
    pub fn new(platform: Arc<dyn LocationPlatform>, config: LocatorConfig) -> Self {
        Self { platform, config }
    }

    pub fn config(&self) -> &LocatorConfig {
        &self.config
    }

    pub fn platform(&self) -> &Arc<dyn LocationPlatform> {
        &self.platform
    }

    /// Acquire the best available coordinate.
    ///
    /// Cancel-safe: dropping the future mid-fix removes the platform
    /// registration.
    pub async fn resolve(&self) -> LocationOutcome {
        if !self.platform.has_permission() {
            debug!("Location permission not granted");
            return LocationOutcome::PermissionDenied;
        }
        if !self.platform.is_location_service_enabled() {
            debug!("Location services disabled");
            return LocationOutcome::ServiceDisabled;
        }

        match self.platform.cached_location().await {
            Ok(Some(c)) => {
                info!(lat = c.latitude, lng = c.longitude, "Using last known location");
                return LocationOutcome::Success(c);
            }
            Ok(None) => debug!("Last known location is null, trying fresh fix"),
            Err(e) => debug!(error = %e, "Last known location failed, trying fresh fix"),
        }

        match self.fresh_fix(AccuracyTier::HighAccuracy).await {
            FreshFix::Fix(c) => return LocationOutcome::Success(c),
            FreshFix::PermissionDenied => return LocationOutcome::PermissionDenied,
            FreshFix::Missed => {
                info!("High-accuracy fix timed out or failed, trying low-power fallback")
            }
        }

        match self.fresh_fix(AccuracyTier::LowPower).await {
            FreshFix::Fix(c) => LocationOutcome::Success(c),
            FreshFix::PermissionDenied => LocationOutcome::PermissionDenied,
            FreshFix::Missed => {
                warn!("All location methods failed");
                LocationOutcome::Failure(LOCATION_UNAVAILABLE.to_string())
            }
        }
    }

    async fn fresh_fix(&self, tier: AccuracyTier) -> FreshFix {
        let request = UpdateRequest::single(tier, &self.config);
        let budget = self.budget(tier);

        match tokio::time::timeout(budget, request_one_update(self.platform.as_ref(), request)).await
        {
            Ok(Ok(c)) => {
                info!(tier = %tier, lat = c.latitude, lng = c.longitude, "Fresh fix acquired");
                FreshFix::Fix(c)
            }
            Ok(Err(e)) if e.is_permission() => {
                warn!(tier = %tier, error = %e, "Permission lost during fresh fix");
                FreshFix::PermissionDenied
            }
            Ok(Err(e)) => {
                debug!(tier = %tier, error = %e, "Fresh fix failed");
                FreshFix::Missed
            }
            Err(_) => {
                debug!(tier = %tier, ?budget, "Fresh fix timed out");
                FreshFix::Missed
            }
        }
    }

    fn budget(&self, tier: AccuracyTier) -> Duration {
        match tier {
            AccuracyTier::HighAccuracy => self.config.high_accuracy_timeout,
            AccuracyTier::LowPower => self.config.low_power_timeout,
        }
    }
}
