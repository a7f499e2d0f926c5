// Trait abstractions for the device's location stack.
//
// LocationPlatform: permission/service checks, last-known fix, and push-style
//   update registration. The resolver only ever talks to this trait.
// PermissionPrompter: the UI's permission dialog.
//
// Production bindings live with the mobile bridge; tests and the CLI use the
// scripted SimPlatform in `sim.rs`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use nearby_common::{Coordinate, LocatorConfig};
use thiserror::Error;

use crate::fix::FixSink;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Location request mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccuracyTier {
    /// GPS-based.
    HighAccuracy,
    /// Network/cell-based.
    LowPower,
}

impl std::fmt::Display for AccuracyTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccuracyTier::HighAccuracy => write!(f, "high_accuracy"),
            AccuracyTier::LowPower => write!(f, "low_power"),
        }
    }
}

/// Parameters for a single update registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRequest {
    pub tier: AccuracyTier,
    pub num_updates: u32,
    pub interval: Duration,
    pub fastest_interval: Duration,
    pub max_wait: Duration,
}

impl UpdateRequest {
    /// A request for exactly one update at the given tier.
    pub fn single(tier: AccuracyTier, config: &LocatorConfig) -> Self {
        let max_wait = match tier {
            AccuracyTier::HighAccuracy => config.high_accuracy_max_wait,
            AccuracyTier::LowPower => config.low_power_max_wait,
        };
        Self {
            tier,
            num_updates: 1,
            interval: config.update_interval,
            fastest_interval: config.fastest_interval,
            max_wait,
        }
    }
}

/// Handle for an active update registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlatformError {
    #[error("Location permission denied: {0}")]
    Permission(String),

    #[error("Location result was null")]
    NoFix,

    #[error("Location provider unavailable: {0}")]
    Unavailable(String),

    #[error("Platform error: {0}")]
    Other(String),
}

impl PlatformError {
    pub fn is_permission(&self) -> bool {
        matches!(self, PlatformError::Permission(_))
    }
}

// ---------------------------------------------------------------------------
// LocationPlatform
// ---------------------------------------------------------------------------

#[async_trait]
pub trait LocationPlatform: Send + Sync {
    /// Fine or coarse location permission is granted.
    fn has_permission(&self) -> bool;

    /// At least one location provider (GPS or network) is enabled.
    fn is_location_service_enabled(&self) -> bool;

    /// The platform's most recently cached fix, if any.
    async fn cached_location(&self) -> Result<Option<Coordinate>, PlatformError>;

    /// Register for location updates. The platform pushes results into `sink`
    /// until the registration is removed. A synchronous permission failure is
    /// returned as `PlatformError::Permission`.
    fn request_location_updates(
        &self,
        request: UpdateRequest,
        sink: Arc<FixSink>,
    ) -> Result<SubscriptionId, PlatformError>;

    /// Remove a registration. Removing an unknown or already removed id is a no-op.
    fn remove_location_updates(&self, id: SubscriptionId);
}

// ---------------------------------------------------------------------------
// PermissionPrompter
// ---------------------------------------------------------------------------

#[async_trait]
pub trait PermissionPrompter: Send + Sync {
    /// Show the permission dialog once and report the user's answer.
    async fn prompt(&self) -> Result<PermissionStatus, PlatformError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_request_uses_tier_max_wait() {
        let config = LocatorConfig::default();

        let high = UpdateRequest::single(AccuracyTier::HighAccuracy, &config);
        assert_eq!(high.num_updates, 1);
        assert_eq!(high.interval, Duration::from_millis(2000));
        assert_eq!(high.fastest_interval, Duration::from_millis(1000));
        assert_eq!(high.max_wait, Duration::from_millis(10_000));

        let low = UpdateRequest::single(AccuracyTier::LowPower, &config);
        assert_eq!(low.tier, AccuracyTier::LowPower);
        assert_eq!(low.max_wait, Duration::from_millis(7_000));
    }

    #[test]
    fn null_fix_message_mentions_null() {
        // The session maps reasons containing "null" to LOCATION_UNAVAILABLE.
        assert!(PlatformError::NoFix.to_string().contains("null"));
        assert!(PlatformError::Permission("revoked".into()).is_permission());
        assert!(!PlatformError::Other("boom".into()).is_permission());
    }
}
