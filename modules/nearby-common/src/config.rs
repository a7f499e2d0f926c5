use std::time::Duration;

use anyhow::Result;
use typed_builder::TypedBuilder;

use crate::error::NearbyError;

/// Timing budget and update-request parameters for location resolution.
///
/// Defaults reproduce the production cascade: 15s for a high-accuracy fix,
/// then 8s for a low-power fix.
#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder)]
pub struct LocatorConfig {
    #[builder(default = Duration::from_millis(15_000))]
    pub high_accuracy_timeout: Duration,
    #[builder(default = Duration::from_millis(8_000))]
    pub low_power_timeout: Duration,

    // Passed through to the platform's update request.
    #[builder(default = Duration::from_millis(2_000))]
    pub update_interval: Duration,
    #[builder(default = Duration::from_millis(1_000))]
    pub fastest_interval: Duration,
    #[builder(default = Duration::from_millis(10_000))]
    pub high_accuracy_max_wait: Duration,
    #[builder(default = Duration::from_millis(7_000))]
    pub low_power_max_wait: Duration,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl LocatorConfig {
    /// Load configuration from the environment (and `.env` if present).
    /// Unset variables keep their defaults; malformed values are errors.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self::from_lookup(|key| std::env::var(key).ok())?;
        config.log_values();
        Ok(config)
    }

    /// Build a config from an arbitrary key lookup. `from_env` uses the
    /// process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let millis = |key: &str, default: Duration| -> Result<Duration> {
            match lookup(key) {
                None => Ok(default),
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .map(Duration::from_millis)
                    .map_err(|_| {
                        anyhow::Error::from(NearbyError::Config(format!(
                            "{key} must be a number of milliseconds, got {raw:?}"
                        )))
                    }),
            }
        };

        Ok(Self {
            high_accuracy_timeout: millis(
                "NEARBY_HIGH_ACCURACY_TIMEOUT_MS",
                defaults.high_accuracy_timeout,
            )?,
            low_power_timeout: millis("NEARBY_LOW_POWER_TIMEOUT_MS", defaults.low_power_timeout)?,
            update_interval: millis("NEARBY_UPDATE_INTERVAL_MS", defaults.update_interval)?,
            fastest_interval: millis("NEARBY_FASTEST_INTERVAL_MS", defaults.fastest_interval)?,
            high_accuracy_max_wait: millis(
                "NEARBY_HIGH_ACCURACY_MAX_WAIT_MS",
                defaults.high_accuracy_max_wait,
            )?,
            low_power_max_wait: millis(
                "NEARBY_LOW_POWER_MAX_WAIT_MS",
                defaults.low_power_max_wait,
            )?,
        })
    }

    /// Upper bound on a fresh-fix resolution, excluding the cache lookup.
    pub fn fresh_fix_budget(&self) -> Duration {
        self.high_accuracy_timeout + self.low_power_timeout
    }

    fn log_values(&self) {
        tracing::info!("Locator config loaded:");
        tracing::info!("  high accuracy timeout: {:?}", self.high_accuracy_timeout);
        tracing::info!("  low power timeout: {:?}", self.low_power_timeout);
        tracing::info!(
            "  update interval: {:?} (fastest {:?})",
            self.update_interval,
            self.fastest_interval
        );
        tracing::info!(
            "  max wait: {:?} high accuracy, {:?} low power",
            self.high_accuracy_max_wait,
            self.low_power_max_wait
        );
    }
}
