/*!
 * Device Configuration
 *
 * Defaults, JSON loading and environment overrides
 */

use crate::core::errors::ConfigError;
use crate::core::sync::SpinConfig;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use std::time::Duration;

pub const ENV_MONITOR_PERIOD_MS: &str = "DEFERRED_MONITOR_PERIOD_MS";
pub const ENV_BLOCKING_IO_MS: &str = "DEFERRED_BLOCKING_IO_MS";
pub const ENV_MAX_MONITORED: &str = "DEFERRED_MAX_MONITORED";
pub const ENV_CALLBACK_SPINS: &str = "DEFERRED_CALLBACK_SPINS";

/// Deferred-work device configuration
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Re-arm period of the process monitor (`TIMER_MON`)
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub monitor_period: Duration,
    /// How long the default blocking procedure sleeps
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub blocking_io: Duration,
    /// Entry pool size of the monitor list
    pub max_monitored: usize,
    pub spin: SpinConfig,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            monitor_period: Duration::from_secs(1),
            blocking_io: Duration::from_secs(5),
            max_monitored: 1024,
            spin: SpinConfig::standard(),
        }
    }
}

impl DeviceConfig {
    /// Short periods for tests and demos
    pub const fn fast() -> Self {
        Self {
            monitor_period: Duration::from_millis(100),
            blocking_io: Duration::from_millis(10),
            max_monitored: 64,
            spin: SpinConfig::low_latency(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Defaults with environment overrides applied
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Some(ms) = env_u64(ENV_MONITOR_PERIOD_MS)? {
            self.monitor_period = Duration::from_millis(ms);
        }
        if let Some(ms) = env_u64(ENV_BLOCKING_IO_MS)? {
            self.blocking_io = Duration::from_millis(ms);
        }
        if let Some(max) = env_u64(ENV_MAX_MONITORED)? {
            self.max_monitored = usize::try_from(max).map_err(|_| ConfigError::InvalidEnv {
                key: ENV_MAX_MONITORED,
                value: max.to_string(),
            })?;
        }
        if let Some(spins) = env_u64(ENV_CALLBACK_SPINS)? {
            self.spin.atomic_spins = u32::try_from(spins).map_err(|_| ConfigError::InvalidEnv {
                key: ENV_CALLBACK_SPINS,
                value: spins.to_string(),
            })?;
        }
        Ok(self)
    }
}

fn env_u64(key: &'static str) -> Result<Option<u64>, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { key, value }),
        Err(_) => Ok(None),
    }
}
