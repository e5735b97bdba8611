/*!
 * Synchronization Configuration
 *
 * Runtime configuration for wait strategy selection
 *
 * Environment variables (read by `SyncConfig::from_env`):
 * - TOOLKIT_WAIT_STRATEGY: `park`, `spin` or `auto`
 * - TOOLKIT_MAX_SPINS: spin iterations before parking
 */

use crate::core::errors::ConfigError;
use crate::core::limits::{DEFAULT_MAX_SPINS, DEFAULT_SPIN_DURATION};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const ENV_WAIT_STRATEGY: &str = "TOOLKIT_WAIT_STRATEGY";
pub const ENV_MAX_SPINS: &str = "TOOLKIT_MAX_SPINS";

/// Strategy type selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyType {
    /// Park immediately on the process-wide parking table (FIFO)
    Park,
    /// Spin with exponential backoff, then park
    Spin,
    /// Auto-select based on platform
    Auto,
}

impl StrategyType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Park => "park",
            Self::Spin => "spin",
            Self::Auto => "auto",
        }
    }
}

impl fmt::Display for StrategyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "park" => Ok(Self::Park),
            "spin" => Ok(Self::Spin),
            "auto" => Ok(Self::Auto),
            _ => Err(ConfigError::InvalidValue {
                field: "strategy",
                value: s.to_string(),
            }),
        }
    }
}

/// Synchronization configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Preferred strategy
    pub strategy: StrategyType,
    /// Spin duration before parking (for Spin)
    pub spin_duration: Duration,
    /// Maximum spin iterations before parking (for Spin)
    pub max_spins: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyType::Auto,
            spin_duration: DEFAULT_SPIN_DURATION,
            max_spins: DEFAULT_MAX_SPINS,
        }
    }
}

impl SyncConfig {
    /// Configuration optimized for low-latency (< 1ms wait expected)
    pub const fn low_latency() -> Self {
        Self {
            strategy: StrategyType::Spin,
            spin_duration: Duration::from_micros(50),
            max_spins: 500,
        }
    }

    /// Configuration optimized for long waits (> 1ms expected)
    pub const fn long_wait() -> Self {
        Self {
            strategy: StrategyType::Park,
            spin_duration: Duration::from_micros(1),
            max_spins: 10,
        }
    }

    /// Defaults overridden by `TOOLKIT_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var(ENV_WAIT_STRATEGY) {
            config.strategy = raw.trim().parse()?;
        }

        if let Ok(raw) = std::env::var(ENV_MAX_SPINS) {
            config.max_spins = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                field: "max_spins",
                value: raw.clone(),
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// A strategy that may spin needs a non-empty spin budget
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.strategy == StrategyType::Park {
            return Ok(());
        }
        if self.max_spins == 0 {
            return Err(ConfigError::OutOfRange {
                field: "max_spins",
                value: 0,
                min: 1,
            });
        }
        if self.spin_duration.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "spin_duration",
                value: format!("{:?}", self.spin_duration),
            });
        }
        Ok(())
    }

    /// Resolve `Auto` to a concrete strategy
    pub fn select_strategy(&self) -> StrategyType {
        match self.strategy {
            // Spinning only pays off with real parallelism
            StrategyType::Auto => {
                let parallel = std::thread::available_parallelism()
                    .map(|n| n.get() > 1)
                    .unwrap_or(false);
                if parallel {
                    StrategyType::Spin
                } else {
                    StrategyType::Park
                }
            }
            other => other,
        }
    }
}
