/*!
 * Scheduler Configuration
 *
 * Environment variables (read by `SchedulerConfig::from_env`):
 * - TOOLKIT_WORKERS: worker thread count
 * - TOOLKIT_VICTIM_POLICY: `random` or `round_robin`
 */

use super::types::VictimPolicy;
use crate::core::errors::ConfigError;
use crate::core::limits::{DEFAULT_LOCAL_QUEUE_CAPACITY, DEFAULT_WORKER_NAME, MAX_WORKERS};
use crate::core::sync::StrategyType;
use serde::{Deserialize, Serialize};

pub const ENV_WORKERS: &str = "TOOLKIT_WORKERS";
pub const ENV_VICTIM_POLICY: &str = "TOOLKIT_VICTIM_POLICY";

/// Work-stealing scheduler configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Worker thread count (>= 1)
    pub workers: usize,
    pub victim_policy: VictimPolicy,
    /// Per-worker deque length before submissions overflow to the injector
    pub local_capacity: usize,
    /// Injector bound; `None` = unbounded
    pub injector_capacity: Option<usize>,
    /// Worker thread name prefix (`{thread_name}-{index}`)
    pub thread_name: String,
    /// How idle workers wait for new work
    pub idle_strategy: StrategyType,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .min(MAX_WORKERS);

        Self {
            workers,
            victim_policy: VictimPolicy::Random,
            local_capacity: DEFAULT_LOCAL_QUEUE_CAPACITY,
            injector_capacity: None,
            thread_name: DEFAULT_WORKER_NAME.to_string(),
            idle_strategy: StrategyType::Park,
        }
    }
}

impl SchedulerConfig {
    /// Default configuration with `workers` threads
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers,
            ..Self::default()
        }
    }

    /// Defaults overridden by `TOOLKIT_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var(ENV_WORKERS) {
            config.workers = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                field: "workers",
                value: raw.clone(),
            })?;
        }

        if let Ok(raw) = std::env::var(ENV_VICTIM_POLICY) {
            config.victim_policy = raw.trim().parse()?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::OutOfRange {
                field: "workers",
                value: 0,
                min: 1,
            });
        }
        if self.workers > MAX_WORKERS {
            return Err(ConfigError::InvalidValue {
                field: "workers",
                value: format!("{} exceeds the maximum of {}", self.workers, MAX_WORKERS),
            });
        }
        if self.local_capacity == 0 {
            return Err(ConfigError::OutOfRange {
                field: "local_capacity",
                value: 0,
                min: 1,
            });
        }
        if self.injector_capacity == Some(0) {
            return Err(ConfigError::OutOfRange {
                field: "injector_capacity",
                value: 0,
                min: 1,
            });
        }
        if self.thread_name.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "thread_name",
                value: String::new(),
            });
        }
        Ok(())
    }
}
