/*!
 * Scheduler Types
 * Domain types for work-stealing scheduling
 */

use crate::core::errors::ConfigError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// How an idle worker picks the peer to steal from
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VictimPolicy {
    /// Per-worker xorshift choice of the first victim
    #[default]
    Random,
    /// Rotate through peers, one step per steal attempt
    RoundRobin,
}

impl VictimPolicy {
    /// Convert to string representation
    #[inline(always)]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Random => "random",
            Self::RoundRobin => "round_robin",
        }
    }
}

impl FromStr for VictimPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "random" | "rand" => Ok(Self::Random),
            "round_robin" | "roundrobin" | "rr" => Ok(Self::RoundRobin),
            _ => Err(ConfigError::InvalidValue {
                field: "victim_policy",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for VictimPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for VictimPolicy {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for VictimPolicy {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// Observable worker state
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    /// Parked, waiting for work or shutdown
    Idle = 0,
    /// Executing a task
    Running = 1,
    /// Searching peers for work
    Stealing = 2,
}

impl WorkerState {
    #[inline(always)]
    pub(super) const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Running,
            2 => Self::Stealing,
            _ => Self::Idle,
        }
    }
}

/// Point-in-time counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    /// Tasks accepted by `submit`/`submit_with_result`
    pub submitted: u64,
    /// Tasks that ran to completion
    pub completed: u64,
    /// Tasks whose failure was caught and isolated
    pub failed: u64,
    /// Tasks taken from a peer's deque
    pub stolen: u64,
}

impl SchedulerStats {
    /// Tasks accepted but not finished yet
    #[inline]
    pub const fn outstanding(&self) -> u64 {
        self.submitted
            .saturating_sub(self.completed)
            .saturating_sub(self.failed)
    }
}
