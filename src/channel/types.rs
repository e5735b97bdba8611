/*!
 * Channel Types
 * Capacity policy and configuration
 */

use crate::core::errors::ConfigError;
use crate::core::sync::SyncConfig;
use serde::{Deserialize, Serialize};

/// Buffering policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "capacity", rename_all = "snake_case")]
pub enum Capacity {
    /// At most `n` queued items; senders block while full
    Bounded(usize),
    /// Never blocks senders
    Unbounded,
    /// One in-flight item; the sender blocks until a receiver took it
    Rendezvous,
}

impl Capacity {
    /// `Bounded(0)` means rendezvous
    pub const fn normalized(self) -> Self {
        match self {
            Self::Bounded(0) => Self::Rendezvous,
            other => other,
        }
    }

    /// Buffered item limit, `None` when unbounded
    pub const fn limit(self) -> Option<usize> {
        match self {
            Self::Bounded(n) => Some(n),
            Self::Unbounded => None,
            Self::Rendezvous => Some(0),
        }
    }

    /// Can `len` queued items accept one more
    #[inline]
    pub(super) fn has_room(self, len: usize) -> bool {
        match self {
            Self::Bounded(n) => len < n,
            Self::Unbounded => true,
            // Single hand-over slot
            Self::Rendezvous => len == 0,
        }
    }
}

/// Channel configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub capacity: Capacity,
    /// How blocked senders and receivers wait
    #[serde(default)]
    pub wait: SyncConfig,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl ChannelConfig {
    pub fn bounded(capacity: usize) -> Self {
        Self {
            capacity: Capacity::Bounded(capacity).normalized(),
            wait: SyncConfig::default(),
        }
    }

    pub fn unbounded() -> Self {
        Self {
            capacity: Capacity::Unbounded,
            wait: SyncConfig::default(),
        }
    }

    pub fn rendezvous() -> Self {
        Self {
            capacity: Capacity::Rendezvous,
            wait: SyncConfig::default(),
        }
    }

    pub fn with_wait(mut self, wait: SyncConfig) -> Self {
        self.wait = wait;
        self
    }

    /// Check the wait settings
    ///
    /// Every capacity is valid: `Bounded(0)` is a rendezvous channel.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.wait.validate()
    }
}
