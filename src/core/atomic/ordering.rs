/*!
 * Memory Ordering Tokens
 *
 * Caller-selected ordering strength for every primitive that touches shared
 * memory directly. Tokens map onto `std::sync::atomic::Ordering`.
 *
 * # Pairing
 *
 * An `Acquire` read only establishes happens-before with a `Release` (or
 * stronger) write on the other side. Mismatched pairs are a documented
 * misuse, not a detected error.
 *
 * # Access-kind weakening
 *
 * Some orderings are meaningless for some accesses (a `Release` load, an
 * `Acquire` store). Instead of faulting, tokens degrade to the strongest
 * ordering legal for the access.
 */

use crate::core::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::Ordering;

/// Memory-ordering strength
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderingToken {
    /// Atomicity only, no ordering with other memory operations
    Relaxed,
    /// Later reads/writes cannot move before this load
    Acquire,
    /// Earlier reads/writes cannot move after this store
    Release,
    /// Acquire on the load half, Release on the store half
    AcqRel,
    /// AcqRel plus a single total order across all SeqCst operations
    #[default]
    SeqCst,
}

impl OrderingToken {
    /// Ordering to use for a pure load
    #[inline(always)]
    pub const fn for_load(self) -> Ordering {
        match self {
            Self::Relaxed | Self::Release => Ordering::Relaxed,
            Self::Acquire | Self::AcqRel => Ordering::Acquire,
            Self::SeqCst => Ordering::SeqCst,
        }
    }

    /// Ordering to use for a pure store
    #[inline(always)]
    pub const fn for_store(self) -> Ordering {
        match self {
            Self::Relaxed | Self::Acquire => Ordering::Relaxed,
            Self::Release | Self::AcqRel => Ordering::Release,
            Self::SeqCst => Ordering::SeqCst,
        }
    }

    /// Ordering to use for read-modify-write operations (always legal)
    #[inline(always)]
    pub const fn for_rmw(self) -> Ordering {
        match self {
            Self::Relaxed => Ordering::Relaxed,
            Self::Acquire => Ordering::Acquire,
            Self::Release => Ordering::Release,
            Self::AcqRel => Ordering::AcqRel,
            Self::SeqCst => Ordering::SeqCst,
        }
    }

    /// Ordering to use for the failure path of a compare-exchange
    #[inline(always)]
    pub const fn for_failure(self) -> Ordering {
        self.for_load()
    }

    /// True if loads under this token synchronize with Release stores
    #[inline]
    pub const fn is_acquire(self) -> bool {
        matches!(self, Self::Acquire | Self::AcqRel | Self::SeqCst)
    }

    /// True if stores under this token publish earlier writes
    #[inline]
    pub const fn is_release(self) -> bool {
        matches!(self, Self::Release | Self::AcqRel | Self::SeqCst)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Relaxed => "relaxed",
            Self::Acquire => "acquire",
            Self::Release => "release",
            Self::AcqRel => "acq_rel",
            Self::SeqCst => "seq_cst",
        }
    }
}

impl From<OrderingToken> for Ordering {
    #[inline(always)]
    fn from(token: OrderingToken) -> Self {
        token.for_rmw()
    }
}

impl fmt::Display for OrderingToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderingToken {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "relaxed" => Ok(Self::Relaxed),
            "acquire" => Ok(Self::Acquire),
            "release" => Ok(Self::Release),
            "acq_rel" | "acqrel" => Ok(Self::AcqRel),
            "seq_cst" | "seqcst" => Ok(Self::SeqCst),
            other => Err(ConfigError::InvalidValue {
                field: "ordering",
                value: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_weakening() {
        assert_eq!(OrderingToken::Release.for_load(), Ordering::Relaxed);
        assert_eq!(OrderingToken::AcqRel.for_load(), Ordering::Acquire);
        assert_eq!(OrderingToken::SeqCst.for_load(), Ordering::SeqCst);
    }

    #[test]
    fn test_store_weakening() {
        assert_eq!(OrderingToken::Acquire.for_store(), Ordering::Relaxed);
        assert_eq!(OrderingToken::AcqRel.for_store(), Ordering::Release);
    }

    #[test]
    fn test_parse_roundtrip() {
        for token in [
            OrderingToken::Relaxed,
            OrderingToken::Acquire,
            OrderingToken::Release,
            OrderingToken::AcqRel,
            OrderingToken::SeqCst,
        ] {
            assert_eq!(token.as_str().parse::<OrderingToken>().unwrap(), token);
        }
        assert!("sequential".parse::<OrderingToken>().is_err());
    }

    #[test]
    fn test_classification() {
        assert!(OrderingToken::Acquire.is_acquire());
        assert!(!OrderingToken::Acquire.is_release());
        assert!(OrderingToken::SeqCst.is_acquire() && OrderingToken::SeqCst.is_release());
        assert!(!OrderingToken::Relaxed.is_acquire());
    }
}
