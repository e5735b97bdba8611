/*!
 * Channel Errors
 *
 * Full, empty and closed are normal outcomes. Send-side errors hand the
 * unsent value back; `Debug`/`Display` are written by hand so `T` needs no
 * bounds.
 */

use std::{error, fmt};
use thiserror::Error;

/// `send` failed because the channel is closed; carries the value back
#[derive(PartialEq, Eq, Clone, Copy)]
pub struct SendError<T>(pub T);

impl<T> SendError<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for SendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendError").finish_non_exhaustive()
    }
}

impl<T> fmt::Display for SendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("sending on a closed channel")
    }
}

impl<T> error::Error for SendError<T> {}

/// Non-blocking send outcome
#[derive(PartialEq, Eq, Clone, Copy)]
pub enum TrySendError<T> {
    /// Buffer full (or, for rendezvous, the slot is taken)
    Full(T),
    Closed(T),
}

impl<T> TrySendError<T> {
    pub fn into_inner(self) -> T {
        match self {
            Self::Full(value) | Self::Closed(value) => value,
        }
    }

    pub fn is_full(&self) -> bool {
        matches!(self, Self::Full(_))
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed(_))
    }
}

impl<T> fmt::Debug for TrySendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full(..) => f.write_str("Full(..)"),
            Self::Closed(..) => f.write_str("Closed(..)"),
        }
    }
}

impl<T> fmt::Display for TrySendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full(..) => f.write_str("sending on a full channel"),
            Self::Closed(..) => f.write_str("sending on a closed channel"),
        }
    }
}

impl<T> error::Error for TrySendError<T> {}

impl<T> From<SendError<T>> for TrySendError<T> {
    fn from(err: SendError<T>) -> Self {
        Self::Closed(err.0)
    }
}

/// Timed send outcome
#[derive(PartialEq, Eq, Clone, Copy)]
pub enum SendTimeoutError<T> {
    Timeout(T),
    Closed(T),
}

impl<T> SendTimeoutError<T> {
    pub fn into_inner(self) -> T {
        match self {
            Self::Timeout(value) | Self::Closed(value) => value,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

impl<T> fmt::Debug for SendTimeoutError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout(..) => f.write_str("Timeout(..)"),
            Self::Closed(..) => f.write_str("Closed(..)"),
        }
    }
}

impl<T> fmt::Display for SendTimeoutError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout(..) => f.write_str("timed out waiting on send operation"),
            Self::Closed(..) => f.write_str("sending on a closed channel"),
        }
    }
}

impl<T> error::Error for SendTimeoutError<T> {}

impl<T> From<SendError<T>> for SendTimeoutError<T> {
    fn from(err: SendError<T>) -> Self {
        Self::Closed(err.0)
    }
}

/// `recv` found the channel closed and drained
#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
#[error("receiving on a closed channel")]
pub struct RecvError;

/// Non-blocking receive outcome
#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
pub enum TryRecvError {
    #[error("receiving on an empty channel")]
    Empty,
    #[error("receiving on a closed channel")]
    Closed,
}

/// Timed receive outcome
#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
pub enum RecvTimeoutError {
    #[error("timed out waiting on receive operation")]
    Timeout,
    #[error("receiving on a closed channel")]
    Closed,
}

impl From<RecvError> for TryRecvError {
    fn from(_: RecvError) -> Self {
        Self::Closed
    }
}

impl From<RecvError> for RecvTimeoutError {
    fn from(_: RecvError) -> Self {
        Self::Closed
    }
}
