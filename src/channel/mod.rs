/*!
 * Channels
 *
 * Multi-producer multi-consumer FIFO transport with backpressure:
 * - `bounded(n)`: at most `n` queued items, senders block while full
 * - `unbounded()`: senders never block
 * - `rendezvous()` / `bounded(0)`: the sender blocks until a receiver has
 *   taken the value
 *
 * Arrival order is the order in which enqueues complete inside the
 * channel's exclusive section; there is no per-producer ordering across
 * producers.
 *
 * Closing is a normal termination signal: receivers drain whatever is still
 * queued and then observe `Closed`.
 */

mod chan;
mod error;
mod handles;
mod types;

pub use error::{
    RecvError, RecvTimeoutError, SendError, SendTimeoutError, TryRecvError, TrySendError,
};
pub use handles::{IntoIter, Iter, Receiver, Sender, TryIter};
pub use types::{Capacity, ChannelConfig};

use chan::Chan;

/// Channel holding at most `capacity` items (`0` means rendezvous)
pub fn bounded<T>(capacity: usize) -> (Sender<T>, Receiver<T>) {
    channel(ChannelConfig::bounded(capacity))
}

/// Channel whose senders never block
pub fn unbounded<T>() -> (Sender<T>, Receiver<T>) {
    channel(ChannelConfig::unbounded())
}

/// Synchronous hand-over channel
pub fn rendezvous<T>() -> (Sender<T>, Receiver<T>) {
    channel(ChannelConfig::rendezvous())
}

/// Channel from an explicit configuration
///
/// `Capacity::Bounded(0)` builds a rendezvous channel, as `bounded(0)` does.
///
/// # Example
///
/// ```
/// use concurrency_toolkit::channel::{self, ChannelConfig, TrySendError};
///
/// let (tx, rx) = channel::channel(ChannelConfig::bounded(2));
/// tx.try_send(1).unwrap();
/// tx.try_send(2).unwrap();
/// assert!(matches!(tx.try_send(3), Err(TrySendError::Full(3))));
///
/// assert_eq!(rx.recv(), Ok(1));
/// tx.try_send(3).unwrap();
/// ```
pub fn channel<T>(config: ChannelConfig) -> (Sender<T>, Receiver<T>) {
    handles::pair(Chan::new(config))
}
