/*!
 * Channel Handles
 * Cloneable sending and receiving ends
 */

use super::chan::Chan;
use super::error::{
    RecvError, RecvTimeoutError, SendError, SendTimeoutError, TryRecvError, TrySendError,
};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Sending end; clone for more producers
pub struct Sender<T> {
    chan: Arc<Chan<T>>,
}

/// Receiving end; clone for more consumers (each item goes to exactly one)
pub struct Receiver<T> {
    chan: Arc<Chan<T>>,
}

pub(super) fn pair<T>(chan: Chan<T>) -> (Sender<T>, Receiver<T>) {
    let chan = Arc::new(chan);
    (
        Sender { chan: chan.clone() },
        Receiver { chan },
    )
}

macro_rules! impl_state_queries {
    ($handle:ident) => {
        impl<T> $handle<T> {
            /// Close the channel for every handle (idempotent)
            ///
            /// Blocked senders and receivers wake up. Items already queued
            /// stay receivable. Returns true if this call closed it.
            pub fn close(&self) -> bool {
                self.chan.close()
            }

            pub fn is_closed(&self) -> bool {
                self.chan.is_closed()
            }

            /// Number of queued items
            pub fn len(&self) -> usize {
                self.chan.len()
            }

            pub fn is_empty(&self) -> bool {
                self.len() == 0
            }

            pub fn is_full(&self) -> bool {
                self.chan.is_full()
            }

            /// Buffer limit: `None` when unbounded, `Some(0)` for rendezvous
            pub fn capacity(&self) -> Option<usize> {
                self.chan.capacity()
            }

            pub fn sender_count(&self) -> usize {
                self.chan.sender_count()
            }

            pub fn receiver_count(&self) -> usize {
                self.chan.receiver_count()
            }

            /// True if both handles belong to the same channel
            pub fn same_channel(&self, other: &Self) -> bool {
                Arc::ptr_eq(&self.chan, &other.chan)
            }
        }

        impl<T> fmt::Debug for $handle<T> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($handle))
                    .field("len", &self.len())
                    .field("capacity", &self.capacity())
                    .field("closed", &self.is_closed())
                    .finish()
            }
        }
    };
}

impl_state_queries!(Sender);
impl_state_queries!(Receiver);

impl<T> Sender<T> {
    /// Enqueue `value`, blocking while a bounded buffer is full
    ///
    /// On a rendezvous channel this also waits until a receiver has taken
    /// the value. Fails only when the channel is closed.
    pub fn send(&self, value: T) -> Result<(), SendError<T>> {
        self.chan.send(value, None).map_err(|err| SendError(err.into_inner()))
    }

    /// Enqueue without blocking
    pub fn try_send(&self, value: T) -> Result<(), TrySendError<T>> {
        self.chan.try_send(value)
    }

    pub fn send_timeout(&self, value: T, timeout: Duration) -> Result<(), SendTimeoutError<T>> {
        self.chan.send(value, Some(Instant::now() + timeout))
    }

    pub fn send_deadline(&self, value: T, deadline: Instant) -> Result<(), SendTimeoutError<T>> {
        self.chan.send(value, Some(deadline))
    }
}

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Self {
        self.chan.add_sender();
        Self {
            chan: self.chan.clone(),
        }
    }
}

impl<T> Drop for Sender<T> {
    fn drop(&mut self) {
        self.chan.remove_sender();
    }
}

impl<T> Receiver<T> {
    /// Block until an item arrives; `Err` once closed and drained
    pub fn recv(&self) -> Result<T, RecvError> {
        self.chan.recv(None).map_err(|_| RecvError)
    }

    pub fn try_recv(&self) -> Result<T, TryRecvError> {
        self.chan.try_recv()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<T, RecvTimeoutError> {
        self.chan.recv(Some(Instant::now() + timeout))
    }

    pub fn recv_deadline(&self, deadline: Instant) -> Result<T, RecvTimeoutError> {
        self.chan.recv(Some(deadline))
    }

    /// Blocking iterator; ends when the channel is closed and drained
    pub fn iter(&self) -> Iter<'_, T> {
        Iter { receiver: self }
    }

    /// Iterator over the items available right now
    pub fn try_iter(&self) -> TryIter<'_, T> {
        TryIter { receiver: self }
    }
}

impl<T> Clone for Receiver<T> {
    fn clone(&self) -> Self {
        self.chan.add_receiver();
        Self {
            chan: self.chan.clone(),
        }
    }
}

impl<T> Drop for Receiver<T> {
    fn drop(&mut self) {
        self.chan.remove_receiver();
    }
}

/// Blocking iterator over a `Receiver`
pub struct Iter<'a, T> {
    receiver: &'a Receiver<T>,
}

impl<T> Iterator for Iter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.receiver.recv().ok()
    }
}

/// Non-blocking iterator over a `Receiver`
pub struct TryIter<'a, T> {
    receiver: &'a Receiver<T>,
}

impl<T> Iterator for TryIter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.receiver.try_recv().ok()
    }
}

/// Owning blocking iterator
pub struct IntoIter<T> {
    receiver: Receiver<T>,
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.receiver.recv().ok()
    }
}

impl<'a, T> IntoIterator for &'a Receiver<T> {
    type Item = T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

impl<T> IntoIterator for Receiver<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> IntoIter<T> {
        IntoIter { receiver: self }
    }
}
