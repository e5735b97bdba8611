/*!
 * Channel Core
 *
 * State shared by every handle of one channel.
 *
 * # Blocking Protocol
 *
 * The queue lives inside an `ExclusiveLock`. Each side has an epoch counter
 * that is bumped (under the lock) whenever something it may be waiting for
 * changes:
 * - `recv_epoch`: item pushed, channel closed
 * - `send_epoch`: item taken, channel closed
 *
 * A blocked caller reads the epoch while holding the lock, releases it, and
 * waits on the `WaitQueue` while the epoch is unchanged. The wait queue
 * re-validates that predicate immediately before sleeping, so a bump that
 * lands between the unlock and the sleep is never missed.
 */

use super::error::{RecvTimeoutError, SendTimeoutError, TryRecvError, TrySendError};
use super::types::{Capacity, ChannelConfig};
use crate::core::atomic::AtomicCell;
use crate::core::atomic::OrderingToken::{Acquire, Release};
use crate::core::sync::{ExclusiveLock, LockGuard, WaitQueue};
use std::collections::VecDeque;
use std::time::Instant;

/// Wait-queue key per side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Side {
    Receivers,
    Senders,
}

struct State<T> {
    queue: VecDeque<T>,
    closed: bool,
    senders: usize,
    receivers: usize,
    /// Items enqueued and not handed back; a rendezvous send's ticket
    pushed: u64,
    /// Items ever dequeued
    taken: u64,
}

pub(super) struct Chan<T> {
    state: ExclusiveLock<State<T>>,
    capacity: Capacity,
    recv_epoch: AtomicCell<u64>,
    send_epoch: AtomicCell<u64>,
    waiters: WaitQueue<Side>,
}

enum Blocked<T> {
    Timeout(T),
    Closed(T),
}

impl<T> Chan<T> {
    pub(super) fn new(config: ChannelConfig) -> Self {
        let capacity = config.capacity.normalized();
        let queue = match capacity.limit() {
            Some(n) => VecDeque::with_capacity(n.max(1)),
            None => VecDeque::new(),
        };

        Self {
            state: ExclusiveLock::new(State {
                queue,
                closed: false,
                senders: 1,
                receivers: 1,
                pushed: 0,
                taken: 0,
            }),
            capacity,
            recv_epoch: AtomicCell::new(0),
            send_epoch: AtomicCell::new(0),
            // Only two keys are ever waited on
            waiters: WaitQueue::with_slots(config.wait, 2),
        }
    }

    // =========================================================================
    // Send side
    // =========================================================================

    pub(super) fn try_send(&self, value: T) -> Result<(), TrySendError<T>> {
        let mut state = self.state.acquire();
        if state.closed {
            return Err(TrySendError::Closed(value));
        }
        // A rendezvous hand-over needs a receiver to complete; try_send only
        // fills a free slot and does not wait for it to be taken.
        if !self.capacity.has_room(state.queue.len()) {
            return Err(TrySendError::Full(value));
        }
        self.push_locked(&mut state, value);
        drop(state);
        self.waiters.wake_one(Side::Receivers);
        Ok(())
    }

    pub(super) fn send(
        &self,
        value: T,
        deadline: Option<Instant>,
    ) -> Result<(), SendTimeoutError<T>> {
        let ticket = match self.enqueue(value, deadline) {
            Ok(ticket) => ticket,
            Err(Blocked::Timeout(value)) => return Err(SendTimeoutError::Timeout(value)),
            Err(Blocked::Closed(value)) => return Err(SendTimeoutError::Closed(value)),
        };

        if let Capacity::Rendezvous = self.capacity {
            return self.await_handover(ticket, deadline);
        }
        Ok(())
    }

    /// Block until there is room, then push; returns the item's ticket
    fn enqueue(&self, value: T, deadline: Option<Instant>) -> Result<u64, Blocked<T>> {
        loop {
            let observed = {
                let mut state = self.state.acquire();
                if state.closed {
                    return Err(Blocked::Closed(value));
                }
                let len = state.queue.len();
                if self.capacity.has_room(len) {
                    let ticket = self.push_locked(&mut state, value);
                    drop(state);
                    self.waiters.wake_one(Side::Receivers);
                    return Ok(ticket);
                }
                if expired(deadline) {
                    return Err(Blocked::Timeout(value));
                }
                self.send_epoch.load(Acquire)
            };

            self.park(Side::Senders, &self.send_epoch, observed, deadline);
        }
    }

    /// Rendezvous: wait until a receiver took ticket `ticket`
    fn await_handover(&self, ticket: u64, deadline: Option<Instant>) -> Result<(), SendTimeoutError<T>> {
        loop {
            let observed = {
                let mut state = self.state.acquire();
                if state.taken >= ticket {
                    return Ok(());
                }

                let timed_out = expired(deadline);
                if state.closed || timed_out {
                    // Not taken, so ours is the only item in the slot
                    let Some(value) = state.queue.pop_back() else {
                        return Ok(());
                    };
                    // The ticket is void; the next push reuses it
                    state.pushed -= 1;
                    self.send_epoch.fetch_add(1, Release);
                    drop(state);
                    self.waiters.wake_all(Side::Senders);
                    return Err(if timed_out {
                        SendTimeoutError::Timeout(value)
                    } else {
                        SendTimeoutError::Closed(value)
                    });
                }
                self.send_epoch.load(Acquire)
            };

            self.park(Side::Senders, &self.send_epoch, observed, deadline);
        }
    }

    fn push_locked(&self, state: &mut LockGuard<'_, State<T>>, value: T) -> u64 {
        state.queue.push_back(value);
        state.pushed += 1;
        self.recv_epoch.fetch_add(1, Release);
        state.pushed
    }

    // =========================================================================
    // Receive side
    // =========================================================================

    pub(super) fn try_recv(&self) -> Result<T, TryRecvError> {
        let mut state = self.state.acquire();
        match self.pop_locked(&mut state) {
            Some(value) => {
                drop(state);
                self.notify_taken();
                Ok(value)
            }
            None if state.closed => Err(TryRecvError::Closed),
            None => Err(TryRecvError::Empty),
        }
    }

    pub(super) fn recv(&self, deadline: Option<Instant>) -> Result<T, RecvTimeoutError> {
        loop {
            let observed = {
                let mut state = self.state.acquire();
                if let Some(value) = self.pop_locked(&mut state) {
                    drop(state);
                    self.notify_taken();
                    return Ok(value);
                }
                if state.closed {
                    return Err(RecvTimeoutError::Closed);
                }
                if expired(deadline) {
                    return Err(RecvTimeoutError::Timeout);
                }
                self.recv_epoch.load(Acquire)
            };

            self.park(Side::Receivers, &self.recv_epoch, observed, deadline);
        }
    }

    fn pop_locked(&self, state: &mut LockGuard<'_, State<T>>) -> Option<T> {
        let value = state.queue.pop_front()?;
        state.taken += 1;
        self.send_epoch.fetch_add(1, Release);
        Some(value)
    }

    fn notify_taken(&self) {
        match self.capacity {
            Capacity::Unbounded => {}
            Capacity::Bounded(_) => {
                self.waiters.wake_one(Side::Senders);
            }
            // Hand-over waiters and slot waiters share the key
            Capacity::Rendezvous => {
                self.waiters.wake_all(Side::Senders);
            }
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Returns true if this call performed the close
    pub(super) fn close(&self) -> bool {
        let mut state = self.state.acquire();
        if state.closed {
            return false;
        }
        self.close_locked(&mut state);
        drop(state);
        self.wake_everyone();
        true
    }

    fn close_locked(&self, state: &mut LockGuard<'_, State<T>>) {
        state.closed = true;
        self.recv_epoch.fetch_add(1, Release);
        self.send_epoch.fetch_add(1, Release);
        tracing::trace!(pending = state.queue.len(), "channel closed");
    }

    fn wake_everyone(&self) {
        self.waiters.wake_all(Side::Receivers);
        self.waiters.wake_all(Side::Senders);
    }

    pub(super) fn add_sender(&self) {
        self.state.acquire().senders += 1;
    }

    pub(super) fn add_receiver(&self) {
        self.state.acquire().receivers += 1;
    }

    /// Last sender gone: receivers drain what is queued, then see Closed
    pub(super) fn remove_sender(&self) {
        let mut state = self.state.acquire();
        state.senders -= 1;
        if state.senders == 0 && !state.closed {
            self.close_locked(&mut state);
            drop(state);
            self.wake_everyone();
        }
    }

    /// Last receiver gone: nobody can ever take an item, so sends fail
    pub(super) fn remove_receiver(&self) {
        let mut state = self.state.acquire();
        state.receivers -= 1;
        if state.receivers == 0 && !state.closed {
            self.close_locked(&mut state);
            drop(state);
            self.wake_everyone();
        }
    }

    // =========================================================================
    // State queries
    // =========================================================================

    pub(super) fn len(&self) -> usize {
        self.state.acquire().queue.len()
    }

    pub(super) fn capacity(&self) -> Option<usize> {
        self.capacity.limit()
    }

    pub(super) fn is_full(&self) -> bool {
        !self.capacity.has_room(self.len())
    }

    pub(super) fn is_closed(&self) -> bool {
        self.state.acquire().closed
    }

    pub(super) fn sender_count(&self) -> usize {
        self.state.acquire().senders
    }

    pub(super) fn receiver_count(&self) -> usize {
        self.state.acquire().receivers
    }

    fn park(&self, side: Side, epoch: &AtomicCell<u64>, observed: u64, deadline: Option<Instant>) {
        let timeout = deadline.map(|d| d.saturating_duration_since(Instant::now()));
        // Timeout is re-checked by the caller under the lock
        let _ = self
            .waiters
            .wait_while(side, timeout, || epoch.load(Acquire) == observed);
    }
}

#[inline]
fn expired(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|d| Instant::now() >= d)
}
