/*!
 * Atomic Foundations
 *
 * Ordering tokens and the lock-free `AtomicCell` every other primitive is
 * built on (lock state words, scheduler counters, channel state queries).
 */

mod cell;
mod ordering;

pub use cell::{AtomicBits, AtomicCell, AtomicNumeric, AtomicPrimitive};
pub use ordering::OrderingToken;
