/*!
 * Lock-Free Synchronization Primitives
 *
 * RCU (Read-Copy-Update) for zero-contention reads of rarely-updated
 * shared values.
 */

mod rcu;

// Re-export public API
pub use rcu::{RcuCell, Snapshot};
