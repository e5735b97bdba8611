/*!
 * Core Module
 * Atomic foundations, synchronization primitives, limits and error handling
 */

pub mod atomic;
pub mod errors;
pub mod limits;
pub mod sync;

// Re-export for convenience
pub use atomic::{AtomicCell, OrderingToken};
pub use errors::*;
