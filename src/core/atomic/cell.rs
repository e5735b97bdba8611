/*!
 * Atomic Cell
 *
 * Fixed-width value with lock-free read/write/compare-exchange under a
 * caller-selected `OrderingToken`.
 *
 * # Design: Sealed Primitive Trait
 *
 * `AtomicCell<T>` is generic over the machine-word primitives that have a
 * native atomic counterpart. Each primitive names its atomic type through
 * `AtomicPrimitive::Atomic`, so the cell compiles down to a bare
 * `AtomicU64`/`AtomicBool`/... with no extra state.
 *
 * Numeric and bitwise read-modify-write operations live on the
 * `AtomicNumeric` and `AtomicBits` specialisations.
 */

use super::ordering::OrderingToken;
use std::fmt;
use std::sync::atomic::{
    AtomicBool, AtomicI16, AtomicI32, AtomicI64, AtomicI8, AtomicIsize, AtomicU16, AtomicU32,
    AtomicU64, AtomicU8, AtomicUsize, Ordering,
};

mod sealed {
    pub trait Sealed {}
}

/// Primitive value with a native lock-free atomic representation
pub trait AtomicPrimitive: Copy + Eq + fmt::Debug + Send + Sync + sealed::Sealed + 'static {
    /// Backing atomic type
    type Atomic: Send + Sync;

    fn new_atomic(value: Self) -> Self::Atomic;
    fn atomic_load(atomic: &Self::Atomic, order: Ordering) -> Self;
    fn atomic_store(atomic: &Self::Atomic, value: Self, order: Ordering);
    fn atomic_swap(atomic: &Self::Atomic, value: Self, order: Ordering) -> Self;
    fn atomic_compare_exchange(
        atomic: &Self::Atomic,
        current: Self,
        new: Self,
        success: Ordering,
        failure: Ordering,
    ) -> Result<Self, Self>;
    fn atomic_compare_exchange_weak(
        atomic: &Self::Atomic,
        current: Self,
        new: Self,
        success: Ordering,
        failure: Ordering,
    ) -> Result<Self, Self>;
    fn atomic_into_inner(atomic: Self::Atomic) -> Self;
    fn atomic_get_mut(atomic: &mut Self::Atomic) -> &mut Self;
}

/// Bitwise read-modify-write operations (integers and bool)
pub trait AtomicBits: AtomicPrimitive {
    fn atomic_fetch_and(atomic: &Self::Atomic, value: Self, order: Ordering) -> Self;
    fn atomic_fetch_or(atomic: &Self::Atomic, value: Self, order: Ordering) -> Self;
    fn atomic_fetch_xor(atomic: &Self::Atomic, value: Self, order: Ordering) -> Self;
}

/// Arithmetic read-modify-write operations (integers only, wrapping)
pub trait AtomicNumeric: AtomicBits {
    fn atomic_fetch_add(atomic: &Self::Atomic, delta: Self, order: Ordering) -> Self;
    fn atomic_fetch_sub(atomic: &Self::Atomic, delta: Self, order: Ordering) -> Self;
    fn atomic_fetch_max(atomic: &Self::Atomic, value: Self, order: Ordering) -> Self;
    fn atomic_fetch_min(atomic: &Self::Atomic, value: Self, order: Ordering) -> Self;
}

macro_rules! impl_primitive {
    ($($ty:ty => $atomic:ty),* $(,)?) => {$(
        impl sealed::Sealed for $ty {}

        impl AtomicPrimitive for $ty {
            type Atomic = $atomic;

            #[inline(always)]
            fn new_atomic(value: Self) -> Self::Atomic {
                <$atomic>::new(value)
            }

            #[inline(always)]
            fn atomic_load(atomic: &Self::Atomic, order: Ordering) -> Self {
                atomic.load(order)
            }

            #[inline(always)]
            fn atomic_store(atomic: &Self::Atomic, value: Self, order: Ordering) {
                atomic.store(value, order)
            }

            #[inline(always)]
            fn atomic_swap(atomic: &Self::Atomic, value: Self, order: Ordering) -> Self {
                atomic.swap(value, order)
            }

            #[inline(always)]
            fn atomic_compare_exchange(
                atomic: &Self::Atomic,
                current: Self,
                new: Self,
                success: Ordering,
                failure: Ordering,
            ) -> Result<Self, Self> {
                atomic.compare_exchange(current, new, success, failure)
            }

            #[inline(always)]
            fn atomic_compare_exchange_weak(
                atomic: &Self::Atomic,
                current: Self,
                new: Self,
                success: Ordering,
                failure: Ordering,
            ) -> Result<Self, Self> {
                atomic.compare_exchange_weak(current, new, success, failure)
            }

            #[inline(always)]
            fn atomic_into_inner(atomic: Self::Atomic) -> Self {
                atomic.into_inner()
            }

            #[inline(always)]
            fn atomic_get_mut(atomic: &mut Self::Atomic) -> &mut Self {
                atomic.get_mut()
            }
        }

        impl AtomicBits for $ty {
            #[inline(always)]
            fn atomic_fetch_and(atomic: &Self::Atomic, value: Self, order: Ordering) -> Self {
                atomic.fetch_and(value, order)
            }

            #[inline(always)]
            fn atomic_fetch_or(atomic: &Self::Atomic, value: Self, order: Ordering) -> Self {
                atomic.fetch_or(value, order)
            }

            #[inline(always)]
            fn atomic_fetch_xor(atomic: &Self::Atomic, value: Self, order: Ordering) -> Self {
                atomic.fetch_xor(value, order)
            }
        }

        impl AtomicCell<$ty> {
            /// Const constructor for `static` items
            pub const fn const_new(value: $ty) -> Self {
                Self {
                    inner: <$atomic>::new(value),
                }
            }
        }
    )*};
}

macro_rules! impl_numeric {
    ($($ty:ty),* $(,)?) => {$(
        impl AtomicNumeric for $ty {
            #[inline(always)]
            fn atomic_fetch_add(atomic: &Self::Atomic, delta: Self, order: Ordering) -> Self {
                atomic.fetch_add(delta, order)
            }

            #[inline(always)]
            fn atomic_fetch_sub(atomic: &Self::Atomic, delta: Self, order: Ordering) -> Self {
                atomic.fetch_sub(delta, order)
            }

            #[inline(always)]
            fn atomic_fetch_max(atomic: &Self::Atomic, value: Self, order: Ordering) -> Self {
                atomic.fetch_max(value, order)
            }

            #[inline(always)]
            fn atomic_fetch_min(atomic: &Self::Atomic, value: Self, order: Ordering) -> Self {
                atomic.fetch_min(value, order)
            }
        }
    )*};
}

impl_primitive! {
    bool => AtomicBool,
    u8 => AtomicU8,
    u16 => AtomicU16,
    u32 => AtomicU32,
    u64 => AtomicU64,
    usize => AtomicUsize,
    i8 => AtomicI8,
    i16 => AtomicI16,
    i32 => AtomicI32,
    i64 => AtomicI64,
    isize => AtomicIsize,
}

impl_numeric!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

/// Lock-free cell holding a machine-word-sized value
///
/// Share across threads with `Arc<AtomicCell<T>>`; the cell itself has no
/// aliasing restrictions.
///
/// # Example
///
/// ```
/// use concurrency_toolkit::{AtomicCell, OrderingToken};
///
/// let cell = AtomicCell::new(5u64);
/// assert_eq!(cell.compare_exchange(5, 6, OrderingToken::AcqRel, OrderingToken::Acquire), Ok(5));
/// assert_eq!(cell.compare_exchange(5, 7, OrderingToken::AcqRel, OrderingToken::Acquire), Err(6));
/// ```
#[repr(transparent)]
pub struct AtomicCell<T: AtomicPrimitive> {
    inner: T::Atomic,
}

impl<T: AtomicPrimitive> AtomicCell<T> {
    #[inline]
    pub fn new(value: T) -> Self {
        Self {
            inner: T::new_atomic(value),
        }
    }

    #[inline(always)]
    pub fn load(&self, order: OrderingToken) -> T {
        T::atomic_load(&self.inner, order.for_load())
    }

    #[inline(always)]
    pub fn store(&self, value: T, order: OrderingToken) {
        T::atomic_store(&self.inner, value, order.for_store())
    }

    /// Store `value` and return the previous one
    #[inline(always)]
    pub fn swap(&self, value: T, order: OrderingToken) -> T {
        T::atomic_swap(&self.inner, value, order.for_rmw())
    }

    /// Replace `expected` with `new` if the cell currently holds `expected`
    ///
    /// Returns `Ok(previous)` on success and `Err(actual)` on failure. Failure
    /// is a normal outcome the caller must check.
    #[inline(always)]
    pub fn compare_exchange(
        &self,
        expected: T,
        new: T,
        success: OrderingToken,
        failure: OrderingToken,
    ) -> Result<T, T> {
        T::atomic_compare_exchange(
            &self.inner,
            expected,
            new,
            success.for_rmw(),
            failure.for_failure(),
        )
    }

    /// Like `compare_exchange` but may fail spuriously; use inside retry loops
    #[inline(always)]
    pub fn compare_exchange_weak(
        &self,
        expected: T,
        new: T,
        success: OrderingToken,
        failure: OrderingToken,
    ) -> Result<T, T> {
        T::atomic_compare_exchange_weak(
            &self.inner,
            expected,
            new,
            success.for_rmw(),
            failure.for_failure(),
        )
    }

    /// Apply `f` until it either succeeds in a compare-exchange or returns `None`
    ///
    /// Returns `Ok(previous)` if a new value was stored, `Err(current)` otherwise.
    pub fn fetch_update<F>(
        &self,
        set_order: OrderingToken,
        fetch_order: OrderingToken,
        mut f: F,
    ) -> Result<T, T>
    where
        F: FnMut(T) -> Option<T>,
    {
        let mut current = self.load(fetch_order);
        while let Some(next) = f(current) {
            match self.compare_exchange_weak(current, next, set_order, fetch_order) {
                Ok(previous) => return Ok(previous),
                Err(actual) => current = actual,
            }
        }
        Err(current)
    }

    #[inline]
    pub fn into_inner(self) -> T {
        T::atomic_into_inner(self.inner)
    }

    /// Mutable access without atomics (exclusive borrow proves no sharing)
    #[inline]
    pub fn get_mut(&mut self) -> &mut T {
        T::atomic_get_mut(&mut self.inner)
    }

    /// Stable address of the backing word, used as a parking key
    #[inline(always)]
    pub(crate) fn addr(&self) -> usize {
        &self.inner as *const T::Atomic as usize
    }
}

impl<T: AtomicBits> AtomicCell<T> {
    #[inline(always)]
    pub fn fetch_and(&self, value: T, order: OrderingToken) -> T {
        T::atomic_fetch_and(&self.inner, value, order.for_rmw())
    }

    #[inline(always)]
    pub fn fetch_or(&self, value: T, order: OrderingToken) -> T {
        T::atomic_fetch_or(&self.inner, value, order.for_rmw())
    }

    #[inline(always)]
    pub fn fetch_xor(&self, value: T, order: OrderingToken) -> T {
        T::atomic_fetch_xor(&self.inner, value, order.for_rmw())
    }
}

impl<T: AtomicNumeric> AtomicCell<T> {
    /// Wrapping add, returns the previous value
    #[inline(always)]
    pub fn fetch_add(&self, delta: T, order: OrderingToken) -> T {
        T::atomic_fetch_add(&self.inner, delta, order.for_rmw())
    }

    /// Wrapping subtract, returns the previous value
    #[inline(always)]
    pub fn fetch_sub(&self, delta: T, order: OrderingToken) -> T {
        T::atomic_fetch_sub(&self.inner, delta, order.for_rmw())
    }

    #[inline(always)]
    pub fn fetch_max(&self, value: T, order: OrderingToken) -> T {
        T::atomic_fetch_max(&self.inner, value, order.for_rmw())
    }

    #[inline(always)]
    pub fn fetch_min(&self, value: T, order: OrderingToken) -> T {
        T::atomic_fetch_min(&self.inner, value, order.for_rmw())
    }
}

impl<T: AtomicPrimitive + Default> Default for AtomicCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: AtomicPrimitive> From<T> for AtomicCell<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: AtomicPrimitive> fmt::Debug for AtomicCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AtomicCell")
            .field(&self.load(OrderingToken::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_compare_exchange_success() {
        let cell = AtomicCell::new(5u32);
        let result = cell.compare_exchange(5, 6, OrderingToken::AcqRel, OrderingToken::Acquire);
        assert_eq!(result, Ok(5));
        assert_eq!(cell.load(OrderingToken::Acquire), 6);
    }

    #[test]
    fn test_compare_exchange_failure_reports_actual() {
        let cell = AtomicCell::new(7u32);
        let result = cell.compare_exchange(5, 6, OrderingToken::AcqRel, OrderingToken::Acquire);
        assert_eq!(result, Err(7));
        assert_eq!(cell.load(OrderingToken::Acquire), 7);
    }

    #[test]
    fn test_illegal_orderings_degrade() {
        // Release load / Acquire store would panic on the raw std atomics
        let cell = AtomicCell::new(1i64);
        cell.store(2, OrderingToken::Acquire);
        assert_eq!(cell.load(OrderingToken::Release), 2);
        assert_eq!(
            cell.compare_exchange(2, 3, OrderingToken::Relaxed, OrderingToken::AcqRel),
            Ok(2)
        );
    }

    #[test]
    fn test_fetch_ops() {
        let cell = AtomicCell::new(10usize);
        assert_eq!(cell.fetch_add(5, OrderingToken::Relaxed), 10);
        assert_eq!(cell.fetch_sub(3, OrderingToken::Relaxed), 15);
        assert_eq!(cell.fetch_max(100, OrderingToken::Relaxed), 12);
        assert_eq!(cell.fetch_min(1, OrderingToken::Relaxed), 100);
        assert_eq!(cell.load(OrderingToken::Relaxed), 1);
    }

    #[test]
    fn test_fetch_add_wraps() {
        let cell = AtomicCell::new(u8::MAX);
        assert_eq!(cell.fetch_add(1, OrderingToken::Relaxed), u8::MAX);
        assert_eq!(cell.load(OrderingToken::Relaxed), 0);
    }

    #[test]
    fn test_bool_bits() {
        let flag = AtomicCell::new(false);
        assert!(!flag.fetch_or(true, OrderingToken::AcqRel));
        assert!(flag.fetch_and(false, OrderingToken::AcqRel));
        assert!(!flag.swap(true, OrderingToken::SeqCst));
        assert!(flag.into_inner());
    }

    #[test]
    fn test_fetch_update() {
        let cell = AtomicCell::new(3u16);
        let r = cell.fetch_update(OrderingToken::AcqRel, OrderingToken::Acquire, |v| {
            (v < 10).then_some(v * 2)
        });
        assert_eq!(r, Ok(3));
        assert_eq!(cell.load(OrderingToken::Relaxed), 6);

        let r = cell.fetch_update(OrderingToken::AcqRel, OrderingToken::Acquire, |_| None);
        assert_eq!(r, Err(6));
    }

    #[test]
    fn test_concurrent_fetch_add() {
        let cell = Arc::new(AtomicCell::new(0u64));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cell = cell.clone();
                thread::spawn(move || {
                    for _ in 0..1000 {
                        cell.fetch_add(1, OrderingToken::Relaxed);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cell.load(OrderingToken::SeqCst), 8_000);
    }

    #[test]
    fn test_const_new_in_static() {
        static HITS: AtomicCell<u32> = AtomicCell::<u32>::const_new(0);
        HITS.fetch_add(2, OrderingToken::Relaxed);
        assert!(HITS.load(OrderingToken::Relaxed) >= 2);
    }

    #[test]
    fn test_get_mut_and_debug() {
        let mut cell = AtomicCell::new(-4i32);
        *cell.get_mut() += 1;
        assert_eq!(format!("{:?}", cell), "AtomicCell(-3)");
    }
}
