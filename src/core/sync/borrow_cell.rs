/*!
 * Dynamic Borrow Cell
 *
 * Single-threaded shared-or-exclusive discipline checked at runtime. Any
 * number of shared guards, or exactly one exclusive guard, may be alive at
 * once. A conflicting request is rejected with `BorrowConflict` instead of
 * blocking: there is no other thread that could ever release the guard.
 *
 * The cell is `!Sync`; use `SharedExclusiveLock` across threads.
 */

use crate::core::errors::{AccessKind, BorrowConflict};
use std::cell::{Cell, UnsafeCell};
use std::fmt;
use std::ops::{Deref, DerefMut};

/// Borrow flag encoding: 0 = free, >0 = shared count, -1 = exclusive
type Flag = isize;

const FREE: Flag = 0;
const EXCLUSIVE: Flag = -1;

/// Observable borrow state of a `DynamicBorrowCell`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorrowState {
    Free,
    Shared(usize),
    Exclusive,
}

/// Interior-mutable value with runtime-checked borrows
///
/// # Example
///
/// ```
/// use concurrency_toolkit::{BorrowState, DynamicBorrowCell};
///
/// let cell = DynamicBorrowCell::new(1);
/// let a = cell.borrow().unwrap();
/// let b = cell.borrow().unwrap();
/// assert_eq!(cell.state(), BorrowState::Shared(2));
/// assert!(cell.borrow_mut().is_err());
///
/// drop((a, b));
/// *cell.borrow_mut().unwrap() += 1;
/// assert_eq!(cell.into_inner(), 2);
/// ```
pub struct DynamicBorrowCell<T> {
    flag: Cell<Flag>,
    value: UnsafeCell<T>,
}

impl<T> DynamicBorrowCell<T> {
    pub const fn new(value: T) -> Self {
        Self {
            flag: Cell::new(FREE),
            value: UnsafeCell::new(value),
        }
    }

    pub fn state(&self) -> BorrowState {
        match self.flag.get() {
            FREE => BorrowState::Free,
            EXCLUSIVE => BorrowState::Exclusive,
            n => BorrowState::Shared(n as usize),
        }
    }

    /// Shared access; fails only while an exclusive guard is alive
    pub fn borrow(&self) -> Result<SharedGuard<'_, T>, BorrowConflict> {
        let flag = self.flag.get();
        if flag == EXCLUSIVE {
            return Err(BorrowConflict {
                requested: AccessKind::Shared,
                held: AccessKind::Exclusive,
                holders: 1,
            });
        }
        self.flag.set(increment(flag));
        Ok(SharedGuard { cell: self })
    }

    /// Exclusive access; succeeds only when no guard is alive
    pub fn borrow_mut(&self) -> Result<ExclusiveGuard<'_, T>, BorrowConflict> {
        match self.flag.get() {
            FREE => {
                self.flag.set(EXCLUSIVE);
                Ok(ExclusiveGuard { cell: self })
            }
            EXCLUSIVE => Err(BorrowConflict {
                requested: AccessKind::Exclusive,
                held: AccessKind::Exclusive,
                holders: 1,
            }),
            n => Err(BorrowConflict {
                requested: AccessKind::Exclusive,
                held: AccessKind::Shared,
                holders: n as usize,
            }),
        }
    }

    /// Swap in `value`, returning the old one
    pub fn replace(&self, value: T) -> Result<T, BorrowConflict> {
        let mut guard = self.borrow_mut()?;
        Ok(std::mem::replace(&mut *guard, value))
    }

    pub fn take(&self) -> Result<T, BorrowConflict>
    where
        T: Default,
    {
        self.replace(T::default())
    }

    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }

    /// Mutable access without a guard (exclusive borrow proves no guards)
    pub fn get_mut(&mut self) -> &mut T {
        self.value.get_mut()
    }
}

#[inline]
fn increment(flag: Flag) -> Flag {
    match flag.checked_add(1) {
        Some(next) => next,
        // Unreachable without leaking isize::MAX guards
        None => panic!("shared borrow count overflow"),
    }
}

impl<T: Default> Default for DynamicBorrowCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for DynamicBorrowCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("DynamicBorrowCell");
        match self.borrow() {
            Ok(guard) => d.field("value", &&*guard),
            Err(_) => d.field("value", &format_args!("<borrowed>")),
        };
        d.finish()
    }
}

/// Shared borrow guard; cloning adds another shared holder
pub struct SharedGuard<'a, T> {
    cell: &'a DynamicBorrowCell<T>,
}

impl<T> Clone for SharedGuard<'_, T> {
    fn clone(&self) -> Self {
        self.cell.flag.set(increment(self.cell.flag.get()));
        Self { cell: self.cell }
    }
}

impl<T> Deref for SharedGuard<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        // SAFETY: no exclusive guard can exist while the flag is positive
        unsafe { &*self.cell.value.get() }
    }
}

impl<T> Drop for SharedGuard<'_, T> {
    #[inline]
    fn drop(&mut self) {
        self.cell.flag.set(self.cell.flag.get() - 1);
    }
}

impl<T: fmt::Debug> fmt::Debug for SharedGuard<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

/// Exclusive borrow guard
pub struct ExclusiveGuard<'a, T> {
    cell: &'a DynamicBorrowCell<T>,
}

impl<T> Deref for ExclusiveGuard<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        // SAFETY: flag is EXCLUSIVE, this guard is the only one
        unsafe { &*self.cell.value.get() }
    }
}

impl<T> DerefMut for ExclusiveGuard<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: flag is EXCLUSIVE, this guard is the only one
        unsafe { &mut *self.cell.value.get() }
    }
}

impl<T> Drop for ExclusiveGuard<'_, T> {
    #[inline]
    fn drop(&mut self) {
        self.cell.flag.set(FREE);
    }
}

impl<T: fmt::Debug> fmt::Debug for ExclusiveGuard<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}
