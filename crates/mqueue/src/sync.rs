//! Lock backend selection.
//!
//! The queue and every shard use a mutex paired with a condition variable.
//! With the `parking-lot` feature these come from `parking_lot` and never
//! poison; otherwise the std primitives are used and poisoning surfaces as
//! [`Error::LockPoisoned`](crate::Error).

use core::time::Duration;

#[cfg(feature = "parking-lot")]
pub(crate) use parking_lot::{Condvar, Mutex, MutexGuard};
#[cfg(not(feature = "parking-lot"))]
pub(crate) use std::sync::{Condvar, Mutex, MutexGuard};

use crate::error::Result;

#[cfg(feature = "cache-padded")]
pub(crate) type Padded<T> = crossbeam_utils::CachePadded<T>;

#[cfg(not(feature = "cache-padded"))]
pub(crate) type Padded<T> = T;

#[cfg(feature = "cache-padded")]
pub(crate) const fn padded<T>(value: T) -> Padded<T> {
    crossbeam_utils::CachePadded::new(value)
}

#[cfg(not(feature = "cache-padded"))]
pub(crate) const fn padded<T>(value: T) -> Padded<T> {
    value
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    #[cfg(feature = "parking-lot")]
    {
        Ok(mutex.lock())
    }
    #[cfg(not(feature = "parking-lot"))]
    {
        Ok(mutex.lock()?)
    }
}

/// Like [`lock`], but takes the guard out of a poisoned lock. Only the
/// shutdown path uses this, since it must drain whatever is left regardless.
pub(crate) fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    #[cfg(feature = "parking-lot")]
    {
        mutex.lock()
    }
    #[cfg(not(feature = "parking-lot"))]
    {
        mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Parks on `cond` for at most `timeout`. Spurious and timed-out wakes are
/// indistinguishable to the caller, which must re-check its predicate.
pub(crate) fn wait_for<'a, T>(
    cond: &Condvar,
    guard: MutexGuard<'a, T>,
    timeout: Duration,
) -> Result<MutexGuard<'a, T>> {
    #[cfg(feature = "parking-lot")]
    {
        let mut guard = guard;
        cond.wait_for(&mut guard, timeout);
        Ok(guard)
    }
    #[cfg(not(feature = "parking-lot"))]
    {
        let (guard, _) = cond.wait_timeout(guard, timeout)?;
        Ok(guard)
    }
}

pub(crate) fn wait_for_unpoisoned<'a, T>(
    cond: &Condvar,
    guard: MutexGuard<'a, T>,
    timeout: Duration,
) -> MutexGuard<'a, T> {
    #[cfg(feature = "parking-lot")]
    {
        let mut guard = guard;
        cond.wait_for(&mut guard, timeout);
        guard
    }
    #[cfg(not(feature = "parking-lot"))]
    {
        cond.wait_timeout(guard, timeout)
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .0
    }
}
