//! Shutdown coordination.
//!
//! The running flag flips from `true` to `false` exactly once. Every thread
//! that may park inside a timed wait holds a [`WaiterGuard`] for the whole
//! call, so the waiter count is exact on every exit path. Shutdown blocks on
//! [`Lifecycle::wait_for_waiters`] until that count reaches zero before it
//! drains the leftover envelopes.

use core::time::Duration;

use portable_atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::sync::{Condvar, Mutex, lock_unpoisoned, wait_for_unpoisoned};

pub(crate) struct Lifecycle {
    #[cfg(feature = "cache-padded")]
    running: crossbeam_utils::CachePadded<AtomicBool>,
    #[cfg(not(feature = "cache-padded"))]
    running: AtomicBool,
    #[cfg(feature = "cache-padded")]
    waiters: crossbeam_utils::CachePadded<AtomicUsize>,
    #[cfg(not(feature = "cache-padded"))]
    waiters: AtomicUsize,
    drained: Mutex<()>,
    drained_cond: Condvar,
}

impl Lifecycle {
    pub(crate) fn new() -> Self {
        Self {
            #[cfg(feature = "cache-padded")]
            running: crossbeam_utils::CachePadded::new(AtomicBool::new(true)),
            #[cfg(not(feature = "cache-padded"))]
            running: AtomicBool::new(true),
            #[cfg(feature = "cache-padded")]
            waiters: crossbeam_utils::CachePadded::new(AtomicUsize::new(0)),
            #[cfg(not(feature = "cache-padded"))]
            waiters: AtomicUsize::new(0),
            drained: Mutex::new(()),
            drained_cond: Condvar::new(),
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub(crate) fn waiters(&self) -> usize {
        self.waiters.load(Ordering::SeqCst)
    }

    /// Registers the calling thread as a potential waiter until the guard is
    /// dropped.
    pub(crate) fn enter_wait(&self) -> WaiterGuard<'_> {
        self.waiters.fetch_add(1, Ordering::SeqCst);
        WaiterGuard { lifecycle: self }
    }

    /// Clears the running flag. Returns `true` only for the call that
    /// performed the transition.
    pub(crate) fn stop(&self) -> bool {
        self.running.swap(false, Ordering::SeqCst)
    }

    /// Blocks until no thread holds a [`WaiterGuard`].
    ///
    /// The last guard dropped after [`Self::stop`] signals `drained_cond`;
    /// `recheck` bounds each wait in case the signal raced the check.
    pub(crate) fn wait_for_waiters(&self, recheck: Duration) {
        let mut guard = lock_unpoisoned(&self.drained);
        while self.waiters() > 0 {
            guard = wait_for_unpoisoned(&self.drained_cond, guard, recheck);
        }
    }

    fn leave_wait(&self) {
        let previous = self.waiters.fetch_sub(1, Ordering::SeqCst);
        debug_assert!(previous > 0, "waiter count underflow");
        if previous == 1 && !self.is_running() {
            // Taking the lock orders this notify after the shutdown thread
            // either parked or observed zero waiters.
            let _guard = lock_unpoisoned(&self.drained);
            self.drained_cond.notify_all();
        }
    }
}

/// Keeps the live-waiter count incremented while alive.
pub(crate) struct WaiterGuard<'a> {
    lifecycle: &'a Lifecycle,
}

impl Drop for WaiterGuard<'_> {
    fn drop(&mut self) {
        self.lifecycle.leave_wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::thread::{scope, sleep};
    use std::time::Instant;

    #[test]
    fn stop_transitions_once() {
        let lifecycle = Lifecycle::new();
        assert!(lifecycle.is_running());
        assert!(lifecycle.stop());
        assert!(!lifecycle.is_running());
        assert!(!lifecycle.stop());
    }

    #[test]
    fn guard_tracks_waiters() {
        let lifecycle = Lifecycle::new();
        {
            let _a = lifecycle.enter_wait();
            let _b = lifecycle.enter_wait();
            assert_eq!(lifecycle.waiters(), 2);
        }
        assert_eq!(lifecycle.waiters(), 0);
    }

    #[test]
    fn wait_for_waiters_returns_immediately_without_waiters() {
        let lifecycle = Lifecycle::new();
        lifecycle.stop();
        let start = Instant::now();
        lifecycle.wait_for_waiters(Duration::from_secs(5));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn wait_for_waiters_blocks_until_last_guard_drops() {
        let lifecycle = Lifecycle::new();
        let entered = Barrier::new(2);
        let hold = Duration::from_millis(50);

        scope(|s| {
            s.spawn(|| {
                let _guard = lifecycle.enter_wait();
                entered.wait();
                sleep(hold);
            });

            entered.wait();
            let start = Instant::now();
            lifecycle.stop();
            // A long recheck interval forces the wake to come from the
            // departing guard.
            lifecycle.wait_for_waiters(Duration::from_secs(10));
            assert!(start.elapsed() < Duration::from_secs(5));
            assert_eq!(lifecycle.waiters(), 0);
        });
    }
}
