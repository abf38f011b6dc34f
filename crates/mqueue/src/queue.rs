use core::time::Duration;
use std::collections::VecDeque;

use crate::{
    envelope::Envelope,
    error::{Error, Rejected, Result},
    lifecycle::Lifecycle,
    sync::{Condvar, Mutex, lock, lock_unpoisoned, wait_for},
};

/// The request side: a blocking FIFO drained by workers.
///
/// Envelopes are appended at the back and taken from the front under a single
/// lock, so workers observe requests in exactly the order the `push` critical
/// sections completed, across all producers.
pub(crate) struct WorkQueue<T> {
    pending: Mutex<VecDeque<Envelope<T>>>,
    available: Condvar,
    wait_interval: Duration,
}

impl<T> WorkQueue<T> {
    pub(crate) fn new(wait_interval: Duration) -> Self {
        Self {
            pending: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
            wait_interval,
        }
    }

    /// Appends `envelope` and wakes every parked worker.
    ///
    /// The running flag is checked under the queue lock, so an envelope is
    /// either visible to the shutdown drain or handed back here, never lost.
    pub(crate) fn push(
        &self,
        envelope: Envelope<T>,
        lifecycle: &Lifecycle,
    ) -> Result<(), Rejected<Envelope<T>>> {
        let mut pending = match lock(&self.pending) {
            Ok(pending) => pending,
            Err(e) => return Err(Rejected::new(e, envelope)),
        };
        if !lifecycle.is_running() {
            return Err(Rejected::closed(envelope));
        }
        if let Err(e) = pending.try_reserve(1) {
            return Err(Rejected::new(e.into(), envelope));
        }
        pending.push_back(envelope);
        drop(pending);
        self.available.notify_all();
        Ok(())
    }

    /// Removes the oldest envelope, parking in bounded waits while the queue
    /// is empty. Returns [`Error::Closed`] as soon as the engine stops.
    pub(crate) fn take(&self, lifecycle: &Lifecycle) -> Result<Envelope<T>> {
        let _waiter = lifecycle.enter_wait();
        let mut pending = lock(&self.pending)?;
        loop {
            if !lifecycle.is_running() {
                return Err(Error::Closed);
            }
            if let Some(envelope) = pending.pop_front() {
                return Ok(envelope);
            }
            pending = wait_for(&self.available, pending, self.wait_interval)?;
        }
    }

    pub(crate) fn len(&self) -> usize {
        lock_unpoisoned(&self.pending).len()
    }

    /// Empties the queue, oldest first. Only called once no thread can be
    /// parked on `available`.
    pub(crate) fn drain(&self) -> VecDeque<Envelope<T>> {
        core::mem::take(&mut *lock_unpoisoned(&self.pending))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MessageId;
    use std::thread::scope;
    use std::time::Instant;

    fn envelope(raw: u64) -> Envelope<u64> {
        Envelope::new(MessageId::from_raw(raw), raw * 10)
    }

    #[test]
    fn take_is_fifo() {
        let lifecycle = Lifecycle::new();
        let queue = WorkQueue::new(Duration::from_millis(1));
        for raw in 0..5 {
            queue.push(envelope(raw), &lifecycle).unwrap();
        }
        assert_eq!(queue.len(), 5);
        for raw in 0..5 {
            let taken = queue.take(&lifecycle).unwrap();
            assert_eq!(taken.id().to_raw(), raw);
            assert_eq!(*taken.payload(), raw * 10);
        }
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn push_after_stop_hands_envelope_back() {
        let lifecycle = Lifecycle::new();
        let queue = WorkQueue::new(Duration::from_millis(1));
        lifecycle.stop();

        let rejected = queue.push(envelope(7), &lifecycle).unwrap_err();
        assert!(rejected.is_closed());
        assert_eq!(rejected.into_payload().id().to_raw(), 7);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn take_after_stop_leaves_envelopes_for_drain() {
        let lifecycle = Lifecycle::new();
        let queue = WorkQueue::new(Duration::from_millis(1));
        queue.push(envelope(1), &lifecycle).unwrap();
        queue.push(envelope(2), &lifecycle).unwrap();
        lifecycle.stop();

        assert_eq!(queue.take(&lifecycle).unwrap_err(), Error::Closed);
        let drained: Vec<_> = queue.drain().into_iter().map(|e| e.id().to_raw()).collect();
        assert_eq!(drained, vec![1, 2]);
        assert_eq!(lifecycle.waiters(), 0);
    }

    #[test]
    fn blocked_take_wakes_on_push() {
        let lifecycle = Lifecycle::new();
        let queue = WorkQueue::new(Duration::from_secs(10));

        scope(|s| {
            let taker = s.spawn(|| queue.take(&lifecycle).map(Envelope::into_payload));
            while lifecycle.waiters() == 0 {
                std::thread::yield_now();
            }
            let start = Instant::now();
            queue.push(envelope(3), &lifecycle).unwrap();
            assert_eq!(taker.join().unwrap(), Ok(30));
            assert!(start.elapsed() < Duration::from_secs(5));
        });
    }

    #[test]
    fn blocked_take_observes_stop() {
        let lifecycle = Lifecycle::new();
        let queue: WorkQueue<u64> = WorkQueue::new(Duration::from_millis(1));

        scope(|s| {
            let taker = s.spawn(|| queue.take(&lifecycle).map(Envelope::into_payload));
            while lifecycle.waiters() == 0 {
                std::thread::yield_now();
            }
            lifecycle.stop();
            assert_eq!(taker.join().unwrap(), Err(Error::Closed));
        });
        assert_eq!(lifecycle.waiters(), 0);
    }
}
