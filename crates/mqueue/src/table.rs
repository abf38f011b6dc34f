use core::time::Duration;

use crate::{
    MessageId,
    envelope::Envelope,
    error::{Error, Rejected, Result},
    lifecycle::Lifecycle,
    sync::{Condvar, Mutex, Padded, lock, lock_unpoisoned, padded, wait_for},
};

/// One independently locked partition of the correlation table.
struct Shard<T> {
    parked: Mutex<Vec<Envelope<T>>>,
    ready: Condvar,
}

impl<T> Shard<T> {
    fn new() -> Self {
        Self {
            parked: Mutex::new(Vec::new()),
            ready: Condvar::new(),
        }
    }
}

/// The response side: completed envelopes waiting for the producer that holds
/// their identifier.
///
/// Identifiers are spread over a fixed number of shards by `id % shards`, and
/// each shard carries its own lock and condition variable. Publishing or
/// taking one identifier therefore only contends with identifiers in the same
/// shard. Within a shard, envelopes are unordered.
pub(crate) struct CorrelationTable<T> {
    shards: Box<[Padded<Shard<T>>]>,
    wait_interval: Duration,
}

impl<T> CorrelationTable<T> {
    pub(crate) fn new(shards: usize, wait_interval: Duration) -> Self {
        debug_assert!(shards > 0, "correlation table needs at least one shard");
        Self {
            shards: (0..shards).map(|_| padded(Shard::new())).collect(),
            wait_interval,
        }
    }

    pub(crate) fn shard_count(&self) -> usize {
        self.shards.len()
    }

    fn shard(&self, id: MessageId) -> &Shard<T> {
        &self.shards[id.shard(self.shards.len())]
    }

    /// Parks `envelope` in its shard and wakes that shard's waiters only.
    pub(crate) fn publish(
        &self,
        envelope: Envelope<T>,
        lifecycle: &Lifecycle,
    ) -> Result<(), Rejected<Envelope<T>>> {
        let shard = self.shard(envelope.id());
        let mut parked = match lock(&shard.parked) {
            Ok(parked) => parked,
            Err(e) => return Err(Rejected::new(e, envelope)),
        };
        if !lifecycle.is_running() {
            return Err(Rejected::closed(envelope));
        }
        if let Err(e) = parked.try_reserve(1) {
            return Err(Rejected::new(e.into(), envelope));
        }
        parked.push(envelope);
        drop(parked);
        shard.ready.notify_all();
        Ok(())
    }

    /// Removes and returns the payload published under `id`.
    ///
    /// While the shard is empty the caller parks in bounded waits. When the
    /// shard only holds other identifiers' responses the lock is released and
    /// the scan retried without parking: shard occupancy is expected to be
    /// low, so this retry is short-lived in practice.
    pub(crate) fn take(&self, id: MessageId, lifecycle: &Lifecycle) -> Result<T> {
        let _waiter = lifecycle.enter_wait();
        let shard = self.shard(id);
        loop {
            if !lifecycle.is_running() {
                return Err(Error::Closed);
            }

            let mut parked = lock(&shard.parked)?;
            while parked.is_empty() {
                if !lifecycle.is_running() {
                    return Err(Error::Closed);
                }
                parked = wait_for(&shard.ready, parked, self.wait_interval)?;
            }

            if let Some(pos) = parked.iter().position(|envelope| envelope.id() == id) {
                return Ok(parked.swap_remove(pos).into_payload());
            }

            drop(parked);
            std::thread::yield_now();
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| lock_unpoisoned(&shard.parked).len())
            .sum()
    }

    /// Empties every shard in index order. Only called once no thread can be
    /// parked on any shard.
    pub(crate) fn drain(&self) -> Vec<Envelope<T>> {
        let mut leftovers = Vec::new();
        for shard in self.shards.iter() {
            let parked = core::mem::take(&mut *lock_unpoisoned(&shard.parked));
            leftovers.extend(parked);
        }
        leftovers
    }
}
