use core::{fmt, time::Duration};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    config::QueueConfig,
    envelope::Envelope,
    error::{Rejected, Result},
    id::{IdAllocator, MessageId},
    lifecycle::Lifecycle,
    queue::WorkQueue,
    table::CorrelationTable,
};

/// A request/response exchange between producer threads and a worker pool.
///
/// Producers [`submit`](Self::submit) a payload and later
/// [`take_response`](Self::take_response) under the returned identifier.
/// Workers [`take_request`](Self::take_request) in FIFO order and
/// [`publish`](Self::publish) their result under the same identifier.
///
/// Share the engine between threads with an [`Arc`](std::sync::Arc). Call
/// [`shutdown`](Self::shutdown) once to unblock every parked thread and hand
/// all undelivered payloads to a cleanup closure; the locks and the engine
/// itself are released when the last owner drops it.
///
/// ## Features
/// - ✅ Thread-safe, many producers and many workers
/// - ✅ Strict FIFO on the request side
/// - ✅ Response lookups only contend within one shard
///
/// # Example
/// ```
/// use mqueue::MessageQueue;
/// use std::{sync::Arc, thread};
///
/// let queue = Arc::new(MessageQueue::<u64>::new());
///
/// let worker = {
///     let queue = Arc::clone(&queue);
///     thread::spawn(move || {
///         while let Ok(request) = queue.take_request() {
///             let (id, n) = request.into_parts();
///             if queue.publish(id, n * 2).is_err() {
///                 break;
///             }
///         }
///     })
/// };
///
/// let id = queue.submit(21).unwrap();
/// assert_eq!(queue.take_response(id).unwrap(), 42);
///
/// queue.shutdown(drop);
/// worker.join().unwrap();
/// ```
pub struct MessageQueue<T> {
    ids: IdAllocator,
    requests: WorkQueue<T>,
    responses: CorrelationTable<T>,
    lifecycle: Lifecycle,
    wait_interval: Duration,
}

impl<T> MessageQueue<T> {
    /// Creates a running engine with the default [`QueueConfig`].
    pub fn new() -> Self {
        Self::build(QueueConfig::default())
    }

    /// Creates a running engine from `config`.
    ///
    /// # Errors
    /// - [`crate::Error::InvalidConfig`] if the shard count or the wait interval
    ///   is zero.
    pub fn with_config(config: QueueConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: QueueConfig) -> Self {
        Self {
            ids: IdAllocator::new(),
            requests: WorkQueue::new(config.wait_interval),
            responses: CorrelationTable::new(config.shards, config.wait_interval),
            lifecycle: Lifecycle::new(),
            wait_interval: config.wait_interval,
        }
    }

    /// Enqueues a request and returns the identifier its response will be
    /// published under.
    ///
    /// Never blocks beyond acquiring the queue lock.
    ///
    /// # Errors
    /// The payload is handed back inside [`Rejected`] when:
    /// - the engine is shut down ([`crate::Error::Closed`]). The identifier
    ///   consumed for this call is not reused.
    /// - the queue cannot grow ([`crate::Error::ResourceExhausted`]).
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip_all))]
    pub fn submit(&self, payload: T) -> Result<MessageId, Rejected<T>> {
        let id = self.ids.next_id();
        match self.requests.push(Envelope::new(id, payload), &self.lifecycle) {
            Ok(()) => Ok(id),
            Err(rejected) => {
                let (error, envelope) = rejected.into_parts();
                #[cfg(feature = "tracing")]
                tracing::trace!(%id, %error, "request rejected");
                Err(Rejected::new(error, envelope.into_payload()))
            }
        }
    }

    /// Takes the oldest pending request, blocking while none is available.
    ///
    /// # Errors
    /// - [`crate::Error::Closed`] once shutdown has started, even if requests
    ///   are still queued; those are handed to the shutdown cleanup instead.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip_all))]
    pub fn take_request(&self) -> Result<Envelope<T>> {
        self.requests.take(&self.lifecycle)
    }

    /// Publishes the response for `id`, waking only producers whose
    /// identifiers share its shard.
    ///
    /// # Errors
    /// The payload is handed back inside [`Rejected`] when the engine is shut
    /// down or the shard cannot grow.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self, payload)))]
    pub fn publish(&self, id: MessageId, payload: T) -> Result<(), Rejected<T>> {
        self.publish_envelope(Envelope::new(id, payload))
    }

    /// Same as [`Self::publish`], reusing the envelope a worker received.
    pub fn publish_envelope(&self, envelope: Envelope<T>) -> Result<(), Rejected<T>> {
        self.responses
            .publish(envelope, &self.lifecycle)
            .map_err(|rejected| {
                let (error, envelope) = rejected.into_parts();
                Rejected::new(error, envelope.into_payload())
            })
    }

    /// Waits for the response published under `id` and removes it.
    ///
    /// Each published response is returned exactly once; a second call for
    /// the same identifier blocks until shutdown.
    ///
    /// # Errors
    /// - [`crate::Error::Closed`] once shutdown has started.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn take_response(&self, id: MessageId) -> Result<T> {
        self.responses.take(id, &self.lifecycle)
    }

    /// Stops the engine and hands every undelivered payload to `cleanup`.
    ///
    /// 1. Clears the running flag; every operation from now on reports
    ///    [`crate::Error::Closed`].
    /// 2. Blocks until every thread parked in `take_request` or
    ///    `take_response` has left. Each of them re-checks the flag within one
    ///    wait interval.
    /// 3. Drains the request queue and every response shard, calling `cleanup`
    ///    once per payload with no lock held.
    ///
    /// Returns the number of payloads passed to `cleanup`. Calling it again is
    /// harmless and returns `0`.
    ///
    /// `cleanup` must not call back into this engine.
    pub fn shutdown<F>(&self, mut cleanup: F) -> usize
    where
        F: FnMut(T),
    {
        let _first = self.lifecycle.stop();
        #[cfg(feature = "tracing")]
        if _first {
            tracing::debug!(
                waiters = self.lifecycle.waiters(),
                "message queue stopping, draining waiters"
            );
        }

        self.lifecycle.wait_for_waiters(self.wait_interval);

        let mut cleaned = 0;
        for envelope in self.requests.drain() {
            cleanup(envelope.into_payload());
            cleaned += 1;
        }
        for envelope in self.responses.drain() {
            cleanup(envelope.into_payload());
            cleaned += 1;
        }

        #[cfg(feature = "tracing")]
        tracing::info!(cleaned, "message queue shut down");

        cleaned
    }

    /// Returns `false` once [`Self::shutdown`] has started.
    pub fn is_running(&self) -> bool {
        self.lifecycle.is_running()
    }

    pub fn shard_count(&self) -> usize {
        self.responses.shard_count()
    }

    pub fn wait_interval(&self) -> Duration {
        self.wait_interval
    }

    /// Number of requests not yet taken by a worker. A snapshot only.
    pub fn pending_requests(&self) -> usize {
        self.requests.len()
    }

    /// Number of published responses not yet taken. Shards are counted one
    /// after another, so this is not an atomic snapshot.
    pub fn pending_responses(&self) -> usize {
        self.responses.len()
    }

    /// Number of threads currently inside `take_request` or `take_response`.
    pub fn active_waiters(&self) -> usize {
        self.lifecycle.waiters()
    }
}

impl<T> Default for MessageQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for MessageQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageQueue")
            .field("running", &self.is_running())
            .field("shards", &self.shard_count())
            .field("wait_interval", &self.wait_interval)
            .field("ids", &self.ids)
            .finish_non_exhaustive()
    }
}
