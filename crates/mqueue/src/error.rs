use core::fmt;
use std::collections::TryReserveError;

/// A result type defaulting to the crate-wide [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All error variants that `mqueue` can emit.
///
/// Callers only ever need to distinguish [`Error::Closed`] from everything
/// else: once an operation reports `Closed`, the engine is shutting down and no
/// further request or response will be delivered.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The engine has begun or completed shutdown.
    #[error("message queue is closed")]
    Closed,

    /// A container could not grow to hold another envelope.
    #[error("message queue could not reserve memory: {0}")]
    ResourceExhausted(#[from] TryReserveError),

    /// The supplied [`crate::QueueConfig`] was rejected.
    #[error("invalid queue configuration: {reason}")]
    InvalidConfig { reason: String },

    /// The operation failed because a lock was **poisoned**.
    ///
    /// This occurs when a thread panics while holding a queue or shard lock.
    /// When the `parking-lot` feature is enabled, mutexes do **not** poison,
    /// so this variant is not available.
    #[cfg_attr(docsrs, doc(cfg(not(feature = "parking-lot"))))]
    #[cfg(not(feature = "parking-lot"))]
    #[error("message queue lock poisoned")]
    LockPoisoned,
}

#[cfg(not(feature = "parking-lot"))]
use std::sync::{MutexGuard, PoisonError, WaitTimeoutResult};

// Convert all poisoned lock errors to a simplified `LockPoisoned`
#[cfg(not(feature = "parking-lot"))]
impl<T> From<PoisonError<MutexGuard<'_, T>>> for Error {
    fn from(_: PoisonError<MutexGuard<'_, T>>) -> Self {
        Self::LockPoisoned
    }
}

#[cfg(not(feature = "parking-lot"))]
impl<T> From<PoisonError<(MutexGuard<'_, T>, WaitTimeoutResult)>> for Error {
    fn from(_: PoisonError<(MutexGuard<'_, T>, WaitTimeoutResult)>) -> Self {
        Self::LockPoisoned
    }
}

/// A payload the engine refused to accept, handed back to the caller.
///
/// Returned by [`crate::MessageQueue::submit`] and
/// [`crate::MessageQueue::publish`]. The engine never drops a payload it did
/// not take ownership of, so the caller stays responsible for it.
pub struct Rejected<T> {
    error: Error,
    payload: T,
}

impl<T> Rejected<T> {
    pub(crate) const fn new(error: Error, payload: T) -> Self {
        Self { error, payload }
    }

    pub(crate) const fn closed(payload: T) -> Self {
        Self::new(Error::Closed, payload)
    }

    /// Why the payload was refused.
    pub const fn error(&self) -> &Error {
        &self.error
    }

    /// Returns `true` if the payload was refused because the engine is shut
    /// down.
    pub const fn is_closed(&self) -> bool {
        matches!(self.error, Error::Closed)
    }

    /// Takes the payload back.
    pub fn into_payload(self) -> T {
        self.payload
    }

    /// Splits the rejection into the error and the payload.
    pub fn into_parts(self) -> (Error, T) {
        (self.error, self.payload)
    }
}

// Payloads are opaque, so they never show up in formatted output.
impl<T> fmt::Debug for Rejected<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rejected")
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl<T> fmt::Display for Rejected<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "payload rejected: {}", self.error)
    }
}

impl<T> core::error::Error for Rejected<T> {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl<T> From<Rejected<T>> for Error {
    fn from(rejected: Rejected<T>) -> Self {
        rejected.error
    }
}
