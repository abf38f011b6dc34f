use core::fmt;

use portable_atomic::{AtomicU64, Ordering};

/// Correlates a request with its eventual response.
///
/// Identifiers are minted by the engine when a request is submitted and are
/// unique for the lifetime of that engine (up to wraparound, see
/// [`IdAllocator`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(u64);

impl MessageId {
    /// Wraps a raw identifier value.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw identifier value.
    pub const fn to_raw(self) -> u64 {
        self.0
    }

    /// Index of the correlation shard this identifier lives in.
    pub(crate) const fn shard(self, shards: usize) -> usize {
        (self.0 % shards as u64) as usize
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for MessageId {
    fn from(raw: u64) -> Self {
        Self::from_raw(raw)
    }
}

impl From<MessageId> for u64 {
    fn from(id: MessageId) -> Self {
        id.to_raw()
    }
}

/// A lock-free, monotonically increasing identifier source.
///
/// The counter starts at zero and is advanced with a single `fetch_add`, so it
/// can be shared freely between producer threads.
///
/// ## Caveats
/// The counter wraps around after [`u64::MAX`]. Identifiers minted after
/// wraparound may collide with ones still in flight; at one id per nanosecond
/// that takes centuries, so no attempt is made to detect it.
pub struct IdAllocator {
    #[cfg(feature = "cache-padded")]
    next: crossbeam_utils::CachePadded<AtomicU64>,
    #[cfg(not(feature = "cache-padded"))]
    next: AtomicU64,
}

impl IdAllocator {
    /// Creates an allocator whose first identifier is `0`.
    pub const fn new() -> Self {
        Self::starting_at(0)
    }

    /// Creates an allocator whose first identifier is `first`.
    pub const fn starting_at(first: u64) -> Self {
        Self {
            #[cfg(feature = "cache-padded")]
            next: crossbeam_utils::CachePadded::new(AtomicU64::new(first)),
            #[cfg(not(feature = "cache-padded"))]
            next: AtomicU64::new(first),
        }
    }

    /// Returns the next identifier.
    ///
    /// # Example
    /// ```
    /// use mqueue::IdAllocator;
    ///
    /// let ids = IdAllocator::new();
    /// assert_eq!(ids.next_id().to_raw(), 0);
    /// assert_eq!(ids.next_id().to_raw(), 1);
    /// ```
    pub fn next_id(&self) -> MessageId {
        MessageId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for IdAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdAllocator")
            .field("next", &self.next.load(Ordering::Relaxed))
            .finish()
    }
}
