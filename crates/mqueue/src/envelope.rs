use core::fmt;

use crate::MessageId;

/// A payload tagged with the identifier it travels under.
///
/// Workers receive envelopes from [`crate::MessageQueue::take_request`] and
/// answer with [`crate::MessageQueue::publish`] (or
/// [`crate::MessageQueue::publish_envelope`]) under the same identifier. The
/// engine never looks inside the payload.
pub struct Envelope<T> {
    id: MessageId,
    payload: T,
}

impl<T> Envelope<T> {
    /// Wraps `payload` under `id`.
    pub const fn new(id: MessageId, payload: T) -> Self {
        Self { id, payload }
    }

    pub const fn id(&self) -> MessageId {
        self.id
    }

    pub const fn payload(&self) -> &T {
        &self.payload
    }

    pub fn payload_mut(&mut self) -> &mut T {
        &mut self.payload
    }

    pub fn into_payload(self) -> T {
        self.payload
    }

    pub fn into_parts(self) -> (MessageId, T) {
        (self.id, self.payload)
    }

    /// Replaces the payload while keeping the identifier, turning a request
    /// into its response.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Envelope<U> {
        Envelope {
            id: self.id,
            payload: f(self.payload),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Envelope<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Envelope")
            .field("id", &self.id)
            .field("payload", &self.payload)
            .finish()
    }
}
