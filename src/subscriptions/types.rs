//! Subscription handle types.

use crossbeam_channel::{Receiver, RecvError, RecvTimeoutError, TryIter, TryRecvError};
use std::time::Duration;

/// Unique identifier for a subscription within its subject.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Handle to one subscriber's stream.
///
/// Values are queued synchronously by the publishing call and read here at
/// the subscriber's pace. Once the stream completes the channel disconnects
/// after the remaining values are drained. Dropping the handle unsubscribes.
/// A subscriber that leaves more than the subject's buffer size unread is
/// dropped the same way.
pub struct Subscription<T> {
    pub id: SubscriptionId,
    /// Channel to receive values.
    pub receiver: Receiver<T>,
}

impl<T> Subscription<T> {
    pub(crate) fn new(id: SubscriptionId, receiver: Receiver<T>) -> Self {
        Self { id, receiver }
    }

    /// Receive the next value (blocking).
    ///
    /// Returns an error once the stream has completed and is drained.
    pub fn recv(&self) -> Result<T, RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a value (non-blocking).
    pub fn try_recv(&self) -> Result<T, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<T, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Iterate over the values queued so far.
    pub fn try_iter(&self) -> TryIter<'_, T> {
        self.receiver.try_iter()
    }

    /// Drain the queue and return the most recent value, if any.
    pub fn latest(&self) -> Option<T> {
        self.receiver.try_iter().last()
    }

    /// Number of values waiting to be read.
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    /// Stop receiving. Equivalent to dropping the handle.
    ///
    /// The subject notices on its next publish, so
    /// [`Subject::subscriber_count`](super::Subject::subscriber_count) still
    /// counts this subscriber until then. Use
    /// [`Subject::unsubscribe`](super::Subject::unsubscribe) to remove it
    /// immediately.
    pub fn unsubscribe(self) {}
}
