//! Replay-of-one multicast subject.

use crossbeam_channel::{bounded, Sender, TrySendError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use super::operators::{self, Emit};
use super::types::{Subscription, SubscriptionId};

/// Max queued values per subscriber before the subscriber is dropped.
pub const DEFAULT_BUFFER_SIZE: usize = 1000;

/// Feeds one subscriber. Returns false once the subscriber is finished:
/// completed by its operator, its handle was dropped, or its buffer is full.
type Sink<T> = Box<dyn FnMut(&T) -> bool + Send>;

/// Internal subject state.
struct SubjectState<T> {
    /// Most recently published value, replayed to new subscribers.
    latest: Option<T>,
    /// Live subscribers in subscription order.
    sinks: Vec<(SubscriptionId, Sink<T>)>,
    completed: bool,
}

/// Publishes values to any number of subscribers.
pub struct Subject<T> {
    state: Mutex<SubjectState<T>>,
    /// Counter for generating subscription IDs.
    next_id: AtomicU64,
    buffer_size: usize,
}

/// Queue a value for one subscriber. Returns false if the subscriber is gone
/// or has fallen `buffer_size` values behind; either way it is dropped.
fn deliver<U>(sender: &Sender<U>, id: SubscriptionId, value: U) -> bool {
    match sender.try_send(value) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            tracing::warn!(subscription = id.0, "subscriber buffer full, dropping subscriber");
            false
        }
        Err(TrySendError::Disconnected(_)) => false,
    }
}

impl<T: Clone + Send + 'static> Subject<T> {
    /// Create a subject with nothing to replay.
    pub fn new() -> Self {
        Self::with_buffer_size(DEFAULT_BUFFER_SIZE)
    }

    /// Create a subject whose subscribers may queue at most `buffer_size`
    /// unread values. A subscriber that falls further behind is dropped and
    /// its channel disconnects once drained.
    pub fn with_buffer_size(buffer_size: usize) -> Self {
        Self {
            state: Mutex::new(SubjectState {
                latest: None,
                sinks: Vec::new(),
                completed: false,
            }),
            next_id: AtomicU64::new(1),
            buffer_size: buffer_size.max(1),
        }
    }

    /// Publish a value to every subscriber, in subscription order.
    ///
    /// Ignored once the subject has completed.
    pub fn next(&self, value: T) {
        let mut state = self.state.lock();
        if state.completed {
            tracing::trace!("publish on completed subject ignored");
            return;
        }
        state.sinks.retain_mut(|(_, sink)| sink(&value));
        state.latest = Some(value);
    }

    /// Subscribe to the values as published.
    pub fn subscribe(&self) -> Subscription<T> {
        self.subscribe_with(operators::identity())
    }

    /// Subscribe through an operator.
    ///
    /// The latest value, if any, is run through the operator and delivered
    /// before this returns. Subscribing to a completed subject replays the
    /// latest value and then completes.
    pub fn subscribe_with<U, F>(&self, mut operator: F) -> Subscription<U>
    where
        U: Send + 'static,
        F: FnMut(&T) -> Emit<U> + Send + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = bounded(self.buffer_size);

        let mut sink: Sink<T> = Box::new(move |value| match operator(value) {
            Emit::Skip => true,
            Emit::Next(out) => deliver(&sender, id, out),
            Emit::Last(out) => {
                deliver(&sender, id, out);
                false
            }
        });

        let mut state = self.state.lock();
        let live = match state.latest.as_ref() {
            Some(latest) => sink(latest),
            None => true,
        };
        if live && !state.completed {
            state.sinks.push((id, sink));
        }

        Subscription::new(id, receiver)
    }

    /// The most recently published value.
    pub fn latest(&self) -> Option<T> {
        self.state.lock().latest.clone()
    }

    /// Complete the subject. Subscriber channels disconnect once drained.
    pub fn complete(&self) {
        let mut state = self.state.lock();
        state.completed = true;
        state.sinks.clear();
    }

    pub fn is_completed(&self) -> bool {
        self.state.lock().completed
    }

    /// Remove a subscriber, completing its stream.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.state.lock().sinks.retain(|(sink_id, _)| *sink_id != id);
    }

    /// Number of registered subscribers.
    ///
    /// A subscriber whose handle was dropped stays registered until the next
    /// [`next`](Subject::next), so the count may include it until then.
    pub fn subscriber_count(&self) -> usize {
        self.state.lock().sinks.len()
    }
}

impl<T: Clone + Send + 'static> Default for Subject<T> {
    fn default() -> Self {
        Self::new()
    }
}
