//! In-process event bus backed by a tokio broadcast channel.
//!
//! This is the fan-out point of the broadcast hub: every observer
//! connection, the SSE stream, and the event recorder hold their own
//! receiver.

use std::future::Future;

use tokio::sync::broadcast;

use valvehub_domain::error::ValveHubError;
use valvehub_domain::event::Event;

use crate::ports::EventPublisher;

/// In-process event bus using a tokio [`broadcast`] channel.
///
/// Publishing succeeds even when there are no active subscribers
/// (the event is simply dropped). A receiver that falls more than
/// `capacity` events behind gets `RecvError::Lagged` and must resync.
pub struct InProcessEventBus {
    sender: broadcast::Sender<Event>,
}

impl InProcessEventBus {
    /// Create a new event bus with the given channel capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero (tokio rejects empty broadcast channels).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events on this bus.
    ///
    /// Returns a receiver that will get all events published *after*
    /// the subscription is created.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }
}

impl EventPublisher for InProcessEventBus {
    fn publish(&self, event: Event) -> impl Future<Output = Result<(), ValveHubError>> + Send {
        // send only fails with zero receivers
        if self.sender.send(event).is_err() {
            tracing::trace!("event dropped, no subscribers");
        }
        async { Ok(()) }
    }
}
