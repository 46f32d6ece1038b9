//! Event recorder — persists everything that crosses the event bus.

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use valvehub_domain::event::Event;

use crate::ports::EventStore;

/// Drains a bus subscription into an [`EventStore`].
///
/// Storage failures are logged and skipped; the recorder only stops once
/// the bus is dropped.
pub struct EventRecorder<S> {
    store: S,
}

impl<S> EventRecorder<S>
where
    S: EventStore + Send + Sync + 'static,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Run on a background task.
    pub fn spawn(self, receiver: broadcast::Receiver<Event>) -> JoinHandle<()> {
        tokio::spawn(self.run(receiver))
    }

    /// Record events until the bus closes.
    pub async fn run(self, mut receiver: broadcast::Receiver<Event>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    let event_type = event.event_type;
                    if let Err(err) = self.store.store(event).await {
                        tracing::warn!(%event_type, error = %err, "failed to record event");
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event recorder lagged, some events were not recorded");
                }
                Err(RecvError::Closed) => {
                    tracing::debug!("event bus closed, recorder stopping");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use valvehub_domain::error::ValveHubError;
    use valvehub_domain::event::EventType;
    use valvehub_domain::id::{EventId, ValveIndex};

    use crate::event_bus::InProcessEventBus;
    use crate::ports::EventPublisher;

    #[derive(Clone, Default)]
    struct MemoryStore {
        events: Arc<Mutex<Vec<Event>>>,
        reject: bool,
    }

    impl EventStore for MemoryStore {
        async fn store(&self, event: Event) -> Result<Event, ValveHubError> {
            if self.reject {
                return Err(ValveHubError::Storage(Box::new(std::io::Error::other(
                    "disk full",
                ))));
            }
            self.events.lock().unwrap().push(event.clone());
            Ok(event)
        }

        async fn get_by_id(&self, id: EventId) -> Result<Option<Event>, ValveHubError> {
            Ok(self
                .events
                .lock()
                .unwrap()
                .iter()
                .find(|e| e.id == id)
                .cloned())
        }

        async fn get_recent(&self, limit: usize) -> Result<Vec<Event>, ValveHubError> {
            Ok(self
                .events
                .lock()
                .unwrap()
                .iter()
                .rev()
                .take(limit)
                .cloned()
                .collect())
        }

        async fn find_by_valve(
            &self,
            valve: ValveIndex,
            limit: usize,
        ) -> Result<Vec<Event>, ValveHubError> {
            Ok(self
                .events
                .lock()
                .unwrap()
                .iter()
                .rev()
                .filter(|e| e.valve == Some(valve))
                .take(limit)
                .cloned()
                .collect())
        }
    }

    #[tokio::test]
    async fn should_record_published_events_until_bus_closes() {
        let bus = InProcessEventBus::new(16);
        let store = MemoryStore::default();
        let handle = EventRecorder::new(store.clone()).spawn(bus.subscribe());

        bus.publish(Event::observer(true, 1)).await.unwrap();
        bus.publish(Event::observer(false, 1)).await.unwrap();
        drop(bus);
        handle.await.unwrap();

        let recorded = store.events.lock().unwrap();
        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded[0].event_type, EventType::ObserverConnected);
        assert_eq!(recorded[1].event_type, EventType::ObserverDisconnected);
    }

    #[tokio::test]
    async fn should_keep_running_when_store_fails() {
        let bus = InProcessEventBus::new(16);
        let store = MemoryStore {
            reject: true,
            ..MemoryStore::default()
        };
        let handle = EventRecorder::new(store.clone()).spawn(bus.subscribe());

        bus.publish(Event::observer(true, 1)).await.unwrap();
        bus.publish(Event::observer(true, 2)).await.unwrap();
        drop(bus);

        assert!(handle.await.is_ok());
        assert!(store.events.lock().unwrap().is_empty());
    }
}
