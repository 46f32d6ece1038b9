//! Shared fixtures for handler tests.

use std::sync::{Arc, Mutex};

use axum::response::Response;
use http_body_util::BodyExt;

use valvehub_adapter_virtual::{VirtualHandle, VirtualValveDriver};
use valvehub_app::dispatcher::{CommandDispatcher, DispatchLimits};
use valvehub_app::event_bus::InProcessEventBus;
use valvehub_app::ports::EventStore;
use valvehub_app::services::valve_service::ValveService;
use valvehub_domain::error::ValveHubError;
use valvehub_domain::event::Event;
use valvehub_domain::id::{EventId, ValveIndex};
use valvehub_domain::valve::ValveBank;

use crate::state::AppState;

#[derive(Default)]
pub(crate) struct MemoryEventStore {
    events: Mutex<Vec<Event>>,
}

impl EventStore for MemoryEventStore {
    async fn store(&self, event: Event) -> Result<Event, ValveHubError> {
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

pub(crate) type TestState =
    AppState<VirtualValveDriver, Arc<InProcessEventBus>, MemoryEventStore>;

pub(crate) struct Harness {
    pub(crate) state: TestState,
    pub(crate) bus: Arc<InProcessEventBus>,
    pub(crate) driver: VirtualHandle,
    pub(crate) store: Arc<MemoryEventStore>,
}

/// Twelve valves on the default relay mapping, valve 0 open.
pub(crate) fn harness() -> Harness {
    let bus = Arc::new(InProcessEventBus::new(64));
    let driver = VirtualValveDriver::new();
    let handle = driver.handle();
    let bank = ValveBank::builder().build().unwrap();
    let valves = Arc::new(ValveService::new(bank, driver, Arc::clone(&bus)));
    let dispatcher = Arc::new(CommandDispatcher::new(valves, DispatchLimits::default()));
    let store = Arc::new(MemoryEventStore::default());
    Harness {
        state: AppState::new(dispatcher, Arc::clone(&store), Arc::clone(&bus)),
        bus,
        driver: handle,
        store,
    }
}

pub(crate) async fn json_body(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
