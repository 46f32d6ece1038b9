//! Event store port — persistence for domain events.

use std::future::Future;

use valvehub_domain::error::ValveHubError;
use valvehub_domain::event::Event;
use valvehub_domain::id::{EventId, ValveIndex};

/// Repository for persisting and querying [`Event`]s.
pub trait EventStore {
    /// Persist a new event.
    fn store(&self, event: Event) -> impl Future<Output = Result<Event, ValveHubError>> + Send;

    /// Get an event by its unique identifier.
    fn get_by_id(
        &self,
        id: EventId,
    ) -> impl Future<Output = Result<Option<Event>, ValveHubError>> + Send;

    /// Get the most recent events, ordered newest-first.
    fn get_recent(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Event>, ValveHubError>> + Send;

    /// Find events for a specific valve, ordered newest-first.
    fn find_by_valve(
        &self,
        valve: ValveIndex,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Event>, ValveHubError>> + Send;
}

impl<T: EventStore + Send + Sync> EventStore for std::sync::Arc<T> {
    fn store(&self, event: Event) -> impl Future<Output = Result<Event, ValveHubError>> + Send {
        (**self).store(event)
    }

    fn get_by_id(
        &self,
        id: EventId,
    ) -> impl Future<Output = Result<Option<Event>, ValveHubError>> + Send {
        (**self).get_by_id(id)
    }

    fn get_recent(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Event>, ValveHubError>> + Send {
        (**self).get_recent(limit)
    }

    fn find_by_valve(
        &self,
        valve: ValveIndex,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Event>, ValveHubError>> + Send {
        (**self).find_by_valve(valve, limit)
    }
}
