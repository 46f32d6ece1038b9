//! `SQLite` implementation of [`EventStore`].

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use valvehub_app::ports::EventStore;
use valvehub_domain::error::ValveHubError;
use valvehub_domain::event::{Event, EventType};
use valvehub_domain::id::{EventId, ValveIndex};

use crate::error::StorageError;

struct Wrapper(Event);

impl Wrapper {
    fn maybe(value: Option<Self>) -> Option<Event> {
        value.map(|w| w.0)
    }
}

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: uuid::Uuid = row.try_get("id")?;
        let event_type: String = row.try_get("event_type")?;
        let valve: Option<i64> = row.try_get("valve")?;
        let timestamp_str: String = row.try_get("timestamp")?;
        let data_json: String = row.try_get("data")?;

        let event_type: EventType = event_type
            .parse()
            .map_err(|err| sqlx::Error::Decode(Box::new(err)))?;
        let valve = valve
            .map(ValveIndex::try_from)
            .transpose()
            .map_err(|err| sqlx::Error::Decode(Box::new(err)))?;
        let timestamp = chrono::DateTime::parse_from_rfc3339(&timestamp_str)
            .map_err(|err| sqlx::Error::Decode(Box::new(err)))?
            .to_utc();
        let data: serde_json::Value =
            serde_json::from_str(&data_json).map_err(|err| sqlx::Error::Decode(Box::new(err)))?;

        Ok(Self(Event {
            id: EventId::from_uuid(id),
            event_type,
            valve,
            timestamp,
            data,
        }))
    }
}

const INSERT: &str = r"
    INSERT INTO events (id, event_type, valve, timestamp, data)
    VALUES (?, ?, ?, ?, ?)
";

const SELECT_BY_ID: &str = "SELECT * FROM events WHERE id = ?";
const SELECT_RECENT: &str =
    "SELECT * FROM events ORDER BY timestamp DESC, rowid DESC LIMIT ?";
const SELECT_BY_VALVE: &str =
    "SELECT * FROM events WHERE valve = ? ORDER BY timestamp DESC, rowid DESC LIMIT ?";

/// `SQLite`-backed event store.
#[derive(Clone)]
pub struct SqliteEventStore {
    pool: SqlitePool,
}

impl SqliteEventStore {
    /// Create a new event store using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn bind_valve(valve: ValveIndex) -> Result<i64, StorageError> {
    i64::try_from(valve).map_err(|_| StorageError::ValveIndex(valve))
}

fn bind_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

impl EventStore for SqliteEventStore {
    async fn store(&self, event: Event) -> Result<Event, ValveHubError> {
        let data_json = serde_json::to_string(&event.data).map_err(StorageError::from)?;
        let valve = event.valve.map(bind_valve).transpose()?;

        sqlx::query(INSERT)
            .bind(event.id.as_uuid())
            .bind(event.event_type.as_str())
            .bind(valve)
            .bind(event.timestamp.to_rfc3339())
            .bind(&data_json)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(event)
    }

    async fn get_by_id(&self, id: EventId) -> Result<Option<Event>, ValveHubError> {
        let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_ID)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(Wrapper::maybe(row))
    }

    async fn get_recent(&self, limit: usize) -> Result<Vec<Event>, ValveHubError> {
        let rows: Vec<Wrapper> = sqlx::query_as(SELECT_RECENT)
            .bind(bind_limit(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    async fn find_by_valve(
        &self,
        valve: ValveIndex,
        limit: usize,
    ) -> Result<Vec<Event>, ValveHubError> {
        let rows: Vec<Wrapper> = sqlx::query_as(SELECT_BY_VALVE)
            .bind(bind_valve(valve)?)
            .bind(bind_limit(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(rows.into_iter().map(|w| w.0).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Config;
    use valvehub_domain::event::{ChangeOrigin, StopReason};
    use valvehub_domain::id::RunId;
    use valvehub_domain::valve::{ValveChange, ValveState};

    async fn setup() -> SqliteEventStore {
        Config {
            database_url: "sqlite::memory:".to_string(),
        }
        .build()
        .await
        .unwrap()
        .event_store()
    }

    fn opened(valve: ValveIndex) -> Event {
        Event::valve_changed(
            ValveChange {
                valve,
                from: ValveState::Closed,
                to: ValveState::Open,
            },
            ChangeOrigin::Manual,
        )
    }

    #[tokio::test]
    async fn should_store_and_retrieve_event_by_id() {
        let store = setup().await;
        let event = opened(4);
        let id = event.id;

        store.store(event).await.unwrap();

        let fetched = store.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(fetched.id, id);
        assert_eq!(fetched.event_type, EventType::ValveChanged);
        assert_eq!(fetched.valve, Some(4));
        assert_eq!(fetched.data["to"], "open");
        assert_eq!(fetched.data["origin"], "manual");
    }

    #[tokio::test]
    async fn should_return_none_when_event_not_found() {
        let store = setup().await;
        let result = store.get_by_id(EventId::new()).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn should_store_event_without_valve() {
        let store = setup().await;
        let event = Event::auto_stopped(RunId::new(), StopReason::Completed);
        let id = event.id;

        store.store(event).await.unwrap();

        let fetched = store.get_by_id(id).await.unwrap().unwrap();
        assert!(fetched.valve.is_none());
        assert_eq!(fetched.data["reason"], "completed");
    }

    #[tokio::test]
    async fn should_get_recent_events_ordered_newest_first() {
        let store = setup().await;

        let first = opened(1);
        let first_id = first.id;
        store.store(first).await.unwrap();

        let second = Event::auto_started(RunId::new(), 5.0, 1);
        let second_id = second.id;
        store.store(second).await.unwrap();

        let recent = store.get_recent(10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, second_id);
        assert_eq!(recent[1].id, first_id);
    }

    #[tokio::test]
    async fn should_respect_limit_on_get_recent() {
        let store = setup().await;

        for valve in 0..5 {
            store.store(opened(valve)).await.unwrap();
        }

        let recent = store.get_recent(3).await.unwrap();
        assert_eq!(recent.len(), 3);
    }

    #[tokio::test]
    async fn should_find_events_by_valve() {
        let store = setup().await;

        store.store(opened(2)).await.unwrap();
        store.store(opened(2)).await.unwrap();
        store.store(opened(3)).await.unwrap();
        store.store(Event::observer(true, 1)).await.unwrap();

        let by_valve = store.find_by_valve(2, 10).await.unwrap();
        assert_eq!(by_valve.len(), 2);
        assert!(by_valve.iter().all(|e| e.valve == Some(2)));

        let other = store.find_by_valve(9, 10).await.unwrap();
        assert!(other.is_empty());
    }
}
