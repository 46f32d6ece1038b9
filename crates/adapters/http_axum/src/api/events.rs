//! JSON REST handlers for events.

use std::str::FromStr;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use valvehub_app::ports::{EventPublisher, EventStore, ValveDriver};
use valvehub_domain::error::{NotFoundError, ValidationError, ValveHubError};
use valvehub_domain::event::Event;
use valvehub_domain::id::{EventId, ValveIndex};

use crate::error::ApiError;
use crate::state::AppState;

const DEFAULT_LIMIT: usize = 100;
const MAX_LIMIT: usize = 1000;

/// Query parameters for the list endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
    /// Only events about this valve.
    pub valve: Option<ValveIndex>,
}

/// Possible responses from the list endpoint.
pub enum ListResponse {
    Ok(Json<Vec<Event>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the get endpoint.
pub enum GetResponse {
    Ok(Json<Event>),
}

impl IntoResponse for GetResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// `GET /api/events` — recent events, newest first.
pub async fn list<D, P, ES>(
    State(state): State<AppState<D, P, ES>>,
    Query(query): Query<ListQuery>,
) -> Result<ListResponse, ApiError>
where
    D: ValveDriver + 'static,
    P: EventPublisher + Send + Sync + 'static,
    ES: EventStore + Send + Sync + 'static,
{
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let events = match query.valve {
        Some(valve) => state.event_store.find_by_valve(valve, limit).await?,
        None => state.event_store.get_recent(limit).await?,
    };
    Ok(ListResponse::Ok(Json(events)))
}

/// `GET /api/events/{id}` — get event by ID.
pub async fn get<D, P, ES>(
    State(state): State<AppState<D, P, ES>>,
    Path(id): Path<String>,
) -> Result<GetResponse, ApiError>
where
    D: ValveDriver + 'static,
    P: EventPublisher + Send + Sync + 'static,
    ES: EventStore + Send + Sync + 'static,
{
    let event_id = EventId::from_str(&id)
        .map_err(|_| ValveHubError::from(ValidationError::InvalidId(id.clone())))?;
    let event = state
        .event_store
        .get_by_id(event_id)
        .await?
        .ok_or_else(|| {
            ValveHubError::from(NotFoundError {
                entity: "Event",
                id,
            })
        })?;
    Ok(GetResponse::Ok(Json(event)))
}
