//! JSON REST handlers for valves.

use axum::Json;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};

use valvehub_app::dispatcher::CommandOutcome;
use valvehub_app::ports::{EventPublisher, EventStore, ValveDriver};
use valvehub_domain::command::Command;
use valvehub_domain::id::ValveIndex;
use valvehub_domain::valve::Valve;

use crate::error::ApiError;
use crate::state::AppState;

/// Possible responses from the list endpoint.
pub enum ListResponse {
    Ok(Json<Vec<Valve>>),
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
    Ok(Json<Valve>),
}

impl IntoResponse for GetResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the toggle endpoint.
pub enum ToggleResponse {
    Ok(Json<CommandOutcome>),
}

impl IntoResponse for ToggleResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// `GET /api/valves` — every valve, in bank order.
pub async fn list<D, P, ES>(State(state): State<AppState<D, P, ES>>) -> ListResponse
where
    D: ValveDriver + 'static,
    P: EventPublisher + Send + Sync + 'static,
    ES: EventStore + Send + Sync + 'static,
{
    ListResponse::Ok(Json(state.dispatcher.valves().valves().await))
}

/// `GET /api/valves/{index}` — one valve.
pub async fn get<D, P, ES>(
    State(state): State<AppState<D, P, ES>>,
    Path(index): Path<ValveIndex>,
) -> Result<GetResponse, ApiError>
where
    D: ValveDriver + 'static,
    P: EventPublisher + Send + Sync + 'static,
    ES: EventStore + Send + Sync + 'static,
{
    let valve = state.dispatcher.valves().get(index).await?;
    Ok(GetResponse::Ok(Json(valve)))
}

/// `POST /api/valves/{index}/toggle` — open this valve, closing the others.
pub async fn toggle<D, P, ES>(
    State(state): State<AppState<D, P, ES>>,
    Path(index): Path<ValveIndex>,
) -> Result<ToggleResponse, ApiError>
where
    D: ValveDriver + 'static,
    P: EventPublisher + Send + Sync + 'static,
    ES: EventStore + Send + Sync + 'static,
{
    let outcome = state
        .dispatcher
        .dispatch(Command::Toggle { valve: index })
        .await?;
    Ok(ToggleResponse::Ok(Json(outcome)))
}
