//! JSON REST handlers for auto-control.

use axum::Json;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use valvehub_app::auto_control::AutoStatus;
use valvehub_app::dispatcher::CommandOutcome;
use valvehub_app::ports::{EventPublisher, EventStore, ValveDriver};
use valvehub_domain::command::{AutoDuration, Command};

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for starting auto-control.
#[derive(Deserialize)]
pub struct StartAutoRequest {
    /// Dwell per valve, in minutes.
    pub duration: AutoDuration,
    #[serde(default)]
    pub cycles: Option<u32>,
}

/// Possible responses from the status endpoint.
pub enum StatusResponse {
    Ok(Json<AutoStatus>),
}

impl IntoResponse for StatusResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the start and stop endpoints.
pub enum CommandResponse {
    Ok(Json<CommandOutcome>),
}

impl IntoResponse for CommandResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// `GET /api/auto` — current auto-control state.
pub async fn status<D, P, ES>(State(state): State<AppState<D, P, ES>>) -> StatusResponse
where
    D: ValveDriver + 'static,
    P: EventPublisher + Send + Sync + 'static,
    ES: EventStore + Send + Sync + 'static,
{
    StatusResponse::Ok(Json(state.dispatcher.auto().status().await))
}

/// `POST /api/auto` — start (or restart) auto-control.
pub async fn start<D, P, ES>(
    State(state): State<AppState<D, P, ES>>,
    Json(req): Json<StartAutoRequest>,
) -> Result<CommandResponse, ApiError>
where
    D: ValveDriver + 'static,
    P: EventPublisher + Send + Sync + 'static,
    ES: EventStore + Send + Sync + 'static,
{
    let outcome = state
        .dispatcher
        .dispatch(Command::StartAuto {
            duration: req.duration,
            cycles: req.cycles,
        })
        .await?;
    Ok(CommandResponse::Ok(Json(outcome)))
}

/// `DELETE /api/auto` — stop auto-control.
pub async fn stop<D, P, ES>(
    State(state): State<AppState<D, P, ES>>,
) -> Result<CommandResponse, ApiError>
where
    D: ValveDriver + 'static,
    P: EventPublisher + Send + Sync + 'static,
    ES: EventStore + Send + Sync + 'static,
{
    let outcome = state.dispatcher.dispatch(Command::StopAuto).await?;
    Ok(CommandResponse::Ok(Json(outcome)))
}
