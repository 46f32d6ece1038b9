//! Raw command endpoint, accepting the same JSON the WebSocket does.

use axum::Json;
use axum::extract::State;
use axum::response::{IntoResponse, Response};

use valvehub_app::dispatcher::CommandOutcome;
use valvehub_app::ports::{EventPublisher, EventStore, ValveDriver};
use valvehub_domain::command::Command;

use crate::error::ApiError;
use crate::state::AppState;

/// Possible responses from the dispatch endpoint.
pub enum DispatchResponse {
    Ok(Json<CommandOutcome>),
}

impl IntoResponse for DispatchResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// `POST /api/commands` — decode and dispatch one command.
pub async fn dispatch<D, P, ES>(
    State(state): State<AppState<D, P, ES>>,
    body: String,
) -> Result<DispatchResponse, ApiError>
where
    D: ValveDriver + 'static,
    P: EventPublisher + Send + Sync + 'static,
    ES: EventStore + Send + Sync + 'static,
{
    let command = Command::parse(&body)?;
    let outcome = state.dispatcher.dispatch(command).await?;
    Ok(DispatchResponse::Ok(Json(outcome)))
}
