//! JSON REST API handler modules.

#[allow(clippy::missing_errors_doc)]
pub mod auto;
#[allow(clippy::missing_errors_doc)]
pub mod commands;
#[allow(clippy::missing_errors_doc)]
pub mod events;
pub mod sse;
#[allow(clippy::missing_errors_doc)]
pub mod valves;

use axum::Router;
use axum::routing::{get, post};

use valvehub_app::ports::{EventPublisher, EventStore, ValveDriver};

use crate::state::AppState;

/// Build the `/api` sub-router.
pub fn routes<D, P, ES>() -> Router<AppState<D, P, ES>>
where
    D: ValveDriver + 'static,
    P: EventPublisher + Send + Sync + 'static,
    ES: EventStore + Send + Sync + 'static,
{
    Router::new()
        // Valves
        .route("/valves", get(valves::list::<D, P, ES>))
        .route("/valves/{index}", get(valves::get::<D, P, ES>))
        .route("/valves/{index}/toggle", post(valves::toggle::<D, P, ES>))
        // Auto-control
        .route(
            "/auto",
            get(auto::status::<D, P, ES>)
                .post(auto::start::<D, P, ES>)
                .delete(auto::stop::<D, P, ES>),
        )
        // Raw commands, same JSON as the WebSocket
        .route("/commands", post(commands::dispatch::<D, P, ES>))
        // Events
        .route("/events", get(events::list::<D, P, ES>))
        .route("/events/stream", get(sse::stream::<D, P, ES>))
        .route("/events/{id}", get(events::get::<D, P, ES>))
}
