//! Server-Sent Events (SSE) stream for real-time updates.

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::{BroadcastStream, WatchStream};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use valvehub_app::ports::{EventPublisher, EventStore, ValveDriver};

use crate::state::AppState;

/// `GET /api/events/stream` — SSE stream of real-time domain events.
///
/// Each event is sent as a JSON `data:` frame, named after its event type.
/// Unlike the WebSocket, lagging here only drops events; there is no resync.
/// The stream ends when the server begins shutting down.
pub async fn stream<D, P, ES>(
    State(state): State<AppState<D, P, ES>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, std::convert::Infallible>>>
where
    D: ValveDriver + 'static,
    P: EventPublisher + Send + Sync + 'static,
    ES: EventStore + Send + Sync + 'static,
{
    let event_rx = state.event_bus.subscribe();
    let event_stream = BroadcastStream::new(event_rx).filter_map(|result| match result {
        Ok(event) => match serde_json::to_string(&event) {
            Ok(json) => Some(Ok(Event::default()
                .event(event.event_type.as_str())
                .data(json))),
            Err(err) => {
                tracing::warn!(%err, "failed to serialize event to JSON for SSE stream");
                None
            }
        },
        Err(BroadcastStreamRecvError::Lagged(n)) => {
            tracing::warn!(
                skipped = n,
                "SSE subscriber lagged, some events were dropped"
            );
            None
        }
    });

    // `None` marks the end of the stream.
    let closing = WatchStream::new(state.closing_signal())
        .filter(|down| *down)
        .map(|_| None);
    let frames = event_stream
        .map(Some)
        .merge(closing)
        .take_while(Option::is_some)
        .filter_map(std::convert::identity);

    Sse::new(frames).keep_alive(KeepAlive::default())
}
