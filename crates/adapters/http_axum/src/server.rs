//! Serving loop with graceful shutdown.

use std::future::{Future, IntoFuture};
use std::path::PathBuf;
use std::time::Duration;

use tokio::net::TcpListener;

use valvehub_app::ports::{EventPublisher, EventStore, ValveDriver};

use crate::router;
use crate::state::AppState;

/// Serve the router on `listener` until `signal` resolves.
///
/// Once the signal fires, auto-control is stopped first so no relay switches
/// while the server winds down. SSE streams and observer sockets are then
/// told to close, and the remaining connections get `drain` to finish before
/// they are abandoned.
///
/// # Errors
///
/// Returns the I/O error that made the accept loop fail.
pub async fn serve<D, P, ES>(
    listener: TcpListener,
    state: AppState<D, P, ES>,
    ui_dir: Option<PathBuf>,
    signal: impl Future<Output = ()> + Send + 'static,
    drain: Duration,
) -> std::io::Result<()>
where
    D: ValveDriver + 'static,
    P: EventPublisher + Send + Sync + 'static,
    ES: EventStore + Send + Sync + 'static,
{
    let app = router::build(state.clone(), ui_dir);

    let stopping = {
        let state = state.clone();
        async move {
            signal.await;
            tracing::info!("shutting down");
            state.dispatcher.shutdown().await;
            state.begin_shutdown();
        }
    };

    let server = axum::serve(listener, app)
        .with_graceful_shutdown(stopping)
        .into_future();
    let mut server = std::pin::pin!(server);

    tokio::select! {
        result = &mut server => return result,
        () = state.closed() => {}
    }

    if let Ok(result) = tokio::time::timeout(drain, server).await {
        result
    } else {
        tracing::warn!(?drain, "connections still open after drain period, closing");
        Ok(())
    }
}
