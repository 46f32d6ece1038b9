//! Shared application state for axum handlers.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;

use valvehub_app::dispatcher::CommandDispatcher;
use valvehub_app::event_bus::InProcessEventBus;
use valvehub_app::ports::{EventPublisher, EventStore, ValveDriver};

/// Application state shared across all axum handlers.
///
/// Generic over the valve driver, the registry's event publisher and the
/// event store to avoid dynamic dispatch. `Clone` is implemented manually so
/// the underlying types themselves do not need to be `Clone` — only the
/// `Arc` wrappers are cloned.
pub struct AppState<D, P, ES> {
    /// Command entry point, also exposing the registry and auto-control.
    pub dispatcher: Arc<CommandDispatcher<D, P>>,
    /// Event store for querying persisted events.
    pub event_store: Arc<ES>,
    /// Event bus observers subscribe to.
    pub event_bus: Arc<InProcessEventBus>,
    observers: Arc<AtomicU64>,
    closing: Arc<watch::Sender<bool>>,
}

impl<D, P, ES> Clone for AppState<D, P, ES> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: Arc::clone(&self.dispatcher),
            event_store: Arc::clone(&self.event_store),
            event_bus: Arc::clone(&self.event_bus),
            observers: Arc::clone(&self.observers),
            closing: Arc::clone(&self.closing),
        }
    }
}

impl<D, P, ES> AppState<D, P, ES>
where
    D: ValveDriver + 'static,
    P: EventPublisher + Send + Sync + 'static,
    ES: EventStore + Send + Sync + 'static,
{
    pub fn new(
        dispatcher: Arc<CommandDispatcher<D, P>>,
        event_store: Arc<ES>,
        event_bus: Arc<InProcessEventBus>,
    ) -> Self {
        let (closing, _) = watch::channel(false);
        Self {
            dispatcher,
            event_store,
            event_bus,
            observers: Arc::new(AtomicU64::new(0)),
            closing: Arc::new(closing),
        }
    }

    /// Allocate an id for a new observer connection.
    pub fn next_observer_id(&self) -> u64 {
        self.observers.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Tell every long-lived response (SSE streams, observer sockets) to end.
    pub fn begin_shutdown(&self) {
        self.closing.send_replace(true);
    }

    /// Receiver of the shutdown flag, `true` once shutdown began.
    pub(crate) fn closing_signal(&self) -> watch::Receiver<bool> {
        self.closing.subscribe()
    }

    /// Resolves once [`begin_shutdown`](Self::begin_shutdown) was called,
    /// immediately if it already was.
    pub fn closed(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.closing_signal();
        async move {
            loop {
                let down = *rx.borrow_and_update();
                if down || rx.changed().await.is_err() {
                    break;
                }
            }
        }
    }
}
