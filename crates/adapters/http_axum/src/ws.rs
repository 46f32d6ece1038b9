//! WebSocket observer endpoint.
//!
//! Every connected client is an observer: it gets the full valve snapshot
//! on connect, then one `update` per valve change. Text frames from the
//! client are decoded as commands. A rejected command is answered with an
//! `error` message to that client alone.

use std::future::Future;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use tokio::sync::broadcast::error::RecvError;

use valvehub_app::ports::{EventPublisher, EventStore, ValveDriver};
use valvehub_domain::command::Command;
use valvehub_domain::event::Event;
use valvehub_domain::message::ServerMessage;

use crate::error::describe;
use crate::state::AppState;

/// `GET /ws` — upgrade to a WebSocket observer connection.
pub async fn upgrade<D, P, ES>(
    ws: WebSocketUpgrade,
    State(state): State<AppState<D, P, ES>>,
) -> Response
where
    D: ValveDriver + 'static,
    P: EventPublisher + Send + Sync + 'static,
    ES: EventStore + Send + Sync + 'static,
{
    ws.on_upgrade(move |socket| observe(socket, state))
}

/// Transport side of an observer connection.
pub(crate) trait ObserverSocket: Send {
    /// Next frame from the client; `None` once the connection is gone.
    fn recv(&mut self) -> impl Future<Output = Option<Result<Message, axum::Error>>> + Send;

    fn send(&mut self, message: Message) -> impl Future<Output = Result<(), axum::Error>> + Send;
}

impl ObserverSocket for WebSocket {
    fn recv(&mut self) -> impl Future<Output = Option<Result<Message, axum::Error>>> + Send {
        WebSocket::recv(self)
    }

    fn send(&mut self, message: Message) -> impl Future<Output = Result<(), axum::Error>> + Send {
        WebSocket::send(self, message)
    }
}

pub(crate) async fn observe<S, D, P, ES>(mut socket: S, state: AppState<D, P, ES>)
where
    S: ObserverSocket,
    D: ValveDriver + 'static,
    P: EventPublisher + Send + Sync + 'static,
    ES: EventStore + Send + Sync + 'static,
{
    let observer = state.next_observer_id();
    // Subscribe first so no change between snapshot and stream is lost.
    let mut events = state.event_bus.subscribe();
    let mut closing = std::pin::pin!(state.closed());

    if send_all(&mut socket, &greeting(&state).await).await.is_err() {
        tracing::debug!(observer, "observer left before greeting completed");
        return;
    }
    tracing::info!(observer, "observer connected");
    announce(&state, Event::observer(true, observer)).await;

    loop {
        tokio::select! {
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    if let Some(reply) = handle_text(&state, text.as_str()).await
                        && send(&mut socket, &reply).await.is_err()
                    {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    tracing::debug!(observer, error = %err, "observer transport error");
                    break;
                }
            },
            received = events.recv() => match received {
                Ok(event) => {
                    if let Some(message) = ServerMessage::from_event(&event)
                        && send(&mut socket, &message).await.is_err()
                    {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(observer, skipped, "observer lagged, resending snapshot");
                    if send_all(&mut socket, &greeting(&state).await).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Closed) => break,
            },
            () = &mut closing => {
                let _ = socket.send(Message::Close(None)).await;
                break;
            }
        }
    }

    tracing::info!(observer, "observer disconnected");
    announce(&state, Event::observer(false, observer)).await;
}

/// Messages sent to a freshly connected or resynchronised observer: the
/// valve snapshot, then the auto-control state.
pub(crate) async fn greeting<D, P, ES>(state: &AppState<D, P, ES>) -> Vec<ServerMessage>
where
    D: ValveDriver + 'static,
    P: EventPublisher + Send + Sync + 'static,
    ES: EventStore + Send + Sync + 'static,
{
    let valves = state.dispatcher.valves().snapshot().await;
    let auto = state.dispatcher.auto().status().await;
    vec![
        ServerMessage::Init { valves },
        ServerMessage::Auto {
            active: auto.active,
            duration: auto.duration_minutes,
            cycles: auto.cycles,
            reason: None,
        },
    ]
}

/// Decode and dispatch one text frame; returns the reply for the sender,
/// if any. Successful commands need none: their effects reach every
/// observer, the sender included, through the event bus.
pub(crate) async fn handle_text<D, P, ES>(
    state: &AppState<D, P, ES>,
    text: &str,
) -> Option<ServerMessage>
where
    D: ValveDriver + 'static,
    P: EventPublisher + Send + Sync + 'static,
    ES: EventStore + Send + Sync + 'static,
{
    let result = match Command::parse(text) {
        Ok(command) => state.dispatcher.dispatch(command).await.map(|_| ()),
        Err(err) => Err(err),
    };
    match result {
        Ok(()) => None,
        Err(err) => {
            let (_, message) = describe(&err);
            tracing::debug!(%message, "command rejected");
            Some(ServerMessage::Error { message })
        }
    }
}

async fn send<S: ObserverSocket>(socket: &mut S, message: &ServerMessage) -> Result<(), axum::Error> {
    match message.to_json() {
        Ok(json) => socket.send(Message::Text(json.into())).await,
        Err(err) => {
            tracing::warn!(%err, "failed to encode observer message");
            Ok(())
        }
    }
}

async fn send_all<S: ObserverSocket>(
    socket: &mut S,
    messages: &[ServerMessage],
) -> Result<(), axum::Error> {
    for message in messages {
        send(socket, message).await?;
    }
    Ok(())
}

async fn announce<D, P, ES>(state: &AppState<D, P, ES>, event: Event)
where
    D: ValveDriver + 'static,
    P: EventPublisher + Send + Sync + 'static,
    ES: EventStore + Send + Sync + 'static,
{
    if let Err(err) = state.event_bus.publish(event).await {
        tracing::warn!(error = %err, "failed to publish observer event");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::{broadcast, mpsc};
    use tokio::task::JoinHandle;

    use valvehub_domain::event::EventType;

    use super::*;
    use crate::testing::{TestState, harness};

    /// In-memory observer socket: the test plays the client.
    struct ChannelSocket {
        incoming: mpsc::UnboundedReceiver<Message>,
        outgoing: mpsc::UnboundedSender<Message>,
    }

    impl ObserverSocket for ChannelSocket {
        async fn recv(&mut self) -> Option<Result<Message, axum::Error>> {
            self.incoming.recv().await.map(Ok)
        }

        async fn send(&mut self, message: Message) -> Result<(), axum::Error> {
            self.outgoing
                .send(message)
                .map_err(|_| axum::Error::new(std::io::Error::other("client gone")))
        }
    }

    struct Client {
        to_server: mpsc::UnboundedSender<Message>,
        from_server: mpsc::UnboundedReceiver<Message>,
        session: JoinHandle<()>,
    }

    impl Client {
        fn connect(state: &TestState) -> Self {
            let (to_server, incoming) = mpsc::unbounded_channel();
            let (outgoing, from_server) = mpsc::unbounded_channel();
            let socket = ChannelSocket { incoming, outgoing };
            let session = tokio::spawn(observe(socket, state.clone()));
            Self {
                to_server,
                from_server,
                session,
            }
        }

        async fn next_frame(&mut self) -> Message {
            tokio::time::timeout(Duration::from_secs(1), self.from_server.recv())
                .await
                .expect("no frame from server")
                .expect("server closed the socket")
        }

        async fn next_message(&mut self) -> ServerMessage {
            match self.next_frame().await {
                Message::Text(text) => serde_json::from_str(text.as_str()).unwrap(),
                other => panic!("unexpected frame {other:?}"),
            }
        }

        async fn skip_greeting(&mut self) {
            assert!(matches!(self.next_message().await, ServerMessage::Init { .. }));
            assert!(matches!(self.next_message().await, ServerMessage::Auto { .. }));
        }
    }

    async fn next_of_type(rx: &mut broadcast::Receiver<Event>, ty: EventType) -> Event {
        tokio::time::timeout(Duration::from_secs(1), async {
            loop {
                let event = rx.recv().await.unwrap();
                if event.event_type == ty {
                    return event;
                }
            }
        })
        .await
        .expect("event not published")
    }

    #[tokio::test]
    async fn should_greet_with_snapshot_then_auto_state() {
        let h = harness();
        let messages = greeting(&h.state).await;

        assert_eq!(messages.len(), 2);
        let ServerMessage::Init { valves } = &messages[0] else {
            panic!("expected init first");
        };
        assert_eq!(valves.len(), 12);
        assert!(valves[0]);
        assert_eq!(valves.iter().filter(|v| **v).count(), 1);
        assert_eq!(
            messages[1],
            ServerMessage::Auto {
                active: false,
                duration: None,
                cycles: None,
                reason: None,
            }
        );
    }

    #[tokio::test]
    async fn should_apply_toggle_without_direct_reply() {
        let h = harness();
        let mut rx = h.bus.subscribe();

        let reply = handle_text(&h.state, r#"{"type":"toggle","valve":4}"#).await;

        assert!(reply.is_none());
        let mut updates = Vec::new();
        while let Ok(event) = rx.try_recv() {
            updates.extend(ServerMessage::from_event(&event));
        }
        assert_eq!(
            updates,
            vec![
                ServerMessage::Update {
                    valve: 0,
                    status: false,
                },
                ServerMessage::Update {
                    valve: 4,
                    status: true,
                },
            ]
        );
    }

    #[tokio::test]
    async fn should_reply_with_error_for_bad_command() {
        let h = harness();

        let reply = handle_text(&h.state, r#"{"type":"toggle","valve":30}"#).await;
        let Some(ServerMessage::Error { message }) = reply else {
            panic!("expected an error reply");
        };
        assert!(message.contains("out of range"));

        let reply = handle_text(&h.state, "not json").await;
        assert!(matches!(reply, Some(ServerMessage::Error { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn should_reply_with_error_for_invalid_duration() {
        let h = harness();
        let reply = handle_text(&h.state, r#"{"type":"startAuto","duration":"0"}"#).await;
        assert!(matches!(reply, Some(ServerMessage::Error { .. })));
        assert!(!h.state.dispatcher.auto().is_active().await);
    }

    #[tokio::test]
    async fn should_announce_observer_after_greeting() {
        let h = harness();
        let mut bus = h.bus.subscribe();

        let mut client = Client::connect(&h.state);
        client.skip_greeting().await;

        let event = next_of_type(&mut bus, EventType::ObserverConnected).await;
        assert_eq!(event.data["observer"], 1);
    }

    #[tokio::test]
    async fn should_forward_valve_updates_to_observer() {
        let h = harness();
        let mut client = Client::connect(&h.state);
        client.skip_greeting().await;

        h.state
            .dispatcher
            .dispatch(Command::Toggle { valve: 3 })
            .await
            .unwrap();

        assert_eq!(
            client.next_message().await,
            ServerMessage::Update {
                valve: 0,
                status: false,
            }
        );
        assert_eq!(
            client.next_message().await,
            ServerMessage::Update {
                valve: 3,
                status: true,
            }
        );
    }

    #[tokio::test]
    async fn should_reply_to_sender_over_socket() {
        let h = harness();
        let mut client = Client::connect(&h.state);
        client.skip_greeting().await;

        client
            .to_server
            .send(Message::Text(r#"{"type":"toggle","valve":99}"#.into()))
            .unwrap();

        assert!(matches!(
            client.next_message().await,
            ServerMessage::Error { .. }
        ));
    }

    #[tokio::test]
    async fn should_resend_snapshot_and_auto_state_after_lag() {
        let h = harness();
        let mut client = Client::connect(&h.state);
        client.skip_greeting().await;

        // Publishing never yields, so the session cannot keep up.
        for observer in 0..200 {
            h.bus.publish(Event::observer(true, observer)).await.unwrap();
        }

        let ServerMessage::Init { valves } = client.next_message().await else {
            panic!("expected a fresh snapshot");
        };
        assert_eq!(valves.len(), 12);
        assert!(valves[0]);
        assert!(matches!(
            client.next_message().await,
            ServerMessage::Auto { active: false, .. }
        ));
    }

    #[tokio::test]
    async fn should_announce_departure_when_client_closes() {
        let h = harness();
        let mut bus = h.bus.subscribe();
        let mut client = Client::connect(&h.state);
        client.skip_greeting().await;

        drop(client.to_server);
        tokio::time::timeout(Duration::from_secs(1), client.session)
            .await
            .unwrap()
            .unwrap();

        let event = next_of_type(&mut bus, EventType::ObserverDisconnected).await;
        assert_eq!(event.data["observer"], 1);
    }

    #[tokio::test]
    async fn should_close_socket_when_shutdown_begins() {
        let h = harness();
        let mut client = Client::connect(&h.state);
        client.skip_greeting().await;

        h.state.begin_shutdown();

        assert!(matches!(client.next_frame().await, Message::Close(_)));
        tokio::time::timeout(Duration::from_secs(1), client.session)
            .await
            .unwrap()
            .unwrap();
    }
}
