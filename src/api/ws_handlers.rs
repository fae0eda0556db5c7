//! WebSocket handler for real-time graph event notifications

use super::handlers::EngineState;
use crate::events::{GraphEvent, GraphEventKind};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::time::{interval, Duration};
use tracing::{debug, warn};

/// Commands a client may send over the event socket
#[derive(Debug, Deserialize)]
pub struct ClientMessage {
    pub command: Option<String>,
}

/// What to send back for one inbound text frame, if anything.
pub(crate) enum Reply {
    Stats,
    InvalidJson,
    Nothing,
}

pub(crate) fn classify(text: &str) -> Reply {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage {
            command: Some(command),
        }) if command == "get_stats" => Reply::Stats,
        Ok(_) => Reply::Nothing,
        Err(_) => Reply::InvalidJson,
    }
}

/// WebSocket upgrade handler for `/ws/events`
pub async fn ws_events(ws: WebSocketUpgrade, State(state): State<EngineState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

async fn handle_ws(socket: WebSocket, state: EngineState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    // First queued event is initial_state
    let mut subscription = state.engine.subscribe().await;
    let subscriber_id = subscription.id();

    // Ping interval (30s)
    let mut ping_interval = interval(Duration::from_secs(30));
    // Skip the first immediate tick
    ping_interval.tick().await;

    debug!(
        subscriber_id,
        total = state.engine.events().subscriber_count(),
        "WebSocket events client connected"
    );

    loop {
        tokio::select! {
            // Forward graph events to the WebSocket client
            event = subscription.recv() => {
                let Some(event) = event else {
                    debug!("Event bus dropped subscriber, shutting down WebSocket");
                    break;
                };
                if send_event(&mut ws_sender, &event).await.is_err() {
                    debug!("WebSocket send failed, client disconnected");
                    break;
                }
            }

            // Send periodic pings to detect dead clients
            _ = ping_interval.tick() => {
                if ws_sender.send(Message::Ping(vec![].into())).await.is_err() {
                    debug!("Ping failed, client disconnected");
                    break;
                }
            }

            // Handle incoming messages from the client
            msg = ws_receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let sent = match classify(text.as_str()) {
                            Reply::Stats => {
                                let stats = state.engine.stats().await;
                                let event = GraphEvent::new(GraphEventKind::StatsUpdate { stats });
                                send_event(&mut ws_sender, &event).await
                            }
                            Reply::InvalidJson => {
                                let body = serde_json::json!({ "error": "Invalid JSON" });
                                ws_sender.send(Message::Text(body.to_string().into())).await
                            }
                            Reply::Nothing => Ok(()),
                        };
                        if sent.is_err() {
                            debug!("WebSocket send failed, client disconnected");
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("WebSocket client disconnected");
                        break;
                    }
                    Some(Err(e)) => {
                        debug!("WebSocket error: {}", e);
                        break;
                    }
                    _ => {
                        // Pong / binary frames need no reply
                    }
                }
            }
        }
    }

    state.engine.events().unsubscribe(subscriber_id);
    debug!(subscriber_id, "WebSocket events client removed");
}

async fn send_event<S>(sender: &mut S, event: &GraphEvent) -> Result<(), axum::Error>
where
    S: futures::Sink<Message, Error = axum::Error> + Unpin,
{
    match serde_json::to_string(event) {
        Ok(json) => sender.send(Message::Text(json.into())).await,
        Err(e) => {
            warn!("Failed to serialize GraphEvent: {}", e);
            Ok(())
        }
    }
}
