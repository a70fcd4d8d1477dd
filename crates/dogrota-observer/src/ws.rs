//! `WebSocket` handler for live schedule updates.
//!
//! Clients connect to `GET /ws` and first receive an `init` message with
//! the current snapshot, then one `update` message per accepted change.
//! Each connection owns its own registry entry, which is removed when the
//! socket closes, errors, or a send fails.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use dogrota_types::{Snapshot, StreamMessage};
use tracing::{debug, warn};

use crate::state::AppState;

/// Upgrade an HTTP request to a `WebSocket` connection and begin
/// streaming snapshots.
///
/// # Route
///
/// `GET /ws`
pub async fn ws_updates(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    let (mut subscription, initial) = match state.service.subscribe().await {
        Ok(pair) => pair,
        Err(e) => {
            warn!(error = %e, "Could not build initial snapshot, closing WebSocket");
            return;
        }
    };
    let id = subscription.id;
    debug!(observer = %id, "WebSocket client connected");

    if send(&mut socket, &StreamMessage::init(initial)).await {
        stream(&mut socket, &mut subscription.rx).await;
    }

    state.service.notifier().unsubscribe(id);
    debug!(observer = %id, "WebSocket client disconnected");
}

/// Forward broadcasts until the client goes away.
async fn stream(
    socket: &mut WebSocket,
    rx: &mut tokio::sync::mpsc::UnboundedReceiver<Arc<Snapshot>>,
) {
    loop {
        tokio::select! {
            update = rx.recv() => {
                let Some(snapshot) = update else {
                    return;
                };
                let message = StreamMessage::update(Snapshot::clone(&snapshot));
                if !send(socket, &message).await {
                    return;
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => return,
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        debug!("WebSocket error: {e}");
                        return;
                    }
                    _ => {
                        // Client text and binary frames carry no commands.
                    }
                }
            }
        }
    }
}

/// Serialize and send one message. Returns `false` if the socket is gone.
async fn send(socket: &mut WebSocket, message: &StreamMessage) -> bool {
    let json = match serde_json::to_string(message) {
        Ok(j) => j,
        Err(e) => {
            warn!("Failed to serialize stream message: {e}");
            return true;
        }
    };
    socket.send(Message::Text(json.into())).await.is_ok()
}
