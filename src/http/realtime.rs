//! Realtime channel over WebSocket.
//!
//! On connect the server sends a `state` snapshot, then every site-state
//! change as it happens. Anything the client sends is ignored. A failed
//! send is logged and the subscription stays open; the loop ends only
//! when the client goes away.

use super::AppState;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tracing::debug;

/// `GET /ws`
pub async fn subscribe(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| serve_socket(socket, state))
}

async fn serve_socket(socket: WebSocket, state: AppState) {
    let mut subscription = state.site.subscribe();
    let id = subscription.id();
    let (mut outbound, mut inbound) = socket.split();

    loop {
        tokio::select! {
            event = subscription.recv() => {
                let Some(event) = event else { break };
                if let Err(e) = outbound.send(Message::Text(event.to_json())).await {
                    debug!(subscriber = id, error = %e, "realtime push failed");
                }
            }
            message = inbound.next() => match message {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(subscriber = id, error = %e, "realtime socket error");
                    break;
                }
            }
        }
    }

    debug!(subscriber = id, "realtime socket closed");
}
