//! WebSocket push channel
//!
//! Each socket is one broadcaster subscription. Inbound frames other than
//! close are ignored.

use std::sync::Arc;

use crate::api::AppState;
use crate::bridge::{Broadcaster, Subscription};

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use tracing::{debug, error};

/// `GET /ws`
pub(crate) async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    debug!("Request: GET /ws (upgrade)");
    ws.on_upgrade(move |socket| handle_socket(socket, state.broadcaster))
}

async fn handle_socket(mut socket: WebSocket, broadcaster: Arc<Broadcaster>) {
    let Subscription { id, mut receiver } = broadcaster.subscribe().await;

    loop {
        tokio::select! {
            outgoing = receiver.recv() => {
                let Some(message) = outgoing else {
                    break;
                };
                let text = match message.to_json() {
                    Ok(text) => text,
                    Err(e) => {
                        error!("Failed to serialize push message: {}", e);
                        continue;
                    }
                };
                if let Err(e) = socket.send(Message::Text(text)).await {
                    debug!("Subscriber {} send failed: {}", id, e);
                    break;
                }
            }
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!("Subscriber {} socket error: {}", id, e);
                    break;
                }
            }
        }
    }

    broadcaster.unsubscribe(id).await;
}
