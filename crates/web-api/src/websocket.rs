use crate::hub::BroadcastHub;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use std::sync::Arc;

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(hub): State<Arc<BroadcastHub>>,
) -> Response {
    ws.on_upgrade(|socket| websocket_connection(socket, hub))
}

async fn websocket_connection(mut socket: WebSocket, hub: Arc<BroadcastHub>) {
    let (id, mut rx) = hub.connect();

    if let Err(e) = hub.open(id) {
        tracing::warn!(subscriber = id, error = %e, "Failed to open subscriber");
        hub.close(id);
        return;
    }

    loop {
        tokio::select! {
            frame = rx.recv() => {
                let Some(json) = frame else { break };
                if socket.send(Message::Text(json)).await.is_err() {
                    break;
                }
            }
            msg = socket.recv() => {
                // client text (keepalive pings) is ignored
                match msg {
                    Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                    _ => {}
                }
            }
        }
    }

    hub.close(id);
    tracing::info!(subscriber = id, "WebSocket connection closed");
}
