//! `eth_subscribe("logs")` over a websocket, forwarded into a channel.

use anyhow::{anyhow, Result};
use ethers::types::{Log, H256};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};

const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Streams logs matching any of `topics` from a node's websocket endpoint.
pub struct LogSubscription {
    ws_url: String,
    topics: Vec<H256>,
    reconnect_delay: Duration,
}

impl LogSubscription {
    #[must_use]
    pub fn new(ws_url: impl Into<String>, topics: Vec<H256>) -> Self {
        Self {
            ws_url: ws_url.into(),
            topics,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }

    #[must_use]
    pub const fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Forwards logs into `tx` until the receiver is dropped, reconnecting after failures.
    pub async fn run(self, tx: mpsc::Sender<Log>) {
        loop {
            match self.stream_once(&tx).await {
                Ok(()) if tx.is_closed() => {
                    tracing::info!("Log receiver dropped, stopping subscription");
                    return;
                }
                Ok(()) => tracing::warn!(url = %self.ws_url, "Log subscription ended, reconnecting"),
                Err(e) => tracing::error!(url = %self.ws_url, error = %e, "Log subscription failed"),
            }
            if tx.is_closed() {
                return;
            }
            tokio::time::sleep(self.reconnect_delay).await;
        }
    }

    async fn stream_once(&self, tx: &mpsc::Sender<Log>) -> Result<()> {
        let (mut ws, response) = connect_async(&self.ws_url)
            .await
            .map_err(|e| anyhow!("Failed to connect to {}: {}", self.ws_url, e))?;
        tracing::info!(
            url = %self.ws_url,
            status = %response.status(),
            topics = self.topics.len(),
            "Connected to log stream"
        );

        ws.send(Message::Text(subscription_request(&self.topics).to_string()))
            .await?;

        while let Some(msg) = ws.next().await {
            match msg? {
                Message::Text(text) => match parse_notification(&text) {
                    Ok(Some(log)) => {
                        if tx.send(log).await.is_err() {
                            return Ok(());
                        }
                    }
                    Ok(None) => {}
                    Err(NotificationError::Malformed(e)) => {
                        tracing::warn!(error = %e, frame = %text, "Skipping malformed log frame");
                    }
                    Err(e @ NotificationError::Rpc(_)) => return Err(e.into()),
                },
                Message::Ping(payload) => ws.send(Message::Pong(payload)).await?,
                Message::Close(frame) => {
                    tracing::warn!(?frame, "Log stream closed by node");
                    return Ok(());
                }
                _ => {}
            }
        }

        Ok(())
    }
}

/// `eth_subscribe` request for logs whose first topic is any of `topics`.
#[must_use]
pub fn subscription_request(topics: &[H256]) -> serde_json::Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "eth_subscribe",
        "params": ["logs", { "topics": [topics] }]
    })
}

#[derive(Debug, Deserialize)]
struct Envelope {
    method: Option<String>,
    params: Option<NotificationParams>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct NotificationParams {
    result: Log,
}

#[derive(Debug, Error)]
pub enum NotificationError {
    /// The frame is not JSON or its log does not decode. Only this frame is lost.
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The node answered with a JSON-RPC error; the subscription is unusable.
    #[error("subscription error: {0}")]
    Rpc(serde_json::Value),
}

/// Extracts the log from a subscription notification.
///
/// Returns `Ok(None)` for subscription acknowledgements and other non-log frames.
///
/// # Errors
/// Returns [`NotificationError::Malformed`] if the frame does not decode and
/// [`NotificationError::Rpc`] if it carries a JSON-RPC error.
pub fn parse_notification(text: &str) -> Result<Option<Log>, NotificationError> {
    let envelope: Envelope = serde_json::from_str(text)?;

    if let Some(error) = envelope.error {
        return Err(NotificationError::Rpc(error));
    }

    match (envelope.method.as_deref(), envelope.params) {
        (Some("eth_subscription"), Some(params)) => Ok(Some(params.result)),
        _ => Ok(None),
    }
}
