//! Client for a running publish channel: logs every snapshot it receives.

use anyhow::{anyhow, Result};
use clap::Args;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::time::interval;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use vault_greeks_core::Snapshot;

#[derive(Args, Debug, Clone)]
pub struct WatchArgs {
    /// Publish channel URL
    #[arg(default_value = "ws://127.0.0.1:3000/delta")]
    pub url: String,

    /// Seconds between keepalive messages
    #[arg(long, default_value_t = 5)]
    pub ping_secs: u64,

    /// Seconds to wait before reconnecting
    #[arg(long, default_value_t = 5)]
    pub reconnect_secs: u64,
}

/// Watches the channel until Ctrl+C, reconnecting whenever it drops.
///
/// # Errors
/// Does not return errors; connection failures are logged and retried.
pub async fn run_watch(args: WatchArgs) -> Result<()> {
    tokio::select! {
        () = watch_forever(&args) => {}
        _ = tokio::signal::ctrl_c() => tracing::info!("Stopped watching"),
    }
    Ok(())
}

async fn watch_forever(args: &WatchArgs) {
    loop {
        if let Err(e) = watch_once(args).await {
            tracing::warn!("Publish channel error: {}", e);
        }
        tracing::info!("Reconnecting in {}s", args.reconnect_secs);
        tokio::time::sleep(Duration::from_secs(args.reconnect_secs)).await;
    }
}

async fn watch_once(args: &WatchArgs) -> Result<()> {
    let (mut ws, response) = connect_async(&args.url)
        .await
        .map_err(|e| anyhow!("Failed to connect to {}: {}", args.url, e))?;
    tracing::info!("Connected to {} (HTTP status: {})", args.url, response.status());

    let mut ping = interval(Duration::from_secs(args.ping_secs.max(1)));

    loop {
        tokio::select! {
            _ = ping.tick() => {
                tracing::debug!("Ping");
                ws.send(Message::Text("ping".to_string())).await?;
            }
            msg = ws.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => log_snapshot(&text),
                    Some(Ok(Message::Close(frame))) => {
                        tracing::warn!(?frame, "Channel closed by server");
                        return Ok(());
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                    None => return Ok(()),
                }
            }
        }
    }
}

fn log_snapshot(text: &str) {
    match serde_json::from_str::<Snapshot>(text) {
        Ok(snapshot) => {
            for entry in &snapshot.deltas {
                tracing::info!(
                    time = snapshot.time,
                    vault = %entry.vault,
                    delta = entry.delta,
                    price = entry.price,
                    "Snapshot"
                );
            }
        }
        Err(e) => tracing::warn!("Unexpected frame ({}): {}", e, text),
    }
}
