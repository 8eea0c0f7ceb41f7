//! Full service: publish channel, bootstrap, then the chain event loop.

use super::Service;
use anyhow::{Context, Result};
use clap::Args;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use vault_greeks_chain::LogSubscription;
use vault_greeks_core::DEFAULT_CONFIG_PATH;
use vault_greeks_web_api::HubServer;

/// Logs buffered between the subscription and the event loop.
const LOG_BUFFER: usize = 1024;

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Config file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,
}

/// Runs the service until Ctrl+C or until the log stream ends.
///
/// # Errors
/// Returns an error if the configuration is invalid or the publish port cannot be bound.
pub async fn run_service(args: RunArgs) -> Result<()> {
    let service = Service::from_config_path(&args.config)?;
    let addr = format!("{}:{}", service.config.server.host, service.config.server.port);

    // bound before bootstrap so early subscribers get the default view
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind publish channel on {addr}"))?;
    tracing::info!("Publish channel listening on {}", addr);

    let server = HubServer::new(service.hub.clone());
    let server_handle = tokio::spawn(async move {
        if let Err(e) = server.serve_on(listener).await {
            tracing::error!("Server error: {}", e);
        }
    });

    // subscribe first so events emitted during bootstrap are queued, not lost
    let (tx, rx) = mpsc::channel(LOG_BUFFER);
    let subscription = LogSubscription::new(
        service.chain.ws_endpoint(),
        service.orchestrator.classifier().topics(),
    );
    let subscription_handle = tokio::spawn(subscription.run(tx));

    let reports = service.orchestrator.bootstrap().await;
    let incomplete = reports.iter().filter(|r| !r.is_complete()).count();
    tracing::info!(vaults = reports.len(), incomplete, "Bootstrap finished");

    tokio::select! {
        () = service.orchestrator.run(rx) => {
            tracing::warn!("Log subscription stopped");
        }
        () = shutdown_signal() => {
            tracing::info!("Received Ctrl+C, shutting down");
        }
    }

    subscription_handle.abort();
    server_handle.abort();

    tracing::info!("Vault greeks service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
