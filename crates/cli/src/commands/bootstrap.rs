//! One-shot bootstrap: read every vault from chain, price it, print the snapshot.

use super::Service;
use anyhow::Result;
use clap::Args;
use vault_greeks_core::DEFAULT_CONFIG_PATH;

#[derive(Args, Debug, Clone)]
pub struct BootstrapArgs {
    /// Config file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    /// Pretty-print the snapshot JSON
    #[arg(long)]
    pub pretty: bool,
}

/// Runs the bootstrap command.
///
/// # Errors
/// Returns an error if the configuration is invalid or the snapshot cannot be encoded.
pub async fn run_bootstrap(args: BootstrapArgs) -> Result<()> {
    let service = Service::from_config_path(&args.config)?;

    for report in service.orchestrator.bootstrap().await {
        match &report.error {
            None => tracing::info!(vault = %report.vault, positions = report.positions, "Loaded"),
            Some(e) => tracing::warn!(
                vault = %report.vault,
                positions = report.positions,
                error = %e,
                "Loaded partially"
            ),
        }
    }

    let snapshot = service.hub.snapshot();
    let json = if args.pretty {
        serde_json::to_string_pretty(&snapshot)?
    } else {
        snapshot.to_json()?
    };
    println!("{json}");

    Ok(())
}
