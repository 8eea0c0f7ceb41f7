use clap::{Parser, Subcommand};

mod commands;

use commands::{BootstrapArgs, CheckConfigArgs, RunArgs, WatchArgs};

#[derive(Parser)]
#[command(name = "vault-greeks")]
#[command(about = "Live delta of option vaults, published over websocket", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bootstrap all vaults, then follow chain events and publish deltas
    Run(RunArgs),
    /// Load every vault once, print the resulting snapshot and exit
    Bootstrap(BootstrapArgs),
    /// Connect to a running publish channel and log each snapshot
    Watch(WatchArgs),
    /// Load and validate the configuration
    CheckConfig(CheckConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Commands::Run(args) => commands::run_service(args).await?,
        Commands::Bootstrap(args) => commands::run_bootstrap(args).await?,
        Commands::Watch(args) => commands::run_watch(args).await?,
        Commands::CheckConfig(args) => commands::run_check_config(&args)?,
    }

    Ok(())
}
