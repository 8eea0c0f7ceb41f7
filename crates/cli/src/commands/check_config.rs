use anyhow::{Context, Result};
use clap::Args;
use vault_greeks_core::{ConfigLoader, DEFAULT_CONFIG_PATH};

#[derive(Args, Debug, Clone)]
pub struct CheckConfigArgs {
    /// Config file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,
}

/// Loads the configuration and prints what the service would watch.
///
/// # Errors
/// Returns an error if the configuration cannot be loaded or is inconsistent.
pub fn run_check_config(args: &CheckConfigArgs) -> Result<()> {
    let config = ConfigLoader::load_from(&args.config)
        .with_context(|| format!("Invalid configuration in {}", args.config))?;
    let chain = config.active_chain()?;
    let vaults = config.vaults()?;

    println!("chain:      {}", config.chain);
    println!("rpc:        {}", chain.rpc_url);
    println!("ws:         {}", chain.ws_url);
    println!("oracle:     {:?}", chain.oracle);
    println!("publish on: {}:{}", config.server.host, config.server.port);
    println!(
        "risk:       r={} tte={:.6}y vol={} ({})",
        config.risk.risk_free_rate,
        config.risk.time_to_expiry_years,
        config.risk.volatility_url,
        config.risk.volatility_currency
    );
    println!("vaults:");
    for vault in &vaults {
        println!(
            "  {:<12} vault={:?} pm={:?} aggregator={:?} decimals={}/{}",
            vault.name,
            vault.address,
            vault.position_manager,
            vault.oracle_aggregator,
            vault.base_decimals,
            vault.quote_decimals
        );
    }

    Ok(())
}
