//! CLI commands for the vault greeks service.

pub mod bootstrap;
pub mod check_config;
pub mod run;
pub mod watch;

pub use bootstrap::{run_bootstrap, BootstrapArgs};
pub use check_config::{run_check_config, CheckConfigArgs};
pub use run::{run_service, RunArgs};
pub use watch::{run_watch, WatchArgs};

use anyhow::{Context, Result};
use std::sync::Arc;
use vault_greeks_chain::{RpcClient, RpcVaultReader};
use vault_greeks_core::{AppConfig, ChainConfig, ConfigLoader, VaultStore};
use vault_greeks_orchestrator::Orchestrator;
use vault_greeks_risk::{DeribitVolatilityFeed, RiskEngine, RiskParams};
use vault_greeks_web_api::BroadcastHub;

pub type LiveOrchestrator = Orchestrator<RpcVaultReader, DeribitVolatilityFeed>;

/// Everything a command needs once the configuration is loaded.
pub struct Service {
    pub config: AppConfig,
    pub chain: ChainConfig,
    pub hub: Arc<BroadcastHub>,
    pub orchestrator: LiveOrchestrator,
}

impl Service {
    /// Loads `config_path` and wires store, hub, chain reader and risk engine.
    ///
    /// # Errors
    /// Returns an error if the configuration cannot be loaded or is inconsistent.
    pub fn from_config_path(config_path: &str) -> Result<Self> {
        let config = ConfigLoader::load_from(config_path)
            .with_context(|| format!("Failed to load configuration from {config_path}"))?;
        let chain = config.active_chain()?.clone();
        let vaults = config.vaults()?;

        let store = Arc::new(VaultStore::new(vaults));
        let hub = Arc::new(BroadcastHub::new(store.clone()));

        let reader = RpcVaultReader::new(RpcClient::new(
            chain.rpc_endpoint(),
            config.timeouts.rpc_policy(),
        ));
        let feed =
            DeribitVolatilityFeed::from_config(&config.risk, config.timeouts.volatility_policy());
        let engine = RiskEngine::new(feed, RiskParams::from(&config.risk));

        let orchestrator = Orchestrator::new(store, hub.clone(), reader, engine, chain.clone());

        Ok(Self {
            config,
            chain,
            hub,
            orchestrator,
        })
    }
}
