use crate::error::ConfigError;
use crate::position::Vault;
use crate::retry::CallPolicy;
use ethers::types::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Name of the chain entry in `chains` that the process watches.
    #[serde(default = "default_chain")]
    pub chain: String,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub chains: HashMap<String, ChainConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    pub risk_free_rate: f64,
    /// Rolling time-to-expiry applied to every position, in years.
    pub time_to_expiry_years: f64,
    pub volatility_url: String,
    pub volatility_currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    pub rpc_timeout_ms: u64,
    pub volatility_timeout_ms: u64,
    /// Extra attempts after the first one fails with a retryable error.
    pub retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    pub rpc_url: String,
    pub ws_url: String,
    /// Protocol oracle answering `getAssetPrice(token)`.
    pub oracle: Address,
    #[serde(default)]
    pub tokens: HashMap<String, Address>,
    #[serde(default)]
    pub vaults: Vec<VaultConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    pub name: String,
    pub address: Address,
    pub position_manager: Address,
    pub oracle_aggregator: Address,
    pub base_decimals: u8,
    pub quote_decimals: u8,
}

fn default_chain() -> String {
    "arbitrum".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.04,
            // 4h rolling window
            time_to_expiry_years: 1.0 / 365.0 / 6.0,
            volatility_url: "https://test.deribit.com/api/v2/public/get_historical_volatility"
                .to_string(),
            volatility_currency: "ETH".to_string(),
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            rpc_timeout_ms: 10_000,
            volatility_timeout_ms: 10_000,
            retries: 1,
        }
    }
}

impl TimeoutConfig {
    #[must_use]
    pub const fn rpc_policy(&self) -> CallPolicy {
        CallPolicy::from_millis(self.rpc_timeout_ms, self.retries)
    }

    #[must_use]
    pub const fn volatility_policy(&self) -> CallPolicy {
        CallPolicy::from_millis(self.volatility_timeout_ms, self.retries)
    }
}

impl AppConfig {
    /// Returns the configuration of the active chain.
    ///
    /// # Errors
    /// Returns [`ConfigError::UnknownChain`] if `chain` has no entry in `chains`.
    pub fn active_chain(&self) -> Result<&ChainConfig, ConfigError> {
        self.chains
            .get(&self.chain)
            .ok_or_else(|| ConfigError::UnknownChain(self.chain.clone()))
    }

    /// Checks the active chain and turns its vault entries into [`Vault`]s.
    ///
    /// # Errors
    /// Returns an error if the chain is missing, a vault name is not of the
    /// form `BASE-QUOTE`, a name is duplicated, or a base asset has no token address.
    pub fn vaults(&self) -> Result<Vec<Vault>, ConfigError> {
        let chain = self.active_chain()?;
        let mut vaults: Vec<Vault> = Vec::with_capacity(chain.vaults.len());

        for entry in &chain.vaults {
            let vault = Vault::try_from(entry)?;
            if !chain.tokens.contains_key(vault.base_symbol()) {
                return Err(ConfigError::MissingToken {
                    vault: vault.name.clone(),
                    symbol: vault.base_symbol().to_string(),
                });
            }
            if vaults.iter().any(|v| v.name == vault.name) {
                return Err(ConfigError::DuplicateVault(vault.name));
            }
            vaults.push(vault);
        }

        Ok(vaults)
    }
}

impl ChainConfig {
    /// Token address of the vault's base asset, used to query the oracle.
    #[must_use]
    pub fn base_token(&self, vault: &Vault) -> Option<Address> {
        self.tokens.get(vault.base_symbol()).copied()
    }

    /// JSON-RPC endpoint with `ALCHEMY_KEY` appended when the URL ends in `/`.
    #[must_use]
    pub fn rpc_endpoint(&self) -> String {
        with_api_key(&self.rpc_url, std::env::var(API_KEY_VAR).ok().as_deref())
    }

    /// Websocket endpoint, keyed the same way as [`Self::rpc_endpoint`].
    #[must_use]
    pub fn ws_endpoint(&self) -> String {
        with_api_key(&self.ws_url, std::env::var(API_KEY_VAR).ok().as_deref())
    }
}

/// Environment variable holding the node provider key.
pub const API_KEY_VAR: &str = "ALCHEMY_KEY";

fn with_api_key(url: &str, key: Option<&str>) -> String {
    match key {
        Some(key) if url.ends_with('/') && !key.is_empty() => format!("{url}{key}"),
        _ => url.to_string(),
    }
}
