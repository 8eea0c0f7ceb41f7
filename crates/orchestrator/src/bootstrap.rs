//! Initial state load from chain reads.
//!
//! Every write goes to the store as soon as its read returns, so whatever was
//! loaded before a failure stays visible.

use ethers::types::{Address, U256};
use tracing::{debug, info};
use vault_greeks_chain::VaultReader;
use vault_greeks_core::{Vault, VaultStore, WatchError};

/// Result of loading one vault.
#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapReport {
    pub vault: String,
    pub positions: usize,
    pub error: Option<String>,
}

impl BootstrapReport {
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

/// Loads price, reserves and the open position set of `vault` into `store`.
///
/// Stops at the first failed read. Returns the number of positions loaded.
///
/// # Errors
/// Returns [`WatchError::Fetch`] if a chain read fails.
pub async fn bootstrap_vault<R>(
    reader: &R,
    oracle: Address,
    base_token: Address,
    store: &VaultStore,
    vault: &Vault,
) -> Result<usize, WatchError>
where
    R: VaultReader + ?Sized,
{
    let price = reader.asset_price(oracle, base_token).await?;
    store.set_price(&vault.name, price)?;

    let reserves = reader.reserves(vault.address).await?;
    store.set_reserves(&vault.name, reserves)?;

    let supply = reader.total_supply(vault.position_manager).await?;
    debug!(vault = %vault.name, price, supply = %supply, "Enumerating positions");

    let mut loaded = 0;
    let mut index = U256::zero();
    while index < supply {
        let id = reader.token_by_index(vault.position_manager, index).await?;
        let position = reader.position(vault.position_manager, id).await?;
        store.upsert_position(&vault.name, id, position)?;
        loaded += 1;
        index += U256::one();
    }

    info!(vault = %vault.name, price, positions = loaded, "Vault bootstrapped");
    Ok(loaded)
}
