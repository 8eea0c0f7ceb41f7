//! Aggregate vault delta.
//!
//! Each open position is priced with the same rolling time-to-expiry. Call
//! notionals are in base units; put notionals are in quote units and are
//! divided by the spot price so every contribution is in base asset terms.

use crate::pricing::{self, OptionKind};
use crate::volatility::VolatilityFeed;
use tracing::{debug, info};
use vault_greeks_core::{FetchError, Position, RiskConfig, StoreError, Vault, VaultStore, VaultView};

/// Fixed inputs of the pricing model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskParams {
    pub risk_free_rate: f64,
    pub time_to_expiry_years: f64,
}

impl From<&RiskConfig> for RiskParams {
    fn from(config: &RiskConfig) -> Self {
        Self {
            risk_free_rate: config.risk_free_rate,
            time_to_expiry_years: config.time_to_expiry_years,
        }
    }
}

impl Default for RiskParams {
    fn default() -> Self {
        Self::from(&RiskConfig::default())
    }
}

/// Delta contributed by one position, in base asset units.
///
/// A put has no base-denominated delta without a positive price and contributes zero.
#[must_use]
pub fn position_delta(
    position: &Position,
    vault: &Vault,
    price: f64,
    volatility: f64,
    params: RiskParams,
) -> f64 {
    let kind = OptionKind::from_is_call(position.is_call);
    let unit_delta = pricing::delta(
        price,
        position.strike_f64(),
        params.time_to_expiry_years,
        volatility,
        params.risk_free_rate,
        kind,
    );
    let notional = position.notional_f64(vault);

    match kind {
        OptionKind::Call => unit_delta * notional,
        OptionKind::Put if price > 0.0 => unit_delta * notional / price,
        OptionKind::Put => 0.0,
    }
}

/// Sum of [`position_delta`] over `positions`. An empty set has zero delta.
pub fn aggregate_delta<'a>(
    positions: impl IntoIterator<Item = &'a Position>,
    vault: &Vault,
    price: f64,
    volatility: f64,
    params: RiskParams,
) -> f64 {
    positions
        .into_iter()
        .map(|p| position_delta(p, vault, price, volatility, params))
        .fold(0.0, |acc, d| acc + d)
}

/// Why a recompute cycle produced no new delta.
#[derive(Debug, thiserror::Error)]
pub enum RiskError {
    #[error("volatility unavailable: {0}")]
    Volatility(#[from] FetchError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct RiskEngine<F> {
    feed: F,
    params: RiskParams,
}

impl<F: VolatilityFeed> RiskEngine<F> {
    pub const fn new(feed: F, params: RiskParams) -> Self {
        Self { feed, params }
    }

    #[must_use]
    pub const fn params(&self) -> RiskParams {
        self.params
    }

    /// Fetches a fresh volatility and computes the aggregate delta of `view`.
    ///
    /// # Errors
    /// Returns [`RiskError::Volatility`] if the feed cannot be read.
    pub async fn compute_delta(&self, view: &VaultView, vault: &Vault) -> Result<f64, RiskError> {
        let volatility = self.feed.latest().await?;
        Ok(self.view_delta(view, vault, volatility))
    }

    /// Aggregate delta of `view` at its own price and the given volatility.
    #[must_use]
    pub fn view_delta(&self, view: &VaultView, vault: &Vault, volatility: f64) -> f64 {
        aggregate_delta(view.positions.values(), vault, view.price, volatility, self.params)
    }

    /// Recomputes the vault's delta from the store's current state and writes it back.
    ///
    /// Volatility is fetched before the view is read, so the positions and price
    /// used are the latest ones the store has once the network call returns. On
    /// failure the stored delta is left at its previous value.
    ///
    /// # Errors
    /// Returns [`RiskError`] if the feed cannot be read or the vault is unknown.
    pub async fn recompute(&self, store: &VaultStore, vault: &Vault) -> Result<f64, RiskError> {
        let volatility = self.feed.latest().await?;
        let view = store
            .view(&vault.name)
            .ok_or_else(|| StoreError::UnknownVault(vault.name.clone()))?;

        let delta = self.view_delta(&view, vault, volatility);
        store.set_delta(&vault.name, delta)?;

        debug!(vault = %vault.name, volatility, positions = view.positions.len(), "Greeks computed");
        info!(vault = %vault.name, price = view.price, delta, "Vault delta");

        Ok(delta)
    }
}
