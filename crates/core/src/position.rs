use crate::config::VaultConfig;
use crate::error::ConfigError;
use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Fixed-point scale of on-chain strikes and oracle prices.
pub const PRICE_DECIMALS: u32 = 8;

/// Identifier of a position NFT, unique per position manager.
pub type PositionId = U256;

/// An option vault and the contracts it is observed through. Immutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vault {
    pub name: String,
    pub address: Address,
    pub position_manager: Address,
    pub oracle_aggregator: Address,
    pub base_decimals: u8,
    pub quote_decimals: u8,
}

impl Vault {
    /// Base asset symbol, the part of the name before the dash.
    #[must_use]
    pub fn base_symbol(&self) -> &str {
        self.name.split('-').next().unwrap_or(&self.name)
    }

    /// Quote asset symbol, the part of the name after the dash.
    #[must_use]
    pub fn quote_symbol(&self) -> &str {
        self.name.split('-').nth(1).unwrap_or_default()
    }

    /// Returns true if `address` is the vault, its position manager or its oracle aggregator.
    #[must_use]
    pub fn owns(&self, address: Address) -> bool {
        self.address == address
            || self.position_manager == address
            || self.oracle_aggregator == address
    }
}

impl TryFrom<&VaultConfig> for Vault {
    type Error = ConfigError;

    fn try_from(entry: &VaultConfig) -> Result<Self, Self::Error> {
        let mut parts = entry.name.split('-');
        let well_formed = matches!(
            (parts.next(), parts.next(), parts.next()),
            (Some(base), Some(quote), None) if !base.is_empty() && !quote.is_empty()
        );
        if !well_formed {
            return Err(ConfigError::InvalidVaultName(entry.name.clone()));
        }

        Ok(Self {
            name: entry.name.clone(),
            address: entry.address,
            position_manager: entry.position_manager,
            oracle_aggregator: entry.oracle_aggregator,
            base_decimals: entry.base_decimals,
            quote_decimals: entry.quote_decimals,
        })
    }
}

/// An open option written by a vault. Never mutated once opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub is_call: bool,
    /// Strike, 1e8 fixed point.
    pub strike: U256,
    /// Notional, in base asset units for calls and quote asset units for puts.
    pub notional_amount: U256,
}

impl Position {
    #[must_use]
    pub fn strike_f64(&self) -> f64 {
        scale_down(self.strike, PRICE_DECIMALS)
    }

    /// Notional converted to a float using the decimals of the asset it is denominated in.
    #[must_use]
    pub fn notional_f64(&self, vault: &Vault) -> f64 {
        let decimals = if self.is_call {
            vault.base_decimals
        } else {
            vault.quote_decimals
        };
        scale_down(self.notional_amount, u32::from(decimals))
    }

    /// Short form used in logs, e.g. `C-2000` or `P-1850.5`.
    #[must_use]
    pub fn label(&self) -> String {
        format!(
            "{}-{}",
            if self.is_call { "C" } else { "P" },
            self.strike_f64()
        )
    }
}

/// Vault reserve snapshot. Informational only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reserves {
    pub base_amount: U256,
    pub quote_amount: U256,
}

/// Live state of a single vault.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaultView {
    pub price: f64,
    pub reserves: Reserves,
    pub positions: HashMap<PositionId, Position>,
    pub delta: f64,
}

impl Default for VaultView {
    fn default() -> Self {
        Self {
            price: 1.0,
            reserves: Reserves::default(),
            positions: HashMap::new(),
            delta: 0.0,
        }
    }
}

/// Converts a fixed-point integer to a float by dividing by `10^decimals`.
#[must_use]
pub fn scale_down(value: U256, decimals: u32) -> f64 {
    const LIMB: f64 = 18_446_744_073_709_551_616.0; // 2^64
    let raw = value
        .0
        .iter()
        .rev()
        .fold(0.0_f64, |acc, limb| acc * LIMB + *limb as f64);
    raw / 10_f64.powi(decimals as i32)
}
