//! In-memory position store holding one [`VaultView`] per configured vault.
//!
//! Every operation takes the lock for its own duration only, so callers may
//! interleave them freely across await points.

use crate::error::StoreError;
use crate::position::{Position, PositionId, Reserves, Vault, VaultView};
use crate::snapshot::{Snapshot, VaultDelta};
use ethers::types::Address;
use parking_lot::RwLock;
use std::collections::HashMap;

pub struct VaultStore {
    vaults: Vec<Vault>,
    views: RwLock<HashMap<String, VaultView>>,
}

impl VaultStore {
    /// Creates a store with a default view (price 1, no positions, delta 0) for each vault.
    #[must_use]
    pub fn new(vaults: Vec<Vault>) -> Self {
        let views = vaults
            .iter()
            .map(|v| (v.name.clone(), VaultView::default()))
            .collect();
        Self {
            vaults,
            views: RwLock::new(views),
        }
    }

    /// Configured vaults, in configuration order.
    #[must_use]
    pub fn vaults(&self) -> &[Vault] {
        &self.vaults
    }

    #[must_use]
    pub fn vault(&self, name: &str) -> Option<&Vault> {
        self.vaults.iter().find(|v| v.name == name)
    }

    /// Finds the vault whose own, position-manager or oracle-aggregator address is `address`.
    #[must_use]
    pub fn resolve_vault(&self, address: Address) -> Option<&Vault> {
        self.vaults.iter().find(|v| v.owns(address))
    }

    /// Every vault priced by the oracle aggregator at `address`.
    pub fn vaults_for_aggregator(&self, address: Address) -> impl Iterator<Item = &Vault> {
        self.vaults
            .iter()
            .filter(move |v| v.oracle_aggregator == address)
    }

    /// Inserts or overwrites a position.
    ///
    /// # Errors
    /// Returns [`StoreError::UnknownVault`] if `vault` is not configured.
    pub fn upsert_position(
        &self,
        vault: &str,
        id: PositionId,
        position: Position,
    ) -> Result<(), StoreError> {
        self.with_view(vault, |view| {
            view.positions.insert(id, position);
        })
    }

    /// Removes a position. Returns whether it was present; absence is not an error.
    ///
    /// # Errors
    /// Returns [`StoreError::UnknownVault`] if `vault` is not configured.
    pub fn remove_position(&self, vault: &str, id: PositionId) -> Result<bool, StoreError> {
        self.with_view(vault, |view| view.positions.remove(&id).is_some())
    }

    /// # Errors
    /// Returns [`StoreError::UnknownVault`] if `vault` is not configured.
    pub fn set_price(&self, vault: &str, price: f64) -> Result<(), StoreError> {
        self.with_view(vault, |view| view.price = price)
    }

    /// # Errors
    /// Returns [`StoreError::UnknownVault`] if `vault` is not configured.
    pub fn set_reserves(&self, vault: &str, reserves: Reserves) -> Result<(), StoreError> {
        self.with_view(vault, |view| view.reserves = reserves)
    }

    /// # Errors
    /// Returns [`StoreError::UnknownVault`] if `vault` is not configured.
    pub fn set_delta(&self, vault: &str, delta: f64) -> Result<(), StoreError> {
        self.with_view(vault, |view| view.delta = delta)
    }

    /// Copy of the vault's current view.
    #[must_use]
    pub fn view(&self, vault: &str) -> Option<VaultView> {
        self.views.read().get(vault).cloned()
    }

    /// Current `{vault, delta, price}` of every configured vault.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        let views = self.views.read();
        let deltas = self
            .vaults
            .iter()
            .filter_map(|v| {
                views.get(&v.name).map(|view| VaultDelta {
                    vault: v.name.clone(),
                    delta: view.delta,
                    price: view.price,
                })
            })
            .collect();
        Snapshot::now(deltas)
    }

    fn with_view<T>(&self, vault: &str, f: impl FnOnce(&mut VaultView) -> T) -> Result<T, StoreError> {
        let mut views = self.views.write();
        let view = views
            .get_mut(vault)
            .ok_or_else(|| StoreError::UnknownVault(vault.to_string()))?;
        Ok(f(view))
    }
}
