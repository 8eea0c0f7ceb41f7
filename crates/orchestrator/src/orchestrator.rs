//! Single worker turning chain logs into store updates, recomputes and broadcasts.

use crate::bootstrap::{bootstrap_vault, BootstrapReport};
use ethers::types::{Address, Log};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use vault_greeks_chain::{EventClassifier, VaultReader};
use vault_greeks_core::{ChainConfig, ChainEvent, PositionId, Vault, VaultStore, WatchError};
use vault_greeks_risk::{RiskEngine, VolatilityFeed};
use vault_greeks_web_api::BroadcastHub;

/// What handling one log did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Not relevant to any configured vault, or dropped by a reorg.
    Ignored,
    /// `vaults` views changed; `published` of them got a fresh delta out to subscribers.
    Updated { vaults: usize, published: usize },
}

pub struct Orchestrator<R, F> {
    store: Arc<VaultStore>,
    hub: Arc<BroadcastHub>,
    reader: R,
    engine: RiskEngine<F>,
    classifier: EventClassifier,
    chain: ChainConfig,
}

impl<R: VaultReader, F: VolatilityFeed> Orchestrator<R, F> {
    #[must_use]
    pub fn new(
        store: Arc<VaultStore>,
        hub: Arc<BroadcastHub>,
        reader: R,
        engine: RiskEngine<F>,
        chain: ChainConfig,
    ) -> Self {
        Self {
            store,
            hub,
            reader,
            engine,
            classifier: EventClassifier::new(),
            chain,
        }
    }

    #[must_use]
    pub const fn store(&self) -> &Arc<VaultStore> {
        &self.store
    }

    #[must_use]
    pub const fn classifier(&self) -> &EventClassifier {
        &self.classifier
    }

    /// Loads every vault from chain, then computes and publishes its delta.
    ///
    /// A vault whose load fails keeps whatever was read before the failure
    /// and is still priced and published.
    pub async fn bootstrap(&self) -> Vec<BootstrapReport> {
        let mut reports = Vec::with_capacity(self.store.vaults().len());

        for vault in self.store.vaults() {
            let error = match self.chain.base_token(vault) {
                Some(token) => {
                    bootstrap_vault(&self.reader, self.chain.oracle, token, &self.store, vault)
                        .await
                        .err()
                        .map(|e| e.to_string())
                }
                None => Some(format!("no token address for {}", vault.base_symbol())),
            };
            if let Some(e) = &error {
                error!(vault = %vault.name, error = %e, "Bootstrap incomplete");
            }

            self.refresh(vault).await;

            reports.push(BootstrapReport {
                vault: vault.name.clone(),
                positions: self.store.view(&vault.name).map_or(0, |v| v.positions.len()),
                error,
            });
        }

        reports
    }

    /// Handles logs in arrival order until the sender side closes.
    pub async fn run(&self, mut rx: mpsc::Receiver<Log>) {
        info!(vaults = self.store.vaults().len(), "Watching chain events");

        while let Some(log) = rx.recv().await {
            match self.handle_log(&log).await {
                Ok(outcome) => debug!(?outcome, address = ?log.address, "Log handled"),
                Err(e) => warn!(
                    error = %e,
                    address = ?log.address,
                    tx = ?log.transaction_hash,
                    "Failed to handle chain event"
                ),
            }
        }

        info!("Log stream closed");
    }

    /// Classifies and applies one log.
    ///
    /// # Errors
    /// Returns [`WatchError`] if the log cannot be decoded or a position read fails.
    /// The store is left as it was before the failing step.
    pub async fn handle_log(&self, log: &Log) -> Result<Outcome, WatchError> {
        if log.removed == Some(true) {
            debug!(tx = ?log.transaction_hash, "Skipping removed log");
            return Ok(Outcome::Ignored);
        }

        match self.classifier.classify(log)? {
            Some(event) => self.handle_event(event).await,
            None => Ok(Outcome::Ignored),
        }
    }

    /// Applies a decoded event.
    ///
    /// # Errors
    /// Returns [`WatchError`] if a position read or store write fails.
    pub async fn handle_event(&self, event: ChainEvent) -> Result<Outcome, WatchError> {
        match event {
            ChainEvent::PriceUpdated { oracle, price } => self.on_price(oracle, price).await,
            ChainEvent::PositionOpened { source, position_id } => {
                self.on_opened(source, position_id).await
            }
            ChainEvent::PositionClosed { source, position_id } => {
                self.on_closed(source, position_id).await
            }
        }
    }

    async fn on_price(&self, oracle: Address, price: f64) -> Result<Outcome, WatchError> {
        let vaults: Vec<Vault> = self.store.vaults_for_aggregator(oracle).cloned().collect();
        if vaults.is_empty() {
            debug!(oracle = ?oracle, price, "Price update for untracked aggregator");
            return Ok(Outcome::Ignored);
        }
        if price <= 0.0 || !price.is_finite() {
            warn!(oracle = ?oracle, price, "Ignoring non-positive price, keeping last good one");
            return Ok(Outcome::Ignored);
        }

        let mut published = 0;
        for vault in &vaults {
            self.store.set_price(&vault.name, price)?;
            debug!(vault = %vault.name, price, "Price updated");
            if self.refresh(vault).await {
                published += 1;
            }
        }

        Ok(Outcome::Updated {
            vaults: vaults.len(),
            published,
        })
    }

    async fn on_opened(&self, source: Address, id: PositionId) -> Result<Outcome, WatchError> {
        let Some(vault) = self.store.resolve_vault(source).cloned() else {
            debug!(source = ?source, position_id = %id, "Opened position for unknown vault");
            return Ok(Outcome::Ignored);
        };

        let position = self.reader.position(vault.position_manager, id).await?;
        self.store.upsert_position(&vault.name, id, position)?;
        info!(
            vault = %vault.name,
            position_id = %id,
            option = %position.label(),
            size = position.notional_f64(&vault),
            "Position opened"
        );

        let published = usize::from(self.refresh(&vault).await);
        Ok(Outcome::Updated { vaults: 1, published })
    }

    async fn on_closed(&self, source: Address, id: PositionId) -> Result<Outcome, WatchError> {
        let Some(vault) = self.store.resolve_vault(source).cloned() else {
            debug!(source = ?source, position_id = %id, "Closed position for unknown vault");
            return Ok(Outcome::Ignored);
        };
        if source != vault.position_manager {
            debug!(vault = %vault.name, source = ?source, "Close not emitted by position manager");
            return Ok(Outcome::Ignored);
        }

        if self.store.remove_position(&vault.name, id)? {
            info!(vault = %vault.name, position_id = %id, "Position closed");
        } else {
            debug!(vault = %vault.name, position_id = %id, "Closed position was not tracked");
        }

        let published = usize::from(self.refresh(&vault).await);
        Ok(Outcome::Updated { vaults: 1, published })
    }

    /// Recomputes the vault's delta and broadcasts on success. A failed
    /// recompute keeps the previous delta and publishes nothing.
    async fn refresh(&self, vault: &Vault) -> bool {
        if let Err(e) = self.engine.recompute(&self.store, vault).await {
            warn!(vault = %vault.name, error = %e, "Delta not recomputed");
            return false;
        }

        match self.hub.broadcast() {
            Ok(report) => {
                debug!(vault = %vault.name, delivered = report.delivered, "Delta published");
                true
            }
            Err(e) => {
                error!(vault = %vault.name, error = %e, "Broadcast failed");
                false
            }
        }
    }
}
