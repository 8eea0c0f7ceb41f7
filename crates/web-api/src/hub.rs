//! Fan-out of risk snapshots to websocket subscribers.
//!
//! Each subscriber moves through `Connecting -> Open -> Closed`. Entering
//! `Open` pushes the current snapshot to that subscriber only; every later
//! [`BroadcastHub::broadcast`] reaches the subscribers that are `Open` at
//! that moment. Nothing is queued for subscribers in any other state.

use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};
use vault_greeks_core::{Snapshot, VaultStore};

/// Frames buffered per subscriber before sends to it start failing.
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 64;

pub type SubscriberId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

#[derive(Debug, Error)]
pub enum HubError {
    #[error("subscriber {0} is not registered")]
    UnknownSubscriber(SubscriberId),

    #[error("subscriber {id} cannot open from {state:?}")]
    InvalidTransition {
        id: SubscriberId,
        state: ConnectionState,
    },

    #[error("subscriber {0} is gone")]
    Disconnected(SubscriberId),

    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Outcome of one broadcast round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
}

struct Subscriber {
    state: ConnectionState,
    tx: mpsc::Sender<String>,
}

pub struct BroadcastHub {
    store: Arc<VaultStore>,
    subscribers: RwLock<HashMap<SubscriberId, Subscriber>>,
    next_id: AtomicU64,
    buffer: usize,
}

impl BroadcastHub {
    #[must_use]
    pub fn new(store: Arc<VaultStore>) -> Self {
        Self::with_buffer(store, DEFAULT_SUBSCRIBER_BUFFER)
    }

    #[must_use]
    pub fn with_buffer(store: Arc<VaultStore>, buffer: usize) -> Self {
        Self {
            store,
            subscribers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            buffer: buffer.max(1),
        }
    }

    /// Current snapshot of every vault.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.store.snapshot()
    }

    /// Registers a new subscriber in `Connecting` state.
    pub fn connect(&self) -> (SubscriberId, mpsc::Receiver<String>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.buffer);
        self.subscribers.write().insert(
            id,
            Subscriber {
                state: ConnectionState::Connecting,
                tx,
            },
        );
        debug!(subscriber = id, "Subscriber connecting");
        (id, rx)
    }

    /// Moves a subscriber to `Open` and pushes it the current snapshot.
    ///
    /// # Errors
    /// Returns an error if the subscriber is unknown, not `Connecting`, or its
    /// channel is already closed.
    pub fn open(&self, id: SubscriberId) -> Result<(), HubError> {
        let mut subscribers = self.subscribers.write();
        let subscriber = subscribers
            .get_mut(&id)
            .ok_or(HubError::UnknownSubscriber(id))?;
        if subscriber.state != ConnectionState::Connecting {
            return Err(HubError::InvalidTransition {
                id,
                state: subscriber.state,
            });
        }

        // Read under the subscriber lock: a broadcast that skipped this
        // subscriber took its snapshot before we read ours.
        let json = self.snapshot().to_json()?;

        subscriber
            .tx
            .try_send(json)
            .map_err(|_| HubError::Disconnected(id))?;
        subscriber.state = ConnectionState::Open;
        info!(subscriber = id, "Subscriber open");
        Ok(())
    }

    /// Marks a subscriber `Closed` and forgets it. Unknown ids are ignored.
    pub fn close(&self, id: SubscriberId) {
        if let Some(mut subscriber) = self.subscribers.write().remove(&id) {
            subscriber.state = ConnectionState::Closed;
            debug!(subscriber = id, "Subscriber closed");
        }
    }

    /// State of a subscriber; closed subscribers are no longer tracked.
    #[must_use]
    pub fn state(&self, id: SubscriberId) -> ConnectionState {
        self.subscribers
            .read()
            .get(&id)
            .map_or(ConnectionState::Closed, |s| s.state)
    }

    /// Number of subscribers currently `Open`.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.subscribers
            .read()
            .values()
            .filter(|s| s.state == ConnectionState::Open)
            .count()
    }

    /// Pushes the current snapshot to every `Open` subscriber.
    ///
    /// Sends go to a copy of the subscriber set taken up front, so connects and
    /// closes during the round do not affect it. A failing subscriber is logged
    /// and skipped; one whose receiver is gone is closed.
    ///
    /// # Errors
    /// Returns [`HubError::Encode`] if the snapshot cannot be serialized.
    pub fn broadcast(&self) -> Result<BroadcastReport, HubError> {
        let json = self.snapshot().to_json()?;

        let targets: Vec<(SubscriberId, mpsc::Sender<String>)> = self
            .subscribers
            .read()
            .iter()
            .filter(|(_, s)| s.state == ConnectionState::Open)
            .map(|(id, s)| (*id, s.tx.clone()))
            .collect();

        let mut report = BroadcastReport::default();
        let mut gone = Vec::new();

        for (id, tx) in targets {
            match tx.try_send(json.clone()) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    report.failed += 1;
                    warn!(subscriber = id, "Subscriber lagging, snapshot dropped");
                }
                Err(TrySendError::Closed(_)) => {
                    report.failed += 1;
                    warn!(subscriber = id, "Subscriber channel closed");
                    gone.push(id);
                }
            }
        }

        for id in gone {
            self.close(id);
        }

        debug!(delivered = report.delivered, failed = report.failed, "Snapshot broadcast");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::Address;
    use vault_greeks_core::Vault;

    fn store() -> Arc<VaultStore> {
        Arc::new(VaultStore::new(vec![
            Vault {
                name: "WETH-USDC".to_string(),
                address: Address::from_low_u64_be(1),
                position_manager: Address::from_low_u64_be(2),
                oracle_aggregator: Address::from_low_u64_be(3),
                base_decimals: 18,
                quote_decimals: 6,
            },
            Vault {
                name: "ARB-USDC".to_string(),
                address: Address::from_low_u64_be(4),
                position_manager: Address::from_low_u64_be(5),
                oracle_aggregator: Address::from_low_u64_be(6),
                base_decimals: 18,
                quote_decimals: 6,
            },
        ]))
    }

    fn parse(frame: &str) -> Snapshot {
        serde_json::from_str(frame).unwrap()
    }

    #[test]
    fn subscriber_opened_during_recomputes_ends_on_latest_state() {
        const UPDATES: u32 = 500;
        let store = store();
        let hub = Arc::new(BroadcastHub::with_buffer(store.clone(), 4 * UPDATES as usize));

        for _ in 0..20 {
            let (id, mut rx) = hub.connect();
            let writer = {
                let (store, hub) = (store.clone(), hub.clone());
                std::thread::spawn(move || {
                    for i in 1..=UPDATES {
                        store.set_delta("WETH-USDC", f64::from(i)).unwrap();
                        hub.broadcast().unwrap();
                    }
                })
            };
            std::thread::yield_now();
            hub.open(id).unwrap();
            writer.join().unwrap();

            let mut last = None;
            while let Ok(frame) = rx.try_recv() {
                last = Some(parse(&frame));
            }
            let last = last.expect("open pushes a frame");
            assert_eq!(last.get("WETH-USDC").unwrap().delta, f64::from(UPDATES));
            hub.close(id);
        }
    }

    #[test]
    fn late_joiner_gets_exactly_one_snapshot_on_open() {
        let store = store();
        store.set_price("WETH-USDC", 1950.0).unwrap();
        store.set_delta("WETH-USDC", 0.42).unwrap();
        let hub = BroadcastHub::new(store);

        let (id, mut rx) = hub.connect();
        assert!(rx.try_recv().is_err(), "nothing before open");

        hub.open(id).unwrap();

        let snapshot = parse(&rx.try_recv().unwrap());
        assert_eq!(snapshot.deltas.len(), 2);
        assert_eq!(snapshot.get("WETH-USDC").unwrap().price, 1950.0);
        assert_eq!(snapshot.get("WETH-USDC").unwrap().delta, 0.42);
        assert!(rx.try_recv().is_err(), "exactly one push");
        assert_eq!(hub.state(id), ConnectionState::Open);
    }

    #[test]
    fn broadcast_skips_connecting_subscribers() {
        let hub = BroadcastHub::new(store());
        let (open_id, mut open_rx) = hub.connect();
        hub.open(open_id).unwrap();
        let _ = open_rx.try_recv();
        let (_pending, mut pending_rx) = hub.connect();

        let report = hub.broadcast().unwrap();

        assert_eq!(report, BroadcastReport { delivered: 1, failed: 0 });
        assert!(open_rx.try_recv().is_ok());
        assert!(pending_rx.try_recv().is_err());
    }

    #[test]
    fn failed_subscriber_does_not_block_others() {
        let hub = BroadcastHub::new(store());
        let (dead, dead_rx) = hub.connect();
        hub.open(dead).unwrap();
        let (alive, mut alive_rx) = hub.connect();
        hub.open(alive).unwrap();
        let _ = alive_rx.try_recv();
        drop(dead_rx);

        let report = hub.broadcast().unwrap();

        assert_eq!(report.delivered, 1);
        assert_eq!(report.failed, 1);
        assert!(alive_rx.try_recv().is_ok());
        assert_eq!(hub.state(dead), ConnectionState::Closed);
        assert_eq!(hub.open_count(), 1);
    }

    #[test]
    fn lagging_subscriber_drops_frames_instead_of_queueing() {
        let hub = BroadcastHub::with_buffer(store(), 1);
        let (id, mut rx) = hub.connect();
        hub.open(id).unwrap();

        // buffer already holds the initial snapshot
        let report = hub.broadcast().unwrap();

        assert_eq!(report, BroadcastReport { delivered: 0, failed: 1 });
        assert_eq!(hub.state(id), ConnectionState::Open);
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn open_is_only_valid_from_connecting() {
        let hub = BroadcastHub::new(store());
        let (id, _rx) = hub.connect();
        hub.open(id).unwrap();

        assert!(matches!(hub.open(id), Err(HubError::InvalidTransition { .. })));
        hub.close(id);
        assert!(matches!(hub.open(id), Err(HubError::UnknownSubscriber(_))));
    }

    #[test]
    fn broadcast_reflects_latest_store_state() {
        let store = store();
        let hub = BroadcastHub::new(store.clone());
        let (id, mut rx) = hub.connect();
        hub.open(id).unwrap();
        let _ = rx.try_recv();

        store.set_delta("ARB-USDC", -3.5).unwrap();
        hub.broadcast().unwrap();

        let snapshot = parse(&rx.try_recv().unwrap());
        assert_eq!(snapshot.get("ARB-USDC").unwrap().delta, -3.5);
    }
}
