#![allow(dead_code)]

use async_trait::async_trait;
use ethers::abi::{self, Token};
use ethers::types::{Address, Bytes, Log, H256, I256, U256};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use vault_greeks_chain::{
    VaultReader, CLOSED_POSITION_TOPIC, NEW_TRANSMISSION_TOPIC, OPENED_POSITION_TOPIC,
};
use vault_greeks_core::{
    ChainConfig, FetchError, Position, PositionId, Reserves, Vault, VaultStore,
};
use vault_greeks_orchestrator::Orchestrator;
use vault_greeks_risk::{RiskEngine, RiskParams, VolatilityFeed};
use vault_greeks_web_api::BroadcastHub;

pub const ORACLE: u64 = 0x99;
pub const WETH: u64 = 0xa1;
pub const ARB: u64 = 0xa2;

pub fn addr(n: u64) -> Address {
    Address::from_low_u64_be(n)
}

pub fn weth_vault() -> Vault {
    Vault {
        name: "WETH-USDC".to_string(),
        address: addr(0x11),
        position_manager: addr(0x12),
        oracle_aggregator: addr(0x13),
        base_decimals: 18,
        quote_decimals: 6,
    }
}

pub fn arb_vault() -> Vault {
    Vault {
        name: "ARB-USDC".to_string(),
        address: addr(0x21),
        position_manager: addr(0x22),
        oracle_aggregator: addr(0x23),
        base_decimals: 18,
        quote_decimals: 6,
    }
}

pub fn chain_config() -> ChainConfig {
    ChainConfig {
        rpc_url: "http://localhost:8545".to_string(),
        ws_url: "ws://localhost:8546".to_string(),
        oracle: addr(ORACLE),
        tokens: HashMap::from([("WETH".to_string(), addr(WETH)), ("ARB".to_string(), addr(ARB))]),
        vaults: vec![],
    }
}

pub fn call(strike: u64, notional_eth: u64) -> Position {
    Position {
        is_call: true,
        strike: U256::from(strike) * U256::exp10(8),
        notional_amount: U256::from(notional_eth) * U256::exp10(18),
    }
}

pub fn put(strike: u64, notional_usdc: u64) -> Position {
    Position {
        is_call: false,
        strike: U256::from(strike) * U256::exp10(8),
        notional_amount: U256::from(notional_usdc) * U256::exp10(6),
    }
}

#[derive(Default)]
struct ChainState {
    prices: HashMap<Address, f64>,
    positions: HashMap<Address, Vec<(PositionId, Position)>>,
    broken_positions: HashSet<PositionId>,
}

/// In-memory chain: oracle prices by token, positions by position manager.
#[derive(Clone, Default)]
pub struct MockChain {
    state: Arc<Mutex<ChainState>>,
}

impl MockChain {
    pub fn set_price(&self, token: u64, price: f64) {
        self.state.lock().prices.insert(addr(token), price);
    }

    pub fn mint(&self, pm: Address, id: u64, position: Position) {
        self.state
            .lock()
            .positions
            .entry(pm)
            .or_default()
            .push((U256::from(id), position));
    }

    /// Makes `getPosition(id)` fail.
    pub fn break_position(&self, id: u64) {
        self.state.lock().broken_positions.insert(U256::from(id));
    }
}

fn unavailable(what: &str) -> FetchError {
    FetchError::Transport(format!("{what} unavailable"))
}

#[async_trait]
impl VaultReader for MockChain {
    async fn asset_price(&self, oracle: Address, token: Address) -> Result<f64, FetchError> {
        assert_eq!(oracle, addr(ORACLE));
        self.state
            .lock()
            .prices
            .get(&token)
            .copied()
            .ok_or_else(|| unavailable("price"))
    }

    async fn reserves(&self, _vault: Address) -> Result<Reserves, FetchError> {
        Ok(Reserves {
            base_amount: U256::exp10(18),
            quote_amount: U256::exp10(9),
        })
    }

    async fn total_supply(&self, position_manager: Address) -> Result<U256, FetchError> {
        let state = self.state.lock();
        Ok(U256::from(state.positions.get(&position_manager).map_or(0, Vec::len)))
    }

    async fn token_by_index(
        &self,
        position_manager: Address,
        index: U256,
    ) -> Result<PositionId, FetchError> {
        self.state
            .lock()
            .positions
            .get(&position_manager)
            .and_then(|p| p.get(index.as_usize()))
            .map(|(id, _)| *id)
            .ok_or_else(|| unavailable("token index"))
    }

    async fn position(
        &self,
        position_manager: Address,
        id: PositionId,
    ) -> Result<Position, FetchError> {
        let state = self.state.lock();
        if state.broken_positions.contains(&id) {
            return Err(unavailable("position"));
        }
        state
            .positions
            .get(&position_manager)
            .and_then(|p| p.iter().find(|(pid, _)| *pid == id))
            .map(|(_, position)| *position)
            .ok_or_else(|| unavailable("position"))
    }
}

/// Fixed volatility that can be switched off.
#[derive(Clone)]
pub struct SwitchableVol {
    volatility: f64,
    up: Arc<AtomicBool>,
}

impl SwitchableVol {
    pub fn new(volatility: f64) -> Self {
        Self {
            volatility,
            up: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn set_down(&self) {
        self.up.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl VolatilityFeed for SwitchableVol {
    async fn latest(&self) -> Result<f64, FetchError> {
        if self.up.load(Ordering::SeqCst) {
            Ok(self.volatility)
        } else {
            Err(unavailable("volatility"))
        }
    }
}

pub struct Harness {
    pub chain: MockChain,
    pub vol: SwitchableVol,
    pub store: Arc<VaultStore>,
    pub hub: Arc<BroadcastHub>,
    pub orchestrator: Orchestrator<MockChain, SwitchableVol>,
}

impl Harness {
    pub fn new(vaults: Vec<Vault>) -> Self {
        let chain = MockChain::default();
        let vol = SwitchableVol::new(0.6);
        let store = Arc::new(VaultStore::new(vaults));
        let hub = Arc::new(BroadcastHub::new(store.clone()));
        let orchestrator = Orchestrator::new(
            store.clone(),
            hub.clone(),
            chain.clone(),
            RiskEngine::new(vol.clone(), RiskParams::default()),
            chain_config(),
        );
        Self {
            chain,
            vol,
            store,
            hub,
            orchestrator,
        }
    }

    pub fn delta(&self, vault: &str) -> f64 {
        self.store.view(vault).unwrap().delta
    }
}

fn log(address: Address, topic: H256, tokens: &[Token]) -> Log {
    Log {
        address,
        topics: vec![topic],
        data: Bytes::from(abi::encode(tokens)),
        ..Default::default()
    }
}

pub fn opened_log(source: Address, id: u64) -> Log {
    log(
        source,
        OPENED_POSITION_TOPIC,
        &[Token::Uint(U256::one()), Token::Uint(U256::from(id))],
    )
}

pub fn closed_log(source: Address, id: u64) -> Log {
    log(
        source,
        CLOSED_POSITION_TOPIC,
        &[
            Token::Address(addr(0xc105e)),
            Token::Uint(U256::from(id)),
            Token::Uint(U256::zero()),
        ],
    )
}

/// `NewTransmission` with `price` expressed at 1e8.
pub fn transmission_log(aggregator: Address, price: f64) -> Log {
    #[allow(clippy::cast_possible_truncation)]
    let answer = I256::from((price * 1e8).round() as i64);
    log(
        aggregator,
        NEW_TRANSMISSION_TOPIC,
        &[
            Token::Int(answer.into_raw()),
            Token::Address(addr(0x7)),
            Token::Array(vec![Token::Int(answer.into_raw())]),
            Token::Bytes(vec![]),
            Token::FixedBytes(vec![0u8; 32]),
        ],
    )
}
