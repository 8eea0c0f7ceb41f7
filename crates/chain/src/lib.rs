//! Chain-facing side of the vault greeks service.
//!
//! - [`classifier`]: topic table and ABI decoding of raw logs into domain events
//! - [`rpc`] and [`reader`]: read-only contract calls with bounded latency
//! - [`subscription`]: websocket log stream feeding the orchestrator

pub mod classifier;
pub mod reader;
pub mod rpc;
pub mod subscription;

pub use classifier::{
    EventClassifier, CLOSED_POSITION_TOPIC, NEW_TRANSMISSION_TOPIC, OPENED_POSITION_TOPIC,
};
pub use reader::{RpcVaultReader, VaultReader};
pub use rpc::RpcClient;
pub use subscription::{LogSubscription, NotificationError};
