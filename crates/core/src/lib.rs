pub mod config;
pub mod config_loader;
pub mod error;
pub mod events;
pub mod position;
pub mod retry;
pub mod snapshot;
pub mod store;

pub use config::{
    AppConfig, ChainConfig, RiskConfig, ServerConfig, TimeoutConfig, VaultConfig, API_KEY_VAR,
};
pub use config_loader::{ConfigLoader, DEFAULT_CONFIG_PATH};
pub use error::{ConfigError, DecodeError, FetchError, StoreError, WatchError};
pub use events::ChainEvent;
pub use position::{scale_down, Position, PositionId, Reserves, Vault, VaultView, PRICE_DECIMALS};
pub use retry::CallPolicy;
pub use snapshot::{Snapshot, VaultDelta};
pub use store::VaultStore;
