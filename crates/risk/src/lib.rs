//! Vault risk: option pricing, volatility input and aggregate delta.

pub mod engine;
pub mod pricing;
pub mod volatility;

pub use engine::{aggregate_delta, position_delta, RiskEngine, RiskError, RiskParams};
pub use pricing::{delta, OptionKind};
pub use volatility::{DeribitVolatilityFeed, VolatilityFeed};
