use crate::position::PositionId;
use ethers::types::Address;
use serde::{Deserialize, Serialize};

/// Domain event decoded from a chain log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChainEvent {
    /// An oracle aggregator transmitted a new answer, already scaled down from 1e8.
    PriceUpdated { oracle: Address, price: f64 },

    /// A position manager minted a position. Carries only the id.
    PositionOpened { source: Address, position_id: PositionId },

    /// A position manager burned a position.
    PositionClosed { source: Address, position_id: PositionId },
}

impl ChainEvent {
    /// Address of the contract that emitted the log.
    #[must_use]
    pub const fn source(&self) -> Address {
        match self {
            Self::PriceUpdated { oracle, .. } => *oracle,
            Self::PositionOpened { source, .. } | Self::PositionClosed { source, .. } => *source,
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::PriceUpdated { .. } => "NewTransmission",
            Self::PositionOpened { .. } => "OpenedPosition",
            Self::PositionClosed { .. } => "ClosedPosition",
        }
    }
}
