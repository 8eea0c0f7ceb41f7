//! Maps raw chain logs to typed [`ChainEvent`]s.
//!
//! Lookup is by `topics[0]`. Logs with a topic outside the table are not
//! errors: the subscription filter may admit unrelated events.

use ethers::abi::{self, ParamType, Token};
use ethers::types::{Log, H256, U256};
use std::collections::HashMap;
use vault_greeks_core::{scale_down, ChainEvent, DecodeError, PRICE_DECIMALS};

/// `OpenedPosition(address indexed user, bool indexed isCall, uint indexed strike, uint amount, uint tokenId)`
///
/// 0x175bafc5525b745c29ea48097e504eca988c84edcc1bf503fa5866115854d4b5
pub const OPENED_POSITION_TOPIC: H256 = H256([
    0x17, 0x5b, 0xaf, 0xc5, 0x52, 0x5b, 0x74, 0x5c, 0x29, 0xea, 0x48, 0x09, 0x7e, 0x50, 0x4e,
    0xca, 0x98, 0x8c, 0x84, 0xed, 0xcc, 0x1b, 0xf5, 0x03, 0xfa, 0x58, 0x66, 0x11, 0x58, 0x54,
    0xd4, 0xb5,
]);

/// `ClosedPosition(address indexed user, address closer, uint256 tokenId, int256 pnl)`
///
/// 0xc6ec1e16b7b639fb4e5dfccd3a9134b7190008e32a93758705a829394bae907a
pub const CLOSED_POSITION_TOPIC: H256 = H256([
    0xc6, 0xec, 0x1e, 0x16, 0xb7, 0xb6, 0x39, 0xfb, 0x4e, 0x5d, 0xfc, 0xcd, 0x3a, 0x91, 0x34,
    0xb7, 0x19, 0x00, 0x08, 0xe3, 0x2a, 0x93, 0x75, 0x87, 0x05, 0xa8, 0x29, 0x39, 0x4b, 0xae,
    0x90, 0x7a,
]);

/// `NewTransmission(uint32 indexed aggregatorRoundId, int192 answer, address transmitter,
/// int192[] observations, bytes observers, bytes32 rawReportContext)`
///
/// 0xf6a97944f31ea060dfde0566e4167c1a1082551e64b60ecb14d599a9d023d451
pub const NEW_TRANSMISSION_TOPIC: H256 = H256([
    0xf6, 0xa9, 0x79, 0x44, 0xf3, 0x1e, 0xa0, 0x60, 0xdf, 0xde, 0x05, 0x66, 0xe4, 0x16, 0x7c,
    0x1a, 0x10, 0x82, 0x55, 0x1e, 0x64, 0xb6, 0x0e, 0xcb, 0x14, 0xd5, 0x99, 0xa9, 0xd0, 0x23,
    0xd4, 0x51,
]);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventKind {
    Opened,
    Closed,
    Transmission,
}

/// Decoding schema of one topic: types of the non-indexed fields.
#[derive(Debug, Clone)]
struct TopicSpec {
    label: &'static str,
    kind: EventKind,
    params: Vec<ParamType>,
}

#[derive(Debug, Clone)]
pub struct EventClassifier {
    table: HashMap<H256, TopicSpec>,
}

impl Default for EventClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl EventClassifier {
    #[must_use]
    pub fn new() -> Self {
        let table = HashMap::from([
            (
                OPENED_POSITION_TOPIC,
                TopicSpec {
                    label: "OpenedPosition",
                    kind: EventKind::Opened,
                    params: vec![ParamType::Uint(256), ParamType::Uint(256)],
                },
            ),
            (
                CLOSED_POSITION_TOPIC,
                TopicSpec {
                    label: "ClosedPosition",
                    kind: EventKind::Closed,
                    params: vec![ParamType::Address, ParamType::Uint(256), ParamType::Uint(256)],
                },
            ),
            (
                NEW_TRANSMISSION_TOPIC,
                TopicSpec {
                    label: "NewTransmission",
                    kind: EventKind::Transmission,
                    params: vec![
                        ParamType::Int(192),
                        ParamType::Address,
                        ParamType::Array(Box::new(ParamType::Int(192))),
                        ParamType::Bytes,
                        ParamType::FixedBytes(32),
                    ],
                },
            ),
        ]);
        Self { table }
    }

    /// Topics to subscribe to, one per table entry.
    #[must_use]
    pub fn topics(&self) -> Vec<H256> {
        let mut topics: Vec<H256> = self.table.keys().copied().collect();
        topics.sort();
        topics
    }

    /// Classifies a log. `Ok(None)` means the topic is not one we track.
    ///
    /// # Errors
    /// Returns a [`DecodeError`] if the log has no topics or its data does not
    /// match the schema registered for its topic.
    pub fn classify(&self, log: &Log) -> Result<Option<ChainEvent>, DecodeError> {
        let topic = log.topics.first().ok_or(DecodeError::MissingTopic)?;
        let Some(spec) = self.table.get(topic) else {
            return Ok(None);
        };

        let tokens = abi::decode(&spec.params, &log.data)
            .map_err(|e| DecodeError::abi(spec.label, e.to_string()))?;

        let event = match spec.kind {
            EventKind::Opened => ChainEvent::PositionOpened {
                source: log.address,
                position_id: uint_at(&tokens, 1, spec.label)?,
            },
            EventKind::Closed => ChainEvent::PositionClosed {
                source: log.address,
                position_id: uint_at(&tokens, 1, spec.label)?,
            },
            EventKind::Transmission => {
                let price = signed_to_f64(int_at(&tokens, 0, spec.label)?, PRICE_DECIMALS);
                if price <= 0.0 {
                    return Err(DecodeError::NonPositivePrice {
                        label: spec.label,
                        price,
                    });
                }
                ChainEvent::PriceUpdated {
                    oracle: log.address,
                    price,
                }
            }
        };

        Ok(Some(event))
    }
}

fn uint_at(tokens: &[Token], index: usize, label: &'static str) -> Result<U256, DecodeError> {
    tokens
        .get(index)
        .cloned()
        .and_then(Token::into_uint)
        .ok_or(DecodeError::UnexpectedToken { label, index })
}

fn int_at(tokens: &[Token], index: usize, label: &'static str) -> Result<U256, DecodeError> {
    tokens
        .get(index)
        .cloned()
        .and_then(Token::into_int)
        .ok_or(DecodeError::UnexpectedToken { label, index })
}

/// Interprets a sign-extended two's complement word and scales it down.
fn signed_to_f64(raw: U256, decimals: u32) -> f64 {
    if raw.bit(255) {
        -scale_down((!raw).overflowing_add(U256::one()).0, decimals)
    } else {
        scale_down(raw, decimals)
    }
}
