//! Error types shared across the workspace.
//!
//! Each failure class the pipeline distinguishes has its own type so the
//! orchestrator can decide, at a single boundary, what to log and what to keep.

use std::time::Duration;
use thiserror::Error;

/// A chain log matched a known topic but its payload could not be decoded.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The ABI decoder rejected the data section.
    #[error("malformed {label} data: {message}")]
    Abi {
        /// Event label from the topic table.
        label: &'static str,
        /// Decoder message.
        message: String,
    },

    /// The decoded token at `index` was not of the expected type.
    #[error("{label} field {index} has unexpected type")]
    UnexpectedToken {
        /// Event label from the topic table.
        label: &'static str,
        /// Position of the field in the data tuple.
        index: usize,
    },

    /// An oracle reported a price that is zero or negative.
    #[error("{label} reported non-positive price {price}")]
    NonPositivePrice {
        /// Event label from the topic table.
        label: &'static str,
        /// Scaled answer as reported.
        price: f64,
    },

    /// A log carried no topics at all.
    #[error("log has no topics")]
    MissingTopic,
}

impl DecodeError {
    /// Creates an ABI decoding error.
    pub fn abi(label: &'static str, message: impl Into<String>) -> Self {
        Self::Abi {
            label,
            message: message.into(),
        }
    }
}

/// An external read (chain RPC or volatility feed) failed.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The call did not complete within its deadline.
    #[error("{call} timed out after {elapsed:?}")]
    Timeout {
        /// Name of the call that timed out.
        call: String,
        /// Configured deadline.
        elapsed: Duration,
    },

    /// Network or connection failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-success HTTP status.
    #[error("HTTP {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, if any.
        message: String,
    },

    /// JSON-RPC level error object.
    #[error("RPC error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code.
        code: i64,
        /// JSON-RPC error message.
        message: String,
    },

    /// The response arrived but did not have the expected shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl FetchError {
    /// Creates a timeout error for the named call.
    pub fn timeout(call: impl Into<String>, elapsed: Duration) -> Self {
        Self::Timeout {
            call: call.into(),
            elapsed,
        }
    }

    /// Returns true if repeating the same call may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Transport(_) => true,
            Self::Status { status, .. } => *status >= 500,
            Self::Rpc { .. } | Self::MalformedResponse(_) => false,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::MalformedResponse(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Status {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Position store operation addressed a vault that is not configured.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unknown vault: {0}")]
    UnknownVault(String),
}

/// Configuration could not be loaded or is inconsistent.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("chain '{0}' is not configured")]
    UnknownChain(String),

    #[error("vault name '{0}' is not of the form BASE-QUOTE")]
    InvalidVaultName(String),

    #[error("vault '{0}' is configured twice")]
    DuplicateVault(String),

    #[error("vault '{vault}' base asset {symbol} has no token address")]
    MissingToken { vault: String, symbol: String },

    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),
}

/// Failure while handling a single chain event.
///
/// Resolution misses are not errors; handlers report them as ignored outcomes.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
