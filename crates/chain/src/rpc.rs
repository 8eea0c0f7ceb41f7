//! Minimal JSON-RPC client for read-only contract calls.

use ethers::types::{Address, Bytes};
use serde::Deserialize;
use vault_greeks_core::{CallPolicy, FetchError};

/// Client for `eth_call` against a JSON-RPC endpoint.
#[derive(Debug, Clone)]
pub struct RpcClient {
    client: reqwest::Client,
    rpc_url: String,
    policy: CallPolicy,
}

impl RpcClient {
    #[must_use]
    pub fn new(rpc_url: impl Into<String>, policy: CallPolicy) -> Self {
        Self {
            client: reqwest::Client::new(),
            rpc_url: rpc_url.into(),
            policy,
        }
    }

    #[must_use]
    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    /// Executes `eth_call` at the latest block, with the client's timeout and retry policy.
    ///
    /// `call` names the contract function for logs and errors.
    ///
    /// # Errors
    /// Returns a [`FetchError`] if the request fails, times out, or the node returns an error.
    pub async fn eth_call(&self, call: &str, to: Address, data: Bytes) -> Result<Bytes, FetchError> {
        let request = serde_json::json!({
            "jsonrpc": "2.0",
            "method": "eth_call",
            "params": [{
                "to": to,
                "data": data,
            }, "latest"],
            "id": 1
        });

        self.policy
            .run(call, || self.post(&request))
            .await
    }

    async fn post(&self, request: &serde_json::Value) -> Result<Bytes, FetchError> {
        let response = self.client.post(&self.rpc_url).json(request).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(FetchError::Status { status, message });
        }

        let body: RpcResponse = response.json().await?;

        if let Some(error) = body.error {
            return Err(FetchError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        body.result
            .ok_or_else(|| FetchError::MalformedResponse("no result in RPC response".to_string()))
    }
}

/// JSON-RPC response structure.
#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<Bytes>,
    error: Option<RpcError>,
}

/// JSON-RPC error structure.
#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}
