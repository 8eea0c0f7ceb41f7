//! Typed reads of oracle, vault and position-manager state.

use crate::rpc::RpcClient;
use async_trait::async_trait;
use ethers::abi::{self, ParamType, Token};
use ethers::types::{Address, Bytes, U256};
use ethers::utils::id;
use vault_greeks_core::{scale_down, FetchError, Position, PositionId, Reserves, PRICE_DECIMALS};

/// Read access to the contracts a vault is observed through.
#[async_trait]
pub trait VaultReader: Send + Sync {
    /// Oracle price of `token`, scaled down from 1e8.
    async fn asset_price(&self, oracle: Address, token: Address) -> Result<f64, FetchError>;

    async fn reserves(&self, vault: Address) -> Result<Reserves, FetchError>;

    /// Number of live position NFTs.
    async fn total_supply(&self, position_manager: Address) -> Result<U256, FetchError>;

    async fn token_by_index(
        &self,
        position_manager: Address,
        index: U256,
    ) -> Result<PositionId, FetchError>;

    async fn position(
        &self,
        position_manager: Address,
        id: PositionId,
    ) -> Result<Position, FetchError>;
}

/// [`VaultReader`] backed by `eth_call`.
#[derive(Debug, Clone)]
pub struct RpcVaultReader {
    rpc: RpcClient,
}

impl RpcVaultReader {
    #[must_use]
    pub const fn new(rpc: RpcClient) -> Self {
        Self { rpc }
    }

    async fn call(
        &self,
        signature: &str,
        to: Address,
        args: &[Token],
        outputs: &[ParamType],
    ) -> Result<Vec<Token>, FetchError> {
        let mut data = id(signature).to_vec();
        data.extend(abi::encode(args));

        let out = self.rpc.eth_call(signature, to, Bytes::from(data)).await?;

        abi::decode(outputs, &out)
            .map_err(|e| FetchError::MalformedResponse(format!("{signature}: {e}")))
    }
}

#[async_trait]
impl VaultReader for RpcVaultReader {
    async fn asset_price(&self, oracle: Address, token: Address) -> Result<f64, FetchError> {
        let out = self
            .call(
                "getAssetPrice(address)",
                oracle,
                &[Token::Address(token)],
                &[ParamType::Uint(256)],
            )
            .await?;
        Ok(scale_down(uint(&out, 0)?, PRICE_DECIMALS))
    }

    async fn reserves(&self, vault: Address) -> Result<Reserves, FetchError> {
        let out = self
            .call(
                "getReserves()",
                vault,
                &[],
                &[ParamType::Uint(256), ParamType::Uint(256)],
            )
            .await?;
        Ok(Reserves {
            base_amount: uint(&out, 0)?,
            quote_amount: uint(&out, 1)?,
        })
    }

    async fn total_supply(&self, position_manager: Address) -> Result<U256, FetchError> {
        let out = self
            .call("totalSupply()", position_manager, &[], &[ParamType::Uint(256)])
            .await?;
        uint(&out, 0)
    }

    async fn token_by_index(
        &self,
        position_manager: Address,
        index: U256,
    ) -> Result<PositionId, FetchError> {
        let out = self
            .call(
                "tokenByIndex(uint256)",
                position_manager,
                &[Token::Uint(index)],
                &[ParamType::Uint(256)],
            )
            .await?;
        uint(&out, 0)
    }

    async fn position(
        &self,
        position_manager: Address,
        id: PositionId,
    ) -> Result<Position, FetchError> {
        // (isCall, positionType, strike, notionalAmount, collateralAmount, startDate)
        let out = self
            .call(
                "getPosition(uint256)",
                position_manager,
                &[Token::Uint(id)],
                &[
                    ParamType::Bool,
                    ParamType::Uint(8),
                    ParamType::Uint(256),
                    ParamType::Uint(256),
                    ParamType::Uint(256),
                    ParamType::Uint(256),
                ],
            )
            .await?;
        let is_call = out
            .first()
            .cloned()
            .and_then(Token::into_bool)
            .ok_or_else(|| FetchError::MalformedResponse("getPosition: isCall".to_string()))?;
        Ok(Position {
            is_call,
            strike: uint(&out, 2)?,
            notional_amount: uint(&out, 3)?,
        })
    }
}

fn uint(tokens: &[Token], index: usize) -> Result<U256, FetchError> {
    tokens
        .get(index)
        .cloned()
        .and_then(Token::into_uint)
        .ok_or_else(|| FetchError::MalformedResponse(format!("expected uint at output {index}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use vault_greeks_core::CallPolicy;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn selector(signature: &str) -> String {
        format!("0x{}", ethers::utils::hex::encode(id(signature)))
    }

    fn encoded(tokens: &[Token]) -> String {
        format!("0x{}", ethers::utils::hex::encode(abi::encode(tokens)))
    }

    async fn mount_call(server: &MockServer, data_prefix: &str, result: String) {
        Mock::given(method("POST"))
            .and(CalldataPrefix(data_prefix.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": result
            })))
            .mount(server)
            .await;
    }

    /// Matches requests whose `params[0].data` starts with the given selector.
    struct CalldataPrefix(String);

    impl wiremock::Match for CalldataPrefix {
        fn matches(&self, request: &wiremock::Request) -> bool {
            serde_json::from_slice::<serde_json::Value>(&request.body)
                .ok()
                .and_then(|body| body["params"][0]["data"].as_str().map(str::to_string))
                .is_some_and(|data| data.starts_with(&self.0))
        }
    }

    fn reader(server: &MockServer) -> RpcVaultReader {
        RpcVaultReader::new(RpcClient::new(server.uri(), CallPolicy::from_millis(1_000, 0)))
    }

    #[tokio::test]
    async fn reads_asset_price_scaled_from_1e8() {
        let server = MockServer::start().await;
        mount_call(
            &server,
            &selector("getAssetPrice(address)"),
            encoded(&[Token::Uint(U256::from(187_512_345_678u64))]),
        )
        .await;

        let price = reader(&server)
            .asset_price(Address::zero(), Address::from_low_u64_be(1))
            .await
            .unwrap();

        assert!((price - 1875.12345678).abs() < 1e-9);
    }

    #[tokio::test]
    async fn reads_position_struct() {
        let server = MockServer::start().await;
        mount_call(
            &server,
            &selector("getPosition(uint256)"),
            encoded(&[
                Token::Bool(false),
                Token::Uint(U256::from(1)),
                Token::Uint(U256::from(1_800u64) * U256::exp10(8)),
                Token::Uint(U256::from(5_000u64) * U256::exp10(6)),
                Token::Uint(U256::from(10)),
                Token::Uint(U256::from(1_700_000_000u64)),
            ]),
        )
        .await;

        let position = reader(&server)
            .position(Address::zero(), U256::from(3))
            .await
            .unwrap();

        assert!(!position.is_call);
        assert_eq!(position.strike, U256::from(1_800u64) * U256::exp10(8));
        assert_eq!(position.notional_amount, U256::from(5_000u64) * U256::exp10(6));
    }

    #[tokio::test]
    async fn enumerates_supply_by_index() {
        let server = MockServer::start().await;
        mount_call(
            &server,
            &selector("totalSupply()"),
            encoded(&[Token::Uint(U256::from(2))]),
        )
        .await;
        mount_call(
            &server,
            &selector("tokenByIndex(uint256)"),
            encoded(&[Token::Uint(U256::from(77))]),
        )
        .await;

        let reader = reader(&server);
        let supply = reader.total_supply(Address::zero()).await.unwrap();
        let id = reader.token_by_index(Address::zero(), U256::zero()).await.unwrap();

        assert_eq!(supply, U256::from(2));
        assert_eq!(id, U256::from(77));
    }

    #[tokio::test]
    async fn short_output_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({ "method": "eth_call" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": "0x"
            })))
            .mount(&server)
            .await;

        let err = reader(&server).reserves(Address::zero()).await.unwrap_err();

        assert!(matches!(err, FetchError::MalformedResponse(_)));
    }
}
