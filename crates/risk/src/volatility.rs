//! Implied/historical volatility feed.
//!
//! A single market's series prices every vault, whatever its pair.

use async_trait::async_trait;
use serde::Deserialize;
use vault_greeks_core::{CallPolicy, FetchError, RiskConfig};

/// Source of the annualised volatility used by the pricing model.
#[async_trait]
pub trait VolatilityFeed: Send + Sync {
    /// Latest volatility as a fraction (0.65 for 65%).
    async fn latest(&self) -> Result<f64, FetchError>;
}

/// Deribit `get_historical_volatility` client.
///
/// The endpoint returns `{"result": [[timestamp, vol_pct], ...]}`; only the last
/// point is used, divided by 100.
#[derive(Debug, Clone)]
pub struct DeribitVolatilityFeed {
    client: reqwest::Client,
    url: String,
    currency: String,
    policy: CallPolicy,
}

impl DeribitVolatilityFeed {
    #[must_use]
    pub fn new(url: impl Into<String>, currency: impl Into<String>, policy: CallPolicy) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            currency: currency.into(),
            policy,
        }
    }

    #[must_use]
    pub fn from_config(config: &RiskConfig, policy: CallPolicy) -> Self {
        Self::new(&config.volatility_url, &config.volatility_currency, policy)
    }

    async fn fetch(&self) -> Result<f64, FetchError> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("currency", self.currency.as_str())])
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(FetchError::Status { status, message });
        }

        let body: HistoricalVolatility = response.json().await?;
        let (_, vol_pct) = body
            .result
            .last()
            .copied()
            .ok_or_else(|| FetchError::MalformedResponse("empty volatility series".to_string()))?;

        Ok(vol_pct / 100.0)
    }
}

#[async_trait]
impl VolatilityFeed for DeribitVolatilityFeed {
    async fn latest(&self) -> Result<f64, FetchError> {
        self.policy.run("volatility", || self.fetch()).await
    }
}

#[derive(Debug, Deserialize)]
struct HistoricalVolatility {
    result: Vec<(f64, f64)>,
}
