use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use std::collections::HashMap;

use crate::config::PriceConfig;
use crate::error::PriceError;

/// Source of USD prices keyed by provider identifier.
///
/// Identifiers the provider does not know are simply absent from the result.
#[async_trait]
pub trait PriceProvider: Send + Sync {
    async fn fetch_usd_prices(&self, ids: &[String]) -> Result<HashMap<String, f64>, PriceError>;
}

#[derive(Debug, Deserialize)]
struct SimplePrice {
    usd: Option<f64>,
}

/// CoinGecko `simple/price` client.
pub struct CoinGeckoClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl CoinGeckoClient {
    pub fn new(config: &PriceConfig) -> Result<Self, PriceError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl PriceProvider for CoinGeckoClient {
    async fn fetch_usd_prices(&self, ids: &[String]) -> Result<HashMap<String, f64>, PriceError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let url = format!(
            "{}/simple/price?ids={}&vs_currencies=usd",
            self.base_url,
            ids.join(",")
        );
        let mut request = self.client.get(&url).header(ACCEPT, "application/json");
        if let Some(key) = &self.api_key {
            request = request.header("x-cg-demo-api-key", key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PriceError::Status(status.as_u16()));
        }

        let body: HashMap<String, SimplePrice> = response
            .json()
            .await
            .map_err(|e| PriceError::Decode(e.to_string()))?;

        tracing::debug!(requested = ids.len(), returned = body.len(), "Fetched USD prices");

        Ok(body
            .into_iter()
            .filter_map(|(id, price)| price.usd.map(|usd| (id, usd)))
            .collect())
    }
}
