//! Market data source
//!
//! Fetches current market figures for a list of coins from a
//! CoinGecko-compatible `/coins/markets` endpoint.

use askforge_common::config::MarketConfig;
use askforge_common::errors::{AppError, Result};
use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// The figures forwarded to the analyst for one coin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinMarket {
    pub name: String,
    pub symbol: String,
    pub current_price: Option<f64>,
    pub market_cap: Option<f64>,
    pub total_volume: Option<f64>,
    pub price_change_percentage_24h: Option<f64>,
}

#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Market data for the given coin ids; unknown ids are simply absent
    async fn fetch_markets(&self, coin_ids: &[String]) -> Result<Vec<CoinMarket>>;
}

pub struct CoinGeckoClient {
    client: reqwest::Client,
    url: String,
    vs_currency: String,
}

impl CoinGeckoClient {
    pub fn new(config: &MarketConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            url: config.url.clone(),
            vs_currency: config.vs_currency.clone(),
        })
    }

    fn markets_url(&self, coin_ids: &[String]) -> Result<Url> {
        Url::parse_with_params(
            &self.url,
            &[
                ("ids", coin_ids.join(",")),
                ("vs_currency", self.vs_currency.clone()),
            ],
        )
        .map_err(|e| AppError::Configuration {
            message: format!("Invalid market data URL '{}': {}", self.url, e),
        })
    }
}

#[async_trait]
impl MarketDataSource for CoinGeckoClient {
    async fn fetch_markets(&self, coin_ids: &[String]) -> Result<Vec<CoinMarket>> {
        let url = self.markets_url(coin_ids)?;
        let start = Instant::now();

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::MarketData {
                message: format!("Request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::MarketData {
                message: format!("API error {}: {}", status, body),
            });
        }

        let markets: Vec<CoinMarket> = response.json().await.map_err(|e| AppError::MarketData {
            message: format!("Failed to parse response: {}", e),
        })?;

        tracing::debug!(
            requested = coin_ids.len(),
            returned = markets.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Market data fetched"
        );

        Ok(markets)
    }
}
