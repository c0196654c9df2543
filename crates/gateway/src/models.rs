//! Request and response bodies for the crypto endpoints
//!
//! Response types double as the schema the analyst model's JSON must satisfy.

use askforge_common::errors::{AppError, Result};
use serde::{de, Deserialize, Deserializer, Serialize};
use validator::Validate;

/// Body of `/crypto/analyze` and `/crypto/compare`
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct CoinsRequest {
    /// CoinGecko coin ids, e.g. `bitcoin`
    #[validate(length(min = 1, max = 25))]
    pub coins: Vec<String>,
}

impl CoinsRequest {
    /// Validate the body and return the trimmed coin ids
    pub fn coin_ids(&self) -> Result<Vec<String>> {
        self.validate()?;

        let ids: Vec<String> = self.coins.iter().map(|c| c.trim().to_string()).collect();
        if ids.iter().any(String::is_empty) {
            return Err(AppError::Validation {
                message: "coin ids must not be blank".to_string(),
                field: Some("coins".to_string()),
            });
        }

        Ok(ids)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketFactor {
    pub factor: String,
    pub impact: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CryptoInsight {
    pub prediction: String,
    /// Percent, 0 to 100
    #[validate(range(min = 0, max = 100))]
    #[serde(deserialize_with = "whole_number")]
    pub confidence: i64,
}

/// Accepts integers and floats with no fractional part, such as `65.0`
fn whole_number<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let number = serde_json::Number::deserialize(deserializer)?;
    if let Some(n) = number.as_i64() {
        return Ok(n);
    }

    match number.as_f64() {
        Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 => {
            Ok(f as i64)
        }
        _ => Err(de::Error::custom(format!(
            "invalid value: {}, expected a whole number",
            number
        ))),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CoinMarketAnalysis {
    pub coin: String,
    pub summary: String,
    pub sentiment: Sentiment,
    pub key_factors: Vec<MarketFactor>,
    #[validate(nested)]
    pub insights: Vec<CryptoInsight>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CryptoAnalysisResponse {
    #[validate(nested)]
    pub analysis: Vec<CoinMarketAnalysis>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CryptoComparison {
    pub winner: String,
    pub summary: String,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CryptoComparisonResponse {
    pub comparison: CryptoComparison,
}
