//! Market analyst
//!
//! Sends market data to the analyst model with a schema-bearing system prompt
//! and turns the reply into typed, validated responses. The model must reply
//! with bare JSON; anything else is an upstream failure.

use crate::market::CoinMarket;
use crate::models::{CryptoAnalysisResponse, CryptoComparisonResponse};
use askforge_common::errors::{AppError, Result};
use askforge_common::llm::{ChatMessage, ChatModel};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use validator::Validate;

pub const ANALYSIS_SYSTEM_PROMPT: &str = r#"You are a "CryptoAnalyst AI" - A Professional Crypto Market Analyst
You will be given recent market data for several crypto currencies (price, market_cap, volume, 24h change)
Your job is to produce a structured analysis that follows a JSON Schema

Rules:
- Return One Analysis per coin
- Follow the exact JSON Schema
{
"analysis" : [
    { "coin" : "< coin name >",
      "summary" : "< 2-3 line summary >",
      "sentiment" : "bullish" | "neutral" | "bearish",
      "key_factors" : [
      {"factor" : "<factor name>" , "impact" : "<impact details>"}
      ],
      "insights" : [
      {"prediction" : "<short-term prediction>", "confidence" : <0-100>}
      ]
    }
]
}
- Provide 3 key_factors and 3 insights per coin
- Base your reasoning on the given metrics
- Always output only JSON and NO MARKDOWN, NO EXPLANATIONS
- CRITICAL INSTRUCTIONS - You MUST output only VALID JSON, not inside quotes, not inside markdown, not as a string.
- Do not add explanations or greetings
- The JSON MUST directly begin with { and end with }"#;

pub const COMPARE_SYSTEM_PROMPT: &str = r#"You are a "CryptoAnalyst AI" - A Professional Crypto Market Analyst
You will be given recent market data for several crypto currencies (price, market_cap, volume, 24h change)
Your job is to compare them and pick the coin with the strongest outlook, following a JSON Schema

Rules:
- Follow the exact JSON Schema
{
"comparison" : {
    "winner" : "<coin name with strongest outlook>",
    "summary" : "<1-2 sentence human style summary of why>",
    "reasons" : [
    "<reason1>",
    "<reason2>",
    "<reason3>"
    ]
}
}
- Provide 3 reasons
- Base your reasoning on the given metrics
- Always output only JSON and NO MARKDOWN, NO EXPLANATIONS
- CRITICAL INSTRUCTIONS - You MUST output only VALID JSON, not inside quotes, not inside markdown, not as a string.
- Do not add explanations or greetings
- The JSON MUST directly begin with { and end with }"#;

/// User turn carrying the market data as pretty-printed JSON
pub fn market_data_message(markets: &[CoinMarket]) -> Result<String> {
    Ok(format!(
        " Here is the market data - {} ",
        serde_json::to_string_pretty(markets)?
    ))
}

/// Parse a model reply as JSON, then check it against `T`'s schema
pub fn parse_reply<T>(raw: &str) -> Result<T>
where
    T: DeserializeOwned + Validate,
{
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|_| AppError::LlmInvalidJson {
            raw: raw.to_string(),
        })?;

    let parsed: T = serde_json::from_value(value).map_err(|e| AppError::LlmSchema {
        message: e.to_string(),
    })?;

    parsed.validate().map_err(|e| AppError::LlmSchema {
        message: e.to_string(),
    })?;

    Ok(parsed)
}

/// Asks the analyst model about market data
pub struct Analyst {
    llm: Arc<dyn ChatModel>,
}

impl Analyst {
    pub fn new(llm: Arc<dyn ChatModel>) -> Self {
        Self { llm }
    }

    /// One analysis per coin
    pub async fn analyze(&self, markets: &[CoinMarket]) -> Result<CryptoAnalysisResponse> {
        self.ask(ANALYSIS_SYSTEM_PROMPT, markets).await
    }

    /// The coin with the strongest outlook and why
    pub async fn compare(&self, markets: &[CoinMarket]) -> Result<CryptoComparisonResponse> {
        self.ask(COMPARE_SYSTEM_PROMPT, markets).await
    }

    async fn ask<T>(&self, system_prompt: &str, markets: &[CoinMarket]) -> Result<T>
    where
        T: DeserializeOwned + Validate,
    {
        let messages = [
            ChatMessage::system(system_prompt),
            ChatMessage::user(market_data_message(markets)?),
        ];

        let reply = self.llm.invoke(&messages).await?;

        parse_reply(&reply).inspect_err(|e| {
            tracing::warn!(
                model = self.llm.model_name(),
                error = %e,
                reply_len = reply.len(),
                "Analyst reply rejected"
            )
        })
    }
}
