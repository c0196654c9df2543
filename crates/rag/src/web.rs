//! Web search client
//!
//! The fallback branch asks a Tavily-compatible search API for pages
//! matching the user's question.

use askforge_common::config::WebSearchConfig;
use askforge_common::errors::{AppError, Result};
use askforge_common::metrics;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One search result
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub content: String,
}

#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>>;
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    max_results: usize,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

/// Client for the Tavily search API
pub struct TavilySearch {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    max_results: usize,
}

impl TavilySearch {
    pub fn new(config: &WebSearchConfig) -> Result<Self> {
        let api_key = config.require_api_key()?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            endpoint: format!("{}/search", config.api_base.trim_end_matches('/')),
            api_key,
            max_results: config.max_results,
        })
    }

    async fn request(&self, query: &str) -> Result<Vec<SearchHit>> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&SearchRequest {
                query,
                max_results: self.max_results,
            })
            .send()
            .await
            .map_err(|e| AppError::WebSearch {
                message: format!("Request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::WebSearch {
                message: format!("API error {}: {}", status, body),
            });
        }

        let parsed: SearchResponse = response.json().await.map_err(|e| AppError::WebSearch {
            message: format!("Failed to parse response: {}", e),
        })?;

        Ok(parsed.results)
    }
}

#[async_trait]
impl WebSearch for TavilySearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let result = self.request(query).await;
        metrics::record_web_search(result.is_ok());

        match &result {
            Ok(hits) => tracing::debug!(results = hits.len(), "Web search finished"),
            Err(e) => tracing::warn!(error = %e, "Web search failed"),
        }

        result
    }
}
