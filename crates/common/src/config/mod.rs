//! Configuration management for AskForge services
//!
//! Supports loading configuration from:
//! - Default values
//! - Configuration files (config/default, config/{APP_ENV}, config/local)
//! - Environment variables (prefixed with APP__)
//! - Conventional provider variables (OPENAI_API_KEY, TAVILY_API_KEY, ...)

use config::{builder::DefaultState, Config, ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::{AppError, Result};
use crate::llm::ChatSettings;

/// Provider variables honoured when the APP__ form is not set.
/// Pairs of (environment variable, config key).
const PROVIDER_ENV_FALLBACKS: &[(&str, &str)] = &[
    ("OPENAI_API_KEY", "llm.api_key"),
    ("OPENROUTER_API_KEY", "analyst.api_key"),
    ("OPENROUTER_URL", "analyst.endpoint"),
    ("COINGECKO_URL", "market.url"),
    ("TAVILY_API_KEY", "web_search.api_key"),
];

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// HTTP server configuration (gateway)
    #[serde(default)]
    pub server: ServerConfig,

    /// Chat model used by the question-answering workflow
    #[serde(default)]
    pub llm: LlmConfig,

    /// Chat model used by the crypto analyst
    #[serde(default)]
    pub analyst: AnalystConfig,

    /// Embedding service configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Document indexing and retrieval
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Web search fallback
    #[serde(default)]
    pub web_search: WebSearchConfig,

    /// Market data source (gateway)
    #[serde(default)]
    pub market: MarketConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Shutdown timeout in seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    /// Full chat completions URL
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,

    /// API key for the chat endpoint
    pub api_key: Option<String>,

    /// Model identifier
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_llm_temperature")]
    pub temperature: Option<f32>,

    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnalystConfig {
    /// Full chat completions URL (OpenRouter by default)
    #[serde(default = "default_analyst_endpoint")]
    pub endpoint: String,

    /// API key for the chat endpoint
    pub api_key: Option<String>,

    /// Model identifier
    #[serde(default = "default_analyst_model")]
    pub model: String,

    /// Sampling temperature (provider default when unset)
    pub temperature: Option<f32>,

    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    /// Embedding provider: ollama, openai, mock
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// API key for embedding service
    pub api_key: Option<String>,

    /// API base URL
    pub api_base: Option<String>,

    /// Model to use
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Request timeout in seconds
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,

    /// Batch size for embedding requests
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrievalConfig {
    /// Source document indexed at startup
    #[serde(default = "default_document_path")]
    pub document_path: String,

    /// Target chunk size in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap between consecutive chunks in characters
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Number of chunks retrieved per question
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebSearchConfig {
    /// Search API base URL
    #[serde(default = "default_web_search_base")]
    pub api_base: String,

    /// Search API key
    pub api_key: Option<String>,

    /// Maximum results requested per search
    #[serde(default = "default_web_max_results")]
    pub max_results: usize,

    /// Characters kept from each result's content
    #[serde(default = "default_web_max_content_chars")]
    pub max_content_chars: usize,

    /// Request timeout in seconds
    #[serde(default = "default_web_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MarketConfig {
    /// Coin markets endpoint
    #[serde(default = "default_market_url")]
    pub url: String,

    /// Quote currency
    #[serde(default = "default_vs_currency")]
    pub vs_currency: String,

    /// Request timeout in seconds
    #[serde(default = "default_market_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level filter (RUST_LOG takes precedence)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Requests per second
    #[serde(default = "default_rate_limit")]
    pub requests_per_second: u32,

    /// Burst capacity
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Enable rate limiting
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 120 }
fn default_shutdown_timeout() -> u64 { 30 }
fn default_llm_endpoint() -> String { "https://api.openai.com/v1/chat/completions".to_string() }
fn default_llm_model() -> String { "gpt-5-nano-2025-08-07".to_string() }
fn default_llm_temperature() -> Option<f32> { Some(0.0) }
fn default_llm_timeout() -> u64 { 120 }
fn default_analyst_endpoint() -> String { "https://openrouter.ai/api/v1/chat/completions".to_string() }
fn default_analyst_model() -> String { "meta-llama/llama-3.3-70b-instruct:free".to_string() }
fn default_embedding_provider() -> String { "ollama".to_string() }
fn default_embedding_model() -> String { "nomic-embed-text:latest".to_string() }
fn default_embedding_timeout() -> u64 { 60 }
fn default_batch_size() -> usize { 32 }
fn default_document_path() -> String { "./hr_manual.pdf".to_string() }
fn default_chunk_size() -> usize { 500 }
fn default_chunk_overlap() -> usize { 100 }
fn default_top_k() -> usize { 5 }
fn default_web_search_base() -> String { "https://api.tavily.com".to_string() }
fn default_web_max_results() -> usize { 4 }
fn default_web_max_content_chars() -> usize { 1000 }
fn default_web_timeout() -> u64 { 30 }
fn default_market_url() -> String { "https://api.coingecko.com/api/v3/coins/markets".to_string() }
fn default_vs_currency() -> String { "usd".to_string() }
fn default_market_timeout() -> u64 { 15 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { false }
fn default_rate_limit() -> u32 { 5 }
fn default_burst() -> u32 { 10 }
fn default_enabled() -> bool { true }

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> std::result::Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let builder = with_provider_fallbacks(Config::builder())?
            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // e.g., APP__LLM__MODEL=gpt-4o-mini
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            );

        builder.build()?.try_deserialize()
    }

    /// Per-request deadline for the HTTP service
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// How long in-flight requests may drain after a shutdown signal
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout_secs)
    }
}

/// Seed provider variables as defaults so files and APP__ variables win.
fn with_provider_fallbacks(
    mut builder: ConfigBuilder<DefaultState>,
) -> std::result::Result<ConfigBuilder<DefaultState>, ConfigError> {
    for (var, key) in PROVIDER_ENV_FALLBACKS {
        if let Ok(value) = std::env::var(var) {
            if !value.trim().is_empty() {
                builder = builder.set_default(*key, value)?;
            }
        }
    }
    Ok(builder)
}

fn require_key(key: &Option<String>, setting: &str) -> Result<String> {
    match key.as_deref().map(str::trim) {
        Some(k) if !k.is_empty() => Ok(k.to_string()),
        _ => Err(AppError::Configuration {
            message: format!("{} is not set", setting),
        }),
    }
}

impl LlmConfig {
    /// Client settings for the workflow model; fails without an API key
    pub fn chat_settings(&self) -> Result<ChatSettings> {
        Ok(ChatSettings {
            endpoint: self.endpoint.clone(),
            api_key: require_key(&self.api_key, "llm.api_key (OPENAI_API_KEY)")?,
            model: self.model.clone(),
            temperature: self.temperature,
            timeout: Duration::from_secs(self.timeout_secs),
        })
    }
}

impl AnalystConfig {
    /// Client settings for the analyst model; fails without an API key
    pub fn chat_settings(&self) -> Result<ChatSettings> {
        Ok(ChatSettings {
            endpoint: self.endpoint.clone(),
            api_key: require_key(&self.api_key, "analyst.api_key (OPENROUTER_API_KEY)")?,
            model: self.model.clone(),
            temperature: self.temperature,
            timeout: Duration::from_secs(self.timeout_secs),
        })
    }
}

impl WebSearchConfig {
    /// API key for the search provider
    pub fn require_api_key(&self) -> Result<String> {
        require_key(&self.api_key, "web_search.api_key (TAVILY_API_KEY)")
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: default_llm_endpoint(),
            api_key: None,
            model: default_llm_model(),
            temperature: default_llm_temperature(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

impl Default for AnalystConfig {
    fn default() -> Self {
        Self {
            endpoint: default_analyst_endpoint(),
            api_key: None,
            model: default_analyst_model(),
            temperature: None,
            timeout_secs: default_llm_timeout(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            api_key: None,
            api_base: None,
            model: default_embedding_model(),
            timeout_secs: default_embedding_timeout(),
            batch_size: default_batch_size(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            document_path: default_document_path(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            top_k: default_top_k(),
        }
    }
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            api_base: default_web_search_base(),
            api_key: None,
            max_results: default_web_max_results(),
            max_content_chars: default_web_max_content_chars(),
            timeout_secs: default_web_timeout(),
        }
    }
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            url: default_market_url(),
            vs_currency: default_vs_currency(),
            timeout_secs: default_market_timeout(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_rate_limit(),
            burst: default_burst(),
            enabled: default_enabled(),
        }
    }
}
