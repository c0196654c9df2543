//! Chat model abstraction
//!
//! Every LLM call in AskForge goes through [`ChatModel::invoke`]: a list of
//! role-tagged messages in, the assistant's text out. The production client
//! speaks the OpenAI-compatible `/chat/completions` protocol, which covers
//! OpenAI and OpenRouter alike.

use crate::errors::{AppError, Result};
use crate::metrics;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Message role in a chat exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Chat message for completion requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Capability to turn a conversation into a response text
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send the messages and return the assistant's reply
    async fn invoke(&self, messages: &[ChatMessage]) -> Result<String>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Connection settings for an OpenAI-compatible endpoint
#[derive(Debug, Clone)]
pub struct ChatSettings {
    /// Full chat completions URL
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub timeout: Duration,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

/// Client for OpenAI-compatible chat completion APIs
pub struct OpenAiChatClient {
    settings: ChatSettings,
    client: reqwest::Client,
}

impl OpenAiChatClient {
    /// Create a new chat client
    pub fn new(settings: ChatSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e)
            })?;

        Ok(Self { settings, client })
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let request = ChatRequest {
            model: &self.settings.model,
            messages,
            temperature: self.settings.temperature,
        };

        let response = self.client
            .post(&self.settings.endpoint)
            .header("Authorization", format!("Bearer {}", self.settings.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Llm {
                message: format!("Request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Llm {
                message: format!("API error {}: {}", status, body),
            });
        }

        let chat_response: ChatResponse = response.json().await
            .map_err(|e| AppError::Llm {
                message: format!("Failed to parse response: {}", e),
            })?;

        first_choice_content(chat_response)
    }
}

fn first_choice_content(response: ChatResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| AppError::Llm {
            message: "Empty response from model".to_string(),
        })
}

#[async_trait]
impl ChatModel for OpenAiChatClient {
    async fn invoke(&self, messages: &[ChatMessage]) -> Result<String> {
        let start = Instant::now();
        let result = self.complete(messages).await;
        let elapsed = start.elapsed();

        metrics::record_llm_call(elapsed.as_secs_f64(), &self.settings.model, result.is_ok());

        match &result {
            Ok(text) => tracing::debug!(
                model = %self.settings.model,
                messages = messages.len(),
                response_len = text.len(),
                latency_ms = elapsed.as_millis() as u64,
                "Chat completion finished"
            ),
            Err(e) => tracing::warn!(
                model = %self.settings.model,
                error = %e,
                "Chat completion failed"
            ),
        }

        result
    }

    fn model_name(&self) -> &str {
        &self.settings.model
    }
}
