//! AskForge Common Library
//!
//! Shared code for the AskForge services including:
//! - Configuration management
//! - Error types and handling
//! - Chat model client and prompt templates
//! - Embedding client abstraction
//! - Metrics and observability

pub mod config;
pub mod embeddings;
pub mod errors;
pub mod llm;
pub mod metrics;
pub mod prompt;
pub mod telemetry;

// Re-export commonly used types
pub use config::AppConfig;
pub use embeddings::Embedder;
pub use errors::{AppError, Result};
pub use llm::{ChatMessage, ChatModel};
pub use prompt::PromptTemplate;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
