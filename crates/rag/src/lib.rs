//! AskForge Adaptive RAG
//!
//! Answers questions about an indexed document. Retrieved context is checked
//! for relevance first; when it does not answer the question the workflow
//! searches the web instead.

pub mod nodes;
pub mod prompts;
pub mod repl;
pub mod web;
pub mod workflow;

pub use web::{SearchHit, TavilySearch, WebSearch};
pub use workflow::{AdaptiveRag, RunState, Stage};
