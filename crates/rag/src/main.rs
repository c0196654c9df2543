//! adaptive-rag
//!
//! Indexes the configured PDF, then answers questions typed at the terminal.

use anyhow::Context;
use askforge_common::{
    config::AppConfig,
    embeddings::create_embedder,
    llm::OpenAiChatClient,
    metrics,
    telemetry::{init_tracing, LogTarget},
    VERSION,
};
use askforge_ingestion::{build_index, ChunkingConfig};
use askforge_rag::{
    repl::{run_repl, TerminalInput},
    AdaptiveRag, TavilySearch,
};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "adaptive-rag", version, about = "Ask questions about a PDF, with web fallback")]
struct Cli {
    /// PDF to index (overrides retrieval.document_path)
    #[arg(short, long, env = "ASKFORGE_DOCUMENT")]
    document: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = AppConfig::load().context("Failed to load configuration")?;
    init_tracing(&config.observability, LogTarget::Stderr);
    metrics::register_metrics();

    info!("Starting AskForge Adaptive RAG v{}", VERSION);

    let document = cli
        .document
        .unwrap_or_else(|| PathBuf::from(&config.retrieval.document_path));

    let llm = Arc::new(OpenAiChatClient::new(config.llm.chat_settings()?)?);
    let search = Arc::new(TavilySearch::new(&config.web_search)?);
    let embedder = create_embedder(&config.embedding)?;

    let chunking = ChunkingConfig {
        chunk_size: config.retrieval.chunk_size,
        chunk_overlap: config.retrieval.chunk_overlap,
    };
    let index = build_index(&document, &chunking, embedder, config.embedding.batch_size)
        .await
        .with_context(|| format!("Failed to index {}", document.display()))?;

    info!(document = %document.display(), chunks = index.len(), "Ready for questions");

    let rag = AdaptiveRag::new(llm, Arc::new(index), search)
        .with_top_k(config.retrieval.top_k)
        .with_max_content_chars(config.web_search.max_content_chars);

    let mut input = TerminalInput::new().context("Failed to open terminal input")?;
    let mut stdout = std::io::stdout();
    run_repl(&rag, &mut input, &mut stdout).await
}
