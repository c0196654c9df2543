//! AskForge Ingestion
//!
//! Turns the source PDF into a searchable in-memory index:
//! 1. Loads one document per page
//! 2. Splits pages into overlapping chunks
//! 3. Embeds chunks and stores them for similarity search

pub mod chunker;
pub mod document;
pub mod errors;
pub mod index;
pub mod pdf;

#[cfg(test)]
mod test_support;

pub use chunker::ChunkingConfig;
pub use document::{Document, DocumentMetadata};
pub use errors::IngestionError;
pub use index::{DocumentIndex, InMemoryVectorStore};

use askforge_common::embeddings::Embedder;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Load, split and embed the PDF at `path`
///
/// Fails with [`IngestionError::EmptyDocument`] when the PDF yields no chunks.
pub async fn build_index(
    path: &Path,
    chunking: &ChunkingConfig,
    embedder: Arc<dyn Embedder>,
    batch_size: usize,
) -> Result<InMemoryVectorStore, IngestionError> {
    let start = Instant::now();

    let pages = pdf::load_pdf(path)?;
    let splits = chunker::split_documents(&pages, chunking)?;

    if splits.is_empty() {
        return Err(IngestionError::EmptyDocument {
            path: path.display().to_string(),
        });
    }

    info!(
        path = %path.display(),
        pages = pages.len(),
        chunks = splits.len(),
        "Document split"
    );

    let mut store = InMemoryVectorStore::new(embedder);
    store.add_documents(splits, batch_size).await?;

    info!(
        chunks = store.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Index built"
    );

    Ok(store)
}
