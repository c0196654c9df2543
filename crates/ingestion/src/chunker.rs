//! Text chunking module
//!
//! Splits page text into overlapping, character-bounded chunks for embedding.

use crate::document::Document;
use crate::errors::IngestionError;
use text_splitter::{ChunkConfig, TextSplitter};
use tracing::debug;

/// Configuration for text chunking
#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 100,
        }
    }
}

/// A text chunk with its position in the source text
#[derive(Debug, Clone)]
pub struct TextChunk {
    /// The chunk content
    pub content: String,
    /// Index of this chunk in the source text
    pub index: usize,
    /// Start byte position in the source text
    pub start_pos: usize,
    /// End byte position in the source text
    pub end_pos: usize,
}

fn build_splitter(config: &ChunkingConfig) -> Result<TextSplitter<text_splitter::Characters>, IngestionError> {
    let chunk_config = ChunkConfig::new(config.chunk_size)
        .with_overlap(config.chunk_overlap)
        .map_err(|e| IngestionError::ChunkingError(e.to_string()))?;

    Ok(TextSplitter::new(chunk_config))
}

/// Split text into overlapping chunks
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Result<Vec<TextChunk>, IngestionError> {
    let splitter = build_splitter(config)?;

    let chunks: Vec<TextChunk> = splitter
        .chunk_indices(text)
        .enumerate()
        .map(|(index, (start_pos, chunk))| TextChunk {
            content: chunk.to_string(),
            index,
            start_pos,
            end_pos: start_pos + chunk.len(),
        })
        .collect();

    debug!(
        input_len = text.len(),
        chunk_count = chunks.len(),
        chunk_size = config.chunk_size,
        chunk_overlap = config.chunk_overlap,
        "Text chunked"
    );

    Ok(chunks)
}

/// Split every document into chunks that inherit the document's metadata
pub fn split_documents(
    documents: &[Document],
    config: &ChunkingConfig,
) -> Result<Vec<Document>, IngestionError> {
    let mut splits = Vec::new();

    for document in documents {
        for chunk in chunk_text(&document.page_content, config)? {
            splits.push(Document::new(chunk.content, document.metadata.clone()));
        }
    }

    Ok(splits)
}
