//! In-memory vector index
//!
//! Holds every chunk of the source document together with its embedding and
//! answers k-nearest-neighbour queries by cosine similarity. Built once at
//! startup; searches only take `&self`.

use crate::document::Document;
use crate::errors::IngestionError;
use askforge_common::embeddings::Embedder;
use askforge_common::errors::{AppError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// Nearest-neighbour lookup over indexed chunks
#[async_trait]
pub trait DocumentIndex: Send + Sync {
    /// The `k` chunks most similar to `query`, best first
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<Document>>;
}

struct IndexedChunk {
    document: Document,
    embedding: Vec<f32>,
}

/// Brute-force cosine similarity index kept in memory
pub struct InMemoryVectorStore {
    embedder: Arc<dyn Embedder>,
    entries: Vec<IndexedChunk>,
}

impl InMemoryVectorStore {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            entries: Vec::new(),
        }
    }

    /// Embed and store documents, `batch_size` texts per embedding request
    pub async fn add_documents(
        &mut self,
        documents: Vec<Document>,
        batch_size: usize,
    ) -> std::result::Result<usize, IngestionError> {
        let batch_size = batch_size.max(1);
        let total = documents.len();

        for batch in documents.chunks(batch_size) {
            let texts: Vec<String> = batch.iter().map(|d| d.page_content.clone()).collect();
            let embeddings = self.embedder.embed_batch(&texts).await?;

            if embeddings.len() != batch.len() {
                return Err(IngestionError::EmbeddingError(format!(
                    "expected {} embeddings, got {}",
                    batch.len(),
                    embeddings.len()
                )));
            }

            self.entries.extend(
                batch
                    .iter()
                    .cloned()
                    .zip(embeddings)
                    .map(|(document, embedding)| IndexedChunk { document, embedding }),
            );

            debug!(indexed = self.entries.len(), total, "Embedded batch");
        }

        info!(
            chunks = total,
            model = self.embedder.model_name(),
            "Documents added to index"
        );

        Ok(total)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Like [`DocumentIndex::similarity_search`] but keeps the scores
    pub async fn similarity_search_with_score(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<(Document, f32)>> {
        if k == 0 || self.entries.is_empty() {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query).await?;

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| Ok((i, cosine_similarity(&query_embedding, &entry.embedding)?)))
            .collect::<Result<_>>()?;

        // Stable sort: equal scores keep insertion order
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(i, score)| (self.entries[i].document.clone(), score))
            .collect())
    }
}

#[async_trait]
impl DocumentIndex for InMemoryVectorStore {
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<Document>> {
        let results = self.similarity_search_with_score(query, k).await?;
        Ok(results.into_iter().map(|(document, _)| document).collect())
    }
}

/// Cosine similarity between two vectors of the same dimension
///
/// Vectors of different lengths come from different embedding models, so
/// they are rejected rather than compared on a shared prefix.
fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(AppError::Index {
            message: format!(
                "embedding dimension mismatch: query has {}, indexed chunk has {}",
                a.len(),
                b.len()
            ),
        });
    }
    if a.is_empty() {
        return Ok(0.0);
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = (norm_a * norm_b).sqrt();
    if denom < 1e-12 {
        Ok(0.0)
    } else {
        Ok(dot / denom)
    }
}
