//! Ingestion error types

use askforge_common::errors::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("PDF parse error for {path}: {message}")]
    PdfParseError { path: String, message: String },

    #[error("Chunking error: {0}")]
    ChunkingError(String),

    #[error("No documents were loaded from the PDF: {path}")]
    EmptyDocument { path: String },

    #[error("Embedding error: {0}")]
    EmbeddingError(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<AppError> for IngestionError {
    fn from(e: AppError) -> Self {
        IngestionError::EmbeddingError(e.to_string())
    }
}

impl From<IngestionError> for AppError {
    fn from(e: IngestionError) -> Self {
        AppError::Index {
            message: e.to_string(),
        }
    }
}
