//! Error types for the OptiSecure assistant

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for the OptiSecure assistant
#[derive(Error, Debug)]
pub enum Error {
    #[error("Document loader error: {0}")]
    DocumentLoader(String),

    #[error("Chunker error: {0}")]
    Chunker(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    /// The persisted index exists but cannot be used as-is. Callers recover
    /// by destroying the index directory and rebuilding it.
    #[error("Corrupt vector index at {}: {reason}", path.display())]
    CorruptIndex { path: PathBuf, reason: String },

    #[error("Embedding mismatch: collection was built with {expected}, index opened with {found}")]
    EmbeddingMismatch { expected: String, found: String },

    #[error("Feedback store error: {0}")]
    Feedback(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the error means the on-disk index must be reset before use
    pub fn is_corrupt_index(&self) -> bool {
        matches!(self, Error::CorruptIndex { .. })
    }
}
