//! Retrieval pipeline for the OptiSecure assistant
//!
//! This crate provides the document loader, the structural chunker, a local
//! embedding model, the SQLite-backed vector index and the engine tying them
//! together.

mod document_loader;
mod embedding;
mod engine;
mod text_splitter;
mod vector_store;


pub use document_loader::{parse_html, DocumentLoader};
pub use embedding::HashingEmbedder;
pub use engine::{build_context, BuildReport, Retrieval, RetrievalEngine};
pub use text_splitter::{ChunkerConfig, TextSplitter};
pub use vector_store::{IndexConfig, SqliteVectorIndex, INDEX_FILE};

// Re-export core types for convenience
pub use optisecure_core::{
    AddOutcome, Chunk, Document, DocumentMetadata, EmbeddingModel, Error, Result, SearchHit,
    VectorIndex, DEFAULT_COLLECTION, DEFAULT_TOP_K,
};
