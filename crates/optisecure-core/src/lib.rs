//! Core traits and types for the OptiSecure insurance assistant
//!
//! This crate defines the data model shared by the indexing pipeline, the
//! feedback log and the answer generator. It also provides the
//! capability-facing traits (embedding model, vector index, feedback store,
//! generator) so each component can be swapped out in tests.

pub mod document;
pub mod embedding;
pub mod error;
pub mod feedback;
pub mod generator;
pub mod vector_store;


pub use document::{Chunk, Document, DocumentMetadata, DOCUMENT_TYPE};
pub use embedding::EmbeddingModel;
pub use error::{Error, Result};
pub use feedback::{FeedbackRecord, FeedbackStats, FeedbackStore};
pub use generator::AnswerGenerator;
pub use vector_store::{AddOutcome, SearchHit, VectorIndex, DEFAULT_COLLECTION, DEFAULT_TOP_K};
