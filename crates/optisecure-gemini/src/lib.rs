//! Gemini integration for the OptiSecure assistant
//!
//! This crate provides the Gemini implementations of the `AnswerGenerator`
//! and `EmbeddingModel` traits.

mod client;
mod config;
mod embedding;

#[cfg(test)]
mod tests;

pub use client::{build_prompt, GeminiClient};
pub use config::GeminiConfig;
pub use embedding::{GeminiEmbedder, EMBEDDING_TASK_TYPE};

// Re-export core types for convenience
pub use optisecure_core::{AnswerGenerator, EmbeddingModel, Error, Result};
