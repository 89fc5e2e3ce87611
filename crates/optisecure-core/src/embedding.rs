//! Embedding model trait

use async_trait::async_trait;

use crate::Result;

/// A model turning text into fixed-size vectors.
///
/// The same instance must embed both the corpus and the queries, so that
/// both live in one embedding space. The default
/// [`embed_batch`](EmbeddingModel::embed_batch) calls
/// [`embed`](EmbeddingModel::embed) sequentially; backends with native
/// batching should override it.
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    /// Stable identifier of the model, recorded alongside indexed vectors
    fn model_id(&self) -> &str;

    /// Length of every vector produced by this model
    fn dimensions(&self) -> usize;

    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts, preserving input order
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }
}
