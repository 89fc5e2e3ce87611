//! Answer generation trait

use async_trait::async_trait;

use crate::Result;

/// Turns a question and its retrieved context into a natural-language answer
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Generate an answer to `query` grounded on `context`
    async fn generate(&self, query: &str, context: &str) -> Result<String>;

    /// Get the model ID being used
    fn model_id(&self) -> &str;
}
