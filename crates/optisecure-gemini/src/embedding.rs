//! Gemini embedding model

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use optisecure_core::{EmbeddingModel, Error, Result};

use crate::client::{http_client, post_json, Content, Part};
use crate::config::GeminiConfig;

/// Task type shared by corpus and query embeddings
pub const EMBEDDING_TASK_TYPE: &str = "SEMANTIC_SIMILARITY";

/// Largest batch accepted by `batchEmbedContents`
const MAX_BATCH: usize = 100;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EmbedContentRequest {
    model: String,
    content: Content,
    task_type: &'static str,
    output_dimensionality: usize,
}

#[derive(Debug, Serialize)]
pub(crate) struct BatchEmbedContentsRequest {
    requests: Vec<EmbedContentRequest>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContentEmbedding {
    #[serde(default)]
    values: Vec<f32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BatchEmbedContentsResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

/// Multilingual embedding model served by the Gemini API
pub struct GeminiEmbedder {
    config: GeminiConfig,
    client: Client,
}

impl GeminiEmbedder {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        if config.embedding_dimensions == 0 {
            return Err(Error::Configuration(
                "embedding dimensions must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            config,
            client: http_client()?,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(GeminiConfig::from_env()?)
    }

    pub(crate) fn request(&self, text: &str) -> EmbedContentRequest {
        EmbedContentRequest {
            model: format!("models/{}", self.config.embedding_model),
            content: Content {
                role: None,
                parts: vec![Part {
                    text: text.to_string(),
                }],
            },
            task_type: EMBEDDING_TASK_TYPE,
            output_dimensionality: self.config.embedding_dimensions,
        }
    }

    pub(crate) fn check(&self, values: Vec<f32>) -> Result<Vec<f32>> {
        if values.len() != self.config.embedding_dimensions {
            return Err(Error::Embedding(format!(
                "model {} returned {} dimensions, expected {}",
                self.config.embedding_model,
                values.len(),
                self.config.embedding_dimensions
            )));
        }
        Ok(values)
    }
}

#[async_trait]
impl EmbeddingModel for GeminiEmbedder {
    fn model_id(&self) -> &str {
        &self.config.embedding_model
    }

    fn dimensions(&self) -> usize {
        self.config.embedding_dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = self
            .config
            .model_url(&self.config.embedding_model, "embedContent");
        let response: EmbedContentResponse = post_json(
            &self.client,
            &url,
            &self.config.api_key,
            &self.request(text),
            Error::Embedding,
        )
        .await?;

        self.check(response.embedding.values)
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let url = self
            .config
            .model_url(&self.config.embedding_model, "batchEmbedContents");
        let mut embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(MAX_BATCH) {
            let request = BatchEmbedContentsRequest {
                requests: batch.iter().map(|text| self.request(text)).collect(),
            };
            let response: BatchEmbedContentsResponse = post_json(
                &self.client,
                &url,
                &self.config.api_key,
                &request,
                Error::Embedding,
            )
            .await?;

            if response.embeddings.len() != batch.len() {
                return Err(Error::Embedding(format!(
                    "model {} returned {} embeddings for {} texts",
                    self.config.embedding_model,
                    response.embeddings.len(),
                    batch.len()
                )));
            }
            for embedding in response.embeddings {
                embeddings.push(self.check(embedding.values)?);
            }
            debug!(count = batch.len(), "embedded batch");
        }

        Ok(embeddings)
    }
}
