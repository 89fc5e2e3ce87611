//! Gemini answer generation client

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use optisecure_core::{AnswerGenerator, Error, Result};

use crate::config::GeminiConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Gemini client answering questions from retrieved context
pub struct GeminiClient {
    config: GeminiConfig,
    client: Client,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Part {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Candidate {
    pub content: Option<Content>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

impl GeminiClient {
    /// Create a new Gemini client from configuration
    pub fn new(config: GeminiConfig) -> Result<Self> {
        Ok(Self {
            config,
            client: http_client()?,
        })
    }

    /// Create a new Gemini client from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(GeminiConfig::from_env()?)
    }

    /// Set the model to use for generation
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }
}

#[async_trait]
impl AnswerGenerator for GeminiClient {
    async fn generate(&self, query: &str, context: &str) -> Result<String> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: build_prompt(query, context),
                }],
            }],
        };

        let url = self.config.model_url(&self.config.model, "generateContent");
        let response: GenerateContentResponse = post_json(
            &self.client,
            &url,
            &self.config.api_key,
            &request,
            Error::Generation,
        )
        .await?;

        let answer = extract_answer(response)?;
        debug!(model = %self.config.model, chars = answer.len(), "generated answer");
        Ok(answer)
    }

    fn model_id(&self) -> &str {
        &self.config.model
    }
}

/// Prompt framing the model as an insurance-document assistant
pub fn build_prompt(query: &str, context: &str) -> String {
    let context = if context.trim().is_empty() {
        "(aucun passage pertinent)"
    } else {
        context.trim()
    };

    format!(
        "En tant qu'assistant spécialisé dans les documents d'assurance, utilise le contexte suivant \
         pour répondre à la question. Réponds en français, de manière concise et précise. \
         Si le contexte ne permet pas de répondre, dis-le.\n\n\
         Contexte:\n{}\n\n\
         Question: {}\n",
        context,
        query.trim()
    )
}

pub(crate) fn extract_answer(response: GenerateContentResponse) -> Result<String> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts.into_iter().map(|part| part.text).collect())
        .unwrap_or_default();

    let text = text.trim();
    if text.is_empty() {
        return Err(Error::Generation("Empty response from Gemini API".to_string()));
    }
    Ok(text.to_string())
}

pub(crate) fn http_client() -> Result<Client> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| Error::Network(e.to_string()))
}

/// POST `body` as JSON and decode the response.
///
/// Transport failures become [`Error::Network`]; API failures go through
/// `api_error`.
pub(crate) async fn post_json<B, R>(
    client: &Client,
    url: &str,
    api_key: &str,
    body: &B,
    api_error: fn(String) -> Error,
) -> Result<R>
where
    B: Serialize + ?Sized,
    R: DeserializeOwned,
{
    let response = client
        .post(url)
        .header("Content-Type", "application/json")
        .header("x-goog-api-key", api_key)
        .json(body)
        .send()
        .await
        .map_err(|e| Error::Network(e.to_string()))?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(api_error(format!(
            "Gemini API request failed with status {}: {}",
            status, error_text
        )));
    }

    let text = response
        .text()
        .await
        .map_err(|e| Error::Network(e.to_string()))?;
    serde_json::from_str(&text)
        .map_err(|e| api_error(format!("Unexpected Gemini API response: {}", e)))
}
