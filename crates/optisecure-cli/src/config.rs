//! Application configuration

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use optisecure_core::{Error, Result, DEFAULT_COLLECTION, DEFAULT_TOP_K};

/// Embedding model used for both the corpus and the queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderKind {
    /// Multilingual embeddings from the Gemini API
    Gemini,
    /// Local feature hashing, offline and deterministic
    Hashing,
}

impl FromStr for EmbedderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "hashing" => Ok(Self::Hashing),
            other => Err(Error::Configuration(format!(
                "unknown embedder {other:?}, expected gemini or hashing"
            ))),
        }
    }
}

impl fmt::Display for EmbedderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gemini => f.write_str("gemini"),
            Self::Hashing => f.write_str("hashing"),
        }
    }
}

/// Paths and settings of one assistant instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub documents_dir: PathBuf,
    pub index_dir: PathBuf,
    pub collection: String,
    pub feedback_db: PathBuf,
    pub chunks_file: PathBuf,
    pub embedder: EmbedderKind,
    pub top_k: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            documents_dir: PathBuf::from("documents"),
            index_dir: PathBuf::from("vector_db"),
            collection: DEFAULT_COLLECTION.to_string(),
            feedback_db: PathBuf::from("feedback.db"),
            chunks_file: PathBuf::from("chunks.json"),
            embedder: EmbedderKind::Gemini,
            top_k: DEFAULT_TOP_K,
        }
    }
}

impl AppConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Create configuration from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let path = |name: &str, default: PathBuf| lookup(name).map(PathBuf::from).unwrap_or(default);

        let embedder = match lookup("OPTISECURE_EMBEDDER") {
            Some(raw) => raw.parse()?,
            None => defaults.embedder,
        };

        let top_k = match lookup("OPTISECURE_TOP_K") {
            Some(raw) => raw.trim().parse::<usize>().map_err(|_| {
                Error::Configuration(format!(
                    "OPTISECURE_TOP_K must be a non-negative integer, got {raw:?}"
                ))
            })?,
            None => defaults.top_k,
        };

        Ok(Self {
            documents_dir: path("OPTISECURE_DOCUMENTS_DIR", defaults.documents_dir),
            index_dir: path("OPTISECURE_INDEX_DIR", defaults.index_dir),
            collection: lookup("OPTISECURE_COLLECTION").unwrap_or(defaults.collection),
            feedback_db: path("OPTISECURE_FEEDBACK_DB", defaults.feedback_db),
            chunks_file: path("OPTISECURE_CHUNKS_FILE", defaults.chunks_file),
            embedder,
            top_k,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.collection.trim().is_empty() {
            return Err(Error::Configuration("collection name must not be empty".to_string()));
        }
        Ok(())
    }
}
