//! Composition root wiring the retrieval engine, the generator and the
//! feedback store

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use optisecure_core::{
    AnswerGenerator, EmbeddingModel, Error, FeedbackStats, FeedbackStore, Result, SearchHit,
};
use optisecure_feedback::SqliteFeedbackStore;
use optisecure_gemini::{GeminiClient, GeminiConfig, GeminiEmbedder};
use optisecure_rag::{
    BuildReport, DocumentLoader, HashingEmbedder, IndexConfig, Retrieval, RetrievalEngine,
    SqliteVectorIndex, TextSplitter,
};

use crate::config::{AppConfig, EmbedderKind};

/// A generated answer and the passages it was grounded on
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub query: String,
    pub text: String,
    pub hits: Vec<SearchHit>,
}

/// The assistant, built once per process
pub struct Assistant {
    config: AppConfig,
    embedder: Arc<dyn EmbeddingModel>,
    engine: RetrievalEngine<SqliteVectorIndex>,
    generator: Option<Arc<dyn AnswerGenerator>>,
    feedback: Arc<dyn FeedbackStore>,
}

impl Assistant {
    /// Assemble the assistant from explicit collaborators.
    ///
    /// A corrupt index found while opening is destroyed and recreated empty.
    pub fn new(
        config: AppConfig,
        embedder: Arc<dyn EmbeddingModel>,
        generator: Option<Arc<dyn AnswerGenerator>>,
        feedback: Arc<dyn FeedbackStore>,
    ) -> Result<Self> {
        config.validate()?;

        let engine = match open_engine(&config, embedder.clone()) {
            Err(e) if e.is_corrupt_index() => {
                warn!(error = %e, "vector index is corrupt, resetting it");
                SqliteVectorIndex::destroy(&config.index_dir)?;
                open_engine(&config, embedder.clone())?
            }
            other => other?,
        };

        Ok(Self {
            config,
            embedder,
            engine,
            generator,
            feedback,
        })
    }

    /// Assemble the assistant with the Gemini collaborators and the SQLite
    /// stores named in `config`.
    ///
    /// The Gemini API key is only required when Gemini embeddings are
    /// selected; without it the assistant can still index and search.
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let gemini = GeminiConfig::from_env();

        let embedder: Arc<dyn EmbeddingModel> = match config.embedder {
            EmbedderKind::Gemini => Arc::new(GeminiEmbedder::from_env()?),
            EmbedderKind::Hashing => Arc::new(HashingEmbedder::new()),
        };

        let generator: Option<Arc<dyn AnswerGenerator>> = match gemini {
            Ok(gemini) => Some(Arc::new(GeminiClient::new(gemini)?)),
            Err(e) => {
                debug!(error = %e, "answer generation unavailable");
                None
            }
        };

        let feedback = Arc::new(SqliteFeedbackStore::open(&config.feedback_db)?);

        Self::new(config, embedder, generator, feedback)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn engine(&self) -> &RetrievalEngine<SqliteVectorIndex> {
        &self.engine
    }

    /// Build the index from the documents directory.
    ///
    /// Skipped when the collection is already populated. A corrupt index is
    /// destroyed and rebuilt once.
    pub async fn ingest(&mut self) -> Result<BuildReport> {
        match self.engine.build_index().await {
            Err(e) if e.is_corrupt_index() => self.rebuild_after(&e).await,
            other => other,
        }
    }

    async fn rebuild_after(&mut self, err: &Error) -> Result<BuildReport> {
        warn!(error = %err, "vector index is corrupt, rebuilding it from scratch");
        self.reset()?;
        self.engine.build_index().await
    }

    /// Delete the vector index and reopen it empty
    pub fn reset(&mut self) -> Result<()> {
        SqliteVectorIndex::destroy(&self.config.index_dir)?;
        self.engine = open_engine(&self.config, self.embedder.clone())?;
        info!(path = %self.config.index_dir.display(), "vector index reset");
        Ok(())
    }

    /// Retrieve the passages closest to `query`.
    ///
    /// An index found corrupt at query time is rebuilt once and the search
    /// retried.
    pub async fn search(&mut self, query: &str, k: usize) -> Result<Retrieval> {
        match self.engine.retrieve(query, k).await {
            Err(e) if e.is_corrupt_index() => {
                self.rebuild_after(&e).await?;
                self.engine.retrieve(query, k).await
            }
            other => other,
        }
    }

    /// Answer `query` from the top passages of the index
    pub async fn ask(&mut self, query: &str) -> Result<Answer> {
        let generator = self.generator.clone().ok_or_else(|| {
            Error::Configuration(
                "answer generation needs GEMINI_API_KEY or GOOGLE_API_KEY".to_string(),
            )
        })?;

        let top_k = self.config.top_k;
        let retrieval = self.search(query, top_k).await?;
        let text = generator.generate(query.trim(), &retrieval.context).await?;

        Ok(Answer {
            query: query.trim().to_string(),
            text,
            hits: retrieval.hits,
        })
    }

    pub async fn record_feedback(&self, answer: &Answer, helpful: bool) -> Result<i64> {
        self.feedback
            .add_feedback(&answer.query, &answer.text, helpful)
            .await
    }

    pub async fn statistics(&self) -> Result<FeedbackStats> {
        self.feedback.get_statistics().await
    }
}

fn open_engine(
    config: &AppConfig,
    embedder: Arc<dyn EmbeddingModel>,
) -> Result<RetrievalEngine<SqliteVectorIndex>> {
    let index = SqliteVectorIndex::open(
        &IndexConfig::new(&config.index_dir, &config.collection),
        embedder,
    )?;

    Ok(RetrievalEngine::new(
        DocumentLoader::new(&config.documents_dir),
        TextSplitter::default(),
        Arc::new(index),
    )
    .with_chunks_file(&config.chunks_file))
}
