//! Retrieval engine wiring the loader, the chunker and the vector index

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use optisecure_core::{AddOutcome, Error, Result, SearchHit, VectorIndex};

use crate::{DocumentLoader, TextSplitter};

/// What a call to [`RetrievalEngine::build_index`] did
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildReport {
    pub documents: usize,
    pub chunks: usize,
    pub outcome: AddOutcome,
}

/// Hits for a query together with the rendered context
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Retrieval {
    pub hits: Vec<SearchHit>,
    pub context: String,
}

/// Retrieval engine over a persistent vector index
pub struct RetrievalEngine<V: VectorIndex> {
    loader: DocumentLoader,
    splitter: TextSplitter,
    index: Arc<V>,
    chunks_file: Option<PathBuf>,
}

impl<V: VectorIndex> RetrievalEngine<V> {
    /// Create a new retrieval engine
    pub fn new(loader: DocumentLoader, splitter: TextSplitter, index: Arc<V>) -> Self {
        Self {
            loader,
            splitter,
            index,
            chunks_file: None,
        }
    }

    /// Persist the chunk set to `path` on every build
    pub fn with_chunks_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.chunks_file = Some(path.into());
        self
    }

    pub fn index(&self) -> &Arc<V> {
        &self.index
    }

    pub fn loader(&self) -> &DocumentLoader {
        &self.loader
    }

    pub fn chunks_file(&self) -> Option<&Path> {
        self.chunks_file.as_deref()
    }

    /// Load, chunk and index the corpus.
    ///
    /// The corpus is always read and chunked, so the chunk file is refreshed
    /// even when the collection is already populated and the index skips
    /// the batch.
    pub async fn build_index(&self) -> Result<BuildReport> {
        let documents = self.loader.load_documents()?;

        let chunks = match &self.chunks_file {
            Some(path) => self.splitter.split_and_persist(&documents, path)?,
            None => self.splitter.split_documents(&documents),
        };

        let outcome = self.index.add_documents(&chunks).await?;

        info!(
            documents = documents.len(),
            chunks = chunks.len(),
            inserted = outcome.inserted(),
            collection = %self.index.collection_name(),
            "index build finished"
        );

        Ok(BuildReport {
            documents: documents.len(),
            chunks: chunks.len(),
            outcome,
        })
    }

    /// Search the index and render the hits as generation context
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Retrieval> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::InvalidInput("query must not be empty".to_string()));
        }

        let hits = self.index.search(query, k).await?;
        let context = build_context(&hits);

        Ok(Retrieval { hits, context })
    }
}

/// Render hits as a numbered list tagged with their source file
pub fn build_context(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return String::new();
    }

    let mut context = String::new();
    for (i, hit) in hits.iter().enumerate() {
        context.push_str(&format!("{}. [{}] ", i + 1, hit.metadata.source));
        context.push_str(&hit.text);
        context.push_str("\n\n");
    }

    context.truncate(context.trim_end().len());
    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{HashingEmbedder, IndexConfig, SqliteVectorIndex};
    use optisecure_core::DocumentMetadata;
    use std::fs;
    use tempfile::TempDir;

    fn engine(root: &TempDir) -> RetrievalEngine<SqliteVectorIndex> {
        let index = SqliteVectorIndex::open(
            &IndexConfig::new(root.path().join("vector_db"), "documents"),
            Arc::new(HashingEmbedder::new()),
        )
        .unwrap();

        RetrievalEngine::new(
            DocumentLoader::new(root.path().join("documents")),
            TextSplitter::default(),
            Arc::new(index),
        )
    }

    fn write_corpus(root: &TempDir) {
        let dir = root.path().join("documents");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("habitation.html"),
            "<html><body><p>1. Dégâts des eaux couverts\n\n2. Vol avec effraction</p></body></html>",
        )
        .unwrap();
    }

    #[tokio::test]
    async fn test_build_index_then_skip() {
        let root = TempDir::new().unwrap();
        write_corpus(&root);
        let engine = engine(&root);

        let first = engine.build_index().await.unwrap();
        assert_eq!(first.documents, 1);
        assert_eq!(first.chunks, 2);
        assert_eq!(first.outcome, AddOutcome::Inserted(2));

        let second = engine.build_index().await.unwrap();
        assert_eq!(second.outcome, AddOutcome::Skipped { existing: 2 });
        assert_eq!(engine.index().count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_build_index_writes_chunks_file() {
        let root = TempDir::new().unwrap();
        write_corpus(&root);
        let chunks_file = root.path().join("chunks.json");
        let engine = engine(&root).with_chunks_file(&chunks_file);

        engine.build_index().await.unwrap();

        let written = fs::read_to_string(&chunks_file).unwrap();
        assert!(written.contains("\"page_content\": \"1. Dégâts des eaux couverts\""));
        assert_eq!(engine.chunks_file(), Some(chunks_file.as_path()));
    }

    #[tokio::test]
    async fn test_build_index_fails_on_missing_directory() {
        let root = TempDir::new().unwrap();
        let result = engine(&root).build_index().await;
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[tokio::test]
    async fn test_retrieve_renders_context() {
        let root = TempDir::new().unwrap();
        write_corpus(&root);
        let engine = engine(&root);
        engine.build_index().await.unwrap();

        let retrieval = engine.retrieve("effraction", 1).await.unwrap();
        assert_eq!(retrieval.hits.len(), 1);
        assert_eq!(
            retrieval.context,
            "1. [habitation.html] 2. Vol avec effraction"
        );
    }

    #[tokio::test]
    async fn test_retrieve_rejects_blank_query() {
        let root = TempDir::new().unwrap();
        let result = engine(&root).retrieve("   ", 3).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_build_context_empty() {
        assert_eq!(build_context(&[]), "");
    }

    #[test]
    fn test_build_context_numbering() {
        let hits = vec![
            SearchHit {
                id: "doc_0".to_string(),
                text: "Premier".to_string(),
                metadata: DocumentMetadata::assurance("a.html"),
                score: 0.9,
            },
            SearchHit {
                id: "doc_1".to_string(),
                text: "Second".to_string(),
                metadata: DocumentMetadata::assurance("b.html"),
                score: 0.4,
            },
        ];

        assert_eq!(
            build_context(&hits),
            "1. [a.html] Premier\n\n2. [b.html] Second"
        );
    }
}
