//! Vector index trait and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Chunk, DocumentMetadata, Result};

/// Number of hits returned when the caller does not ask for a specific count
pub const DEFAULT_TOP_K: usize = 3;

/// Collection used when none is configured
pub const DEFAULT_COLLECTION: &str = "documents";

/// One ranked match returned by a similarity search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub text: String,
    pub metadata: DocumentMetadata,
    /// Cosine similarity to the query, higher is closer
    pub score: f32,
}

impl SearchHit {
    /// Cosine distance to the query, lower is closer
    pub fn distance(&self) -> f32 {
        1.0 - self.score
    }
}

/// What a call to [`VectorIndex::add_documents`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddOutcome {
    /// The collection was empty and this many entries were written
    Inserted(usize),
    /// The collection already held entries; nothing was written
    Skipped { existing: usize },
}

impl AddOutcome {
    /// Number of entries written by the call
    pub fn inserted(&self) -> usize {
        match self {
            AddOutcome::Inserted(n) => *n,
            AddOutcome::Skipped { .. } => 0,
        }
    }
}

/// Trait for persistent similarity indexes over chunks
///
/// Collections are populate-once: the first non-empty batch written to an
/// empty collection wins, and later calls to
/// [`add_documents`](VectorIndex::add_documents) leave it untouched.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Embed and store `chunks` unless the collection already has entries
    async fn add_documents(&self, chunks: &[Chunk]) -> Result<AddOutcome>;

    /// Return at most `k` entries ranked by similarity to `query`
    async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>>;

    /// Number of entries in the collection
    async fn count(&self) -> Result<usize>;

    /// Name of the collection this index is attached to
    fn collection_name(&self) -> &str;
}
