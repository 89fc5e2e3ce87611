//! SQLite-backed persistent vector index
//!
//! Collections live in a single database file inside the index directory.
//! Vectors are stored as little-endian `f32` blobs and searched by brute-force
//! cosine similarity.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::{params, Connection, ErrorCode};
use tracing::{debug, info, warn};

use optisecure_core::{
    AddOutcome, Chunk, DocumentMetadata, EmbeddingModel, Error, Result, SearchHit, VectorIndex,
    DEFAULT_COLLECTION,
};

/// Name of the database file inside the index directory
pub const INDEX_FILE: &str = "index.sqlite3";

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS collections (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        embedding_model TEXT,
        dimension INTEGER,
        fingerprint TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );
    CREATE TABLE IF NOT EXISTS embeddings (
        collection_id INTEGER NOT NULL REFERENCES collections(id),
        id TEXT NOT NULL,
        seq INTEGER NOT NULL,
        embedding BLOB NOT NULL,
        document TEXT NOT NULL,
        metadata TEXT NOT NULL DEFAULT '{}',
        PRIMARY KEY (collection_id, id)
    );
";

const REQUIRED_TABLES: [&str; 2] = ["collections", "embeddings"];

/// Where the index lives and which collection to attach to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexConfig {
    pub directory: PathBuf,
    pub collection: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("vector_db"),
            collection: DEFAULT_COLLECTION.to_string(),
        }
    }
}

impl IndexConfig {
    pub fn new(directory: impl Into<PathBuf>, collection: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            collection: collection.into(),
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.directory.join(INDEX_FILE)
    }
}

/// Persistent, populate-once vector index
pub struct SqliteVectorIndex {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    collection: String,
    collection_id: i64,
    embedder: Arc<dyn EmbeddingModel>,
}

impl SqliteVectorIndex {
    /// Open the index, creating the directory, database and collection when
    /// absent and reattaching to existing data otherwise.
    ///
    /// Fails with [`Error::CorruptIndex`] when the database is unreadable or
    /// its schema is incomplete, and with [`Error::EmbeddingMismatch`] when
    /// the collection was built with another embedding model.
    pub fn open(config: &IndexConfig, embedder: Arc<dyn EmbeddingModel>) -> Result<Self> {
        fs::create_dir_all(&config.directory)?;
        let db_path = config.database_path();

        let conn = Connection::open(&db_path).map_err(|e| storage_error(&db_path, e))?;
        ensure_schema(&conn, &db_path)?;

        conn.execute(
            "INSERT OR IGNORE INTO collections (name) VALUES (?1)",
            params![config.collection],
        )
        .map_err(|e| storage_error(&db_path, e))?;

        let (collection_id, model, dimension): (i64, Option<String>, Option<i64>) = conn
            .query_row(
                "SELECT id, embedding_model, dimension FROM collections WHERE name = ?1",
                params![config.collection],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .map_err(|e| storage_error(&db_path, e))?;

        if let (Some(model), Some(dimension)) = (model, dimension) {
            let dimension = dimension as usize;
            if model != embedder.model_id() || dimension != embedder.dimensions() {
                return Err(Error::EmbeddingMismatch {
                    expected: format!("{model} ({dimension} dims)"),
                    found: format!("{} ({} dims)", embedder.model_id(), embedder.dimensions()),
                });
            }
        }

        debug!(
            path = %db_path.display(),
            collection = %config.collection,
            "opened vector index"
        );

        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
            collection: config.collection.clone(),
            collection_id,
            embedder,
        })
    }

    /// Delete the index files in `directory`.
    ///
    /// Works on corrupt databases; the next [`open`](Self::open) starts from
    /// an empty index.
    pub fn destroy(directory: impl AsRef<Path>) -> Result<()> {
        let db_path = directory.as_ref().join(INDEX_FILE);
        for suffix in ["", "-journal", "-wal", "-shm"] {
            let mut name = db_path.clone().into_os_string();
            name.push(suffix);
            let path = PathBuf::from(name);
            if path.exists() {
                fs::remove_file(&path)?;
            }
        }
        warn!(path = %db_path.display(), "vector index destroyed");
        Ok(())
    }

    pub fn database_path(&self) -> &Path {
        &self.db_path
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingModel> {
        &self.embedder
    }

    /// Fingerprint of the corpus the collection was built from
    pub fn fingerprint(&self) -> Result<Option<String>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT fingerprint FROM collections WHERE id = ?1",
            params![self.collection_id],
            |row| row.get(0),
        )
        .map_err(|e| storage_error(&self.db_path, e))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::VectorStore(format!("Lock error: {}", e)))
    }

    fn count_entries(&self, conn: &Connection) -> Result<usize> {
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM embeddings WHERE collection_id = ?1",
                params![self.collection_id],
                |row| row.get(0),
            )
            .map_err(|e| storage_error(&self.db_path, e))?;
        Ok(count as usize)
    }

    fn check_dimensions(&self, embedding: &[f32]) -> Result<()> {
        if embedding.len() != self.embedder.dimensions() {
            return Err(Error::Embedding(format!(
                "model {} returned {} dimensions, expected {}",
                self.embedder.model_id(),
                embedding.len(),
                self.embedder.dimensions()
            )));
        }
        Ok(())
    }

    fn skip_populated(&self, existing: usize, chunks: &[Chunk]) -> Result<AddOutcome> {
        let incoming = corpus_fingerprint(chunks);
        if self.fingerprint()?.as_deref() == Some(incoming.as_str()) {
            info!(
                collection = %self.collection,
                existing,
                "collection already populated, skipping ingestion"
            );
        } else {
            warn!(
                collection = %self.collection,
                existing,
                "collection already populated with a different corpus, skipping ingestion; reset the index to re-ingest"
            );
        }
        Ok(AddOutcome::Skipped { existing })
    }
}

#[async_trait]
impl VectorIndex for SqliteVectorIndex {
    async fn add_documents(&self, chunks: &[Chunk]) -> Result<AddOutcome> {
        let existing = self.count().await?;
        if existing > 0 {
            return self.skip_populated(existing, chunks);
        }
        if chunks.is_empty() {
            return Ok(AddOutcome::Inserted(0));
        }

        let texts: Vec<&str> = chunks.iter().map(|chunk| chunk.text.as_str()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(Error::Embedding(format!(
                "model {} returned {} embeddings for {} chunks",
                self.embedder.model_id(),
                embeddings.len(),
                chunks.len()
            )));
        }
        for embedding in &embeddings {
            self.check_dimensions(embedding)?;
        }

        let mut conn = self.lock()?;

        // Another writer may have populated the collection while we embedded.
        let existing = self.count_entries(&conn)?;
        if existing > 0 {
            drop(conn);
            return self.skip_populated(existing, chunks);
        }

        let tx = conn
            .transaction()
            .map_err(|e| storage_error(&self.db_path, e))?;

        for (seq, (chunk, embedding)) in chunks.iter().zip(&embeddings).enumerate() {
            let metadata = serde_json::to_string(&chunk.metadata)
                .map_err(|e| Error::Serialization(e.to_string()))?;

            tx.execute(
                "INSERT INTO embeddings (collection_id, id, seq, embedding, document, metadata)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    self.collection_id,
                    format!("doc_{seq}"),
                    seq as i64,
                    encode_embedding(embedding),
                    chunk.text,
                    metadata,
                ],
            )
            .map_err(|e| storage_error(&self.db_path, e))?;
        }

        tx.execute(
            "UPDATE collections SET embedding_model = ?1, dimension = ?2, fingerprint = ?3 WHERE id = ?4",
            params![
                self.embedder.model_id(),
                self.embedder.dimensions() as i64,
                corpus_fingerprint(chunks),
                self.collection_id,
            ],
        )
        .map_err(|e| storage_error(&self.db_path, e))?;

        tx.commit().map_err(|e| storage_error(&self.db_path, e))?;

        info!(
            collection = %self.collection,
            count = chunks.len(),
            model = %self.embedder.model_id(),
            "indexed chunks"
        );
        Ok(AddOutcome::Inserted(chunks.len()))
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query).await?;
        self.check_dimensions(&query_embedding)?;

        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, seq, embedding, document, metadata
                 FROM embeddings
                 WHERE collection_id = ?1",
            )
            .map_err(|e| storage_error(&self.db_path, e))?;

        let rows = stmt
            .query_map(params![self.collection_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, Vec<u8>>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })
            .map_err(|e| storage_error(&self.db_path, e))?;

        let mut scored: Vec<(i64, SearchHit)> = Vec::new();
        for row in rows {
            let (id, seq, blob, text, metadata) = row.map_err(|e| storage_error(&self.db_path, e))?;
            let metadata: DocumentMetadata = serde_json::from_str(&metadata)
                .map_err(|e| Error::Serialization(format!("metadata of {id}: {e}")))?;
            if blob.len() != 4 * query_embedding.len() {
                return Err(Error::CorruptIndex {
                    path: self.db_path.clone(),
                    reason: format!(
                        "embedding of {id} has {} bytes, expected {}",
                        blob.len(),
                        4 * query_embedding.len()
                    ),
                });
            }
            let score = cosine_similarity(&query_embedding, &decode_embedding(&blob));

            scored.push((
                seq,
                SearchHit {
                    id,
                    text,
                    metadata,
                    score,
                },
            ));
        }

        scored.sort_by(|(seq_a, a), (seq_b, b)| {
            b.score.total_cmp(&a.score).then(seq_a.cmp(seq_b))
        });
        scored.truncate(k);

        debug!(
            collection = %self.collection,
            k,
            hits = scored.len(),
            "searched vector index"
        );
        Ok(scored.into_iter().map(|(_, hit)| hit).collect())
    }

    async fn count(&self) -> Result<usize> {
        let conn = self.lock()?;
        self.count_entries(&conn)
    }

    fn collection_name(&self) -> &str {
        &self.collection
    }
}

/// Create the schema on a fresh database, reject a partial one
fn ensure_schema(conn: &Connection, db_path: &Path) -> Result<()> {
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'table'")
        .map_err(|e| storage_error(db_path, e))?;
    let tables = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(|e| storage_error(db_path, e))?
        .collect::<rusqlite::Result<Vec<String>>>()
        .map_err(|e| storage_error(db_path, e))?;

    let missing: Vec<&str> = REQUIRED_TABLES
        .iter()
        .copied()
        .filter(|table| !tables.iter().any(|name| name == table))
        .collect();

    match missing.len() {
        0 => Ok(()),
        n if n == REQUIRED_TABLES.len() => conn
            .execute_batch(SCHEMA)
            .map_err(|e| storage_error(db_path, e)),
        _ => Err(Error::CorruptIndex {
            path: db_path.to_path_buf(),
            reason: format!("no such table: {}", missing.join(", ")),
        }),
    }
}

/// Map SQLite failures, singling out the ones that call for a reset
fn storage_error(db_path: &Path, err: rusqlite::Error) -> Error {
    let corrupt = match &err {
        rusqlite::Error::SqliteFailure(failure, message) => {
            matches!(
                failure.code,
                ErrorCode::NotADatabase | ErrorCode::DatabaseCorrupt
            ) || message
                .as_deref()
                .is_some_and(|m| m.starts_with("no such table"))
        }
        _ => false,
    };

    if corrupt {
        Error::CorruptIndex {
            path: db_path.to_path_buf(),
            reason: err.to_string(),
        }
    } else {
        Error::VectorStore(err.to_string())
    }
}

fn corpus_fingerprint(chunks: &[Chunk]) -> String {
    let mut context = md5::Context::new();
    for chunk in chunks {
        context.consume(chunk.metadata.source.as_bytes());
        context.consume([0u8]);
        context.consume(chunk.text.as_bytes());
        context.consume([0u8]);
    }
    format!("{:x}", context.compute())
}

fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn decode_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm_a * norm_b;

    if denom <= f32::EPSILON {
        0.0
    } else {
        dot / denom
    }
}
