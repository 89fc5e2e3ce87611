//! SQLite feedback store

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{params, Connection};
use tracing::{debug, info};

use optisecure_core::{Error, FeedbackRecord, FeedbackStats, FeedbackStore, Result};

pub const FEEDBACK_TABLE: &str = "feedback";

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS feedback (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        question TEXT NOT NULL,
        response TEXT NOT NULL,
        is_helpful BOOLEAN NOT NULL,
        timestamp DATETIME DEFAULT CURRENT_TIMESTAMP
    );
";

/// Format SQLite uses for `CURRENT_TIMESTAMP`
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Append-only feedback log backed by a SQLite file
pub struct SqliteFeedbackStore {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl SqliteFeedbackStore {
    /// Open the store, creating the file and the table when absent.
    ///
    /// Safe to call on every startup: existing records are kept.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path).map_err(|e| Error::Feedback(e.to_string()))?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| Error::Feedback(e.to_string()))?;

        debug!(path = %path.display(), "opened feedback store");
        Ok(Self {
            conn: Mutex::new(conn),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::Feedback(format!("Lock error: {}", e)))
    }
}

#[async_trait]
impl FeedbackStore for SqliteFeedbackStore {
    async fn add_feedback(&self, question: &str, response: &str, is_helpful: bool) -> Result<i64> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO feedback (question, response, is_helpful) VALUES (?1, ?2, ?3)",
            params![question, response, is_helpful],
        )
        .map_err(|e| Error::Feedback(e.to_string()))?;

        let id = conn.last_insert_rowid();
        info!(id, is_helpful, "recorded feedback");
        Ok(id)
    }

    async fn get_statistics(&self) -> Result<FeedbackStats> {
        let conn = self.lock()?;
        let (positive, negative): (Option<i64>, Option<i64>) = conn
            .query_row(
                "SELECT
                    SUM(CASE WHEN is_helpful THEN 1 ELSE 0 END),
                    SUM(CASE WHEN NOT is_helpful THEN 1 ELSE 0 END)
                 FROM feedback",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map_err(|e| Error::Feedback(e.to_string()))?;

        Ok(FeedbackStats {
            positive: positive.unwrap_or(0) as u64,
            negative: negative.unwrap_or(0) as u64,
        })
    }

    async fn recent_feedback(&self, limit: usize) -> Result<Vec<FeedbackRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, question, response, is_helpful, timestamp
                 FROM feedback
                 ORDER BY id DESC
                 LIMIT ?1",
            )
            .map_err(|e| Error::Feedback(e.to_string()))?;

        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, bool>(3)?,
                    row.get::<_, Option<String>>(4)?,
                ))
            })
            .map_err(|e| Error::Feedback(e.to_string()))?;

        let mut records = Vec::new();
        for row in rows {
            let (id, question, response, is_helpful, timestamp) =
                row.map_err(|e| Error::Feedback(e.to_string()))?;

            records.push(FeedbackRecord {
                id,
                question,
                response,
                is_helpful,
                timestamp: parse_timestamp(id, timestamp.as_deref())?,
            });
        }

        Ok(records)
    }
}

fn parse_timestamp(id: i64, raw: Option<&str>) -> Result<DateTime<Utc>> {
    let raw = raw.ok_or_else(|| Error::Feedback(format!("feedback {id} has no timestamp")))?;
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| Error::Feedback(format!("feedback {id} has invalid timestamp {raw:?}: {e}")))
}
