//! Feedback store trait and types

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;

/// A single helpful / not-helpful vote on an answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub id: i64,
    pub question: String,
    pub response: String,
    pub is_helpful: bool,
    pub timestamp: DateTime<Utc>,
}

/// Aggregate of all votes in the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackStats {
    pub positive: u64,
    pub negative: u64,
}

impl FeedbackStats {
    pub fn total(&self) -> u64 {
        self.positive + self.negative
    }

    /// Share of positive votes as a percentage, `None` without any vote
    pub fn satisfaction_rate(&self) -> Option<f64> {
        match self.total() {
            0 => None,
            total => Some(self.positive as f64 / total as f64 * 100.0),
        }
    }
}

impl From<FeedbackStats> for (u64, u64) {
    fn from(stats: FeedbackStats) -> Self {
        (stats.positive, stats.negative)
    }
}

/// Append-only log of user feedback
#[async_trait]
pub trait FeedbackStore: Send + Sync {
    /// Append one vote and return its id
    async fn add_feedback(&self, question: &str, response: &str, is_helpful: bool) -> Result<i64>;

    /// Count positive and negative votes; `(0, 0)` for an empty log
    async fn get_statistics(&self) -> Result<FeedbackStats>;

    /// Most recent votes first
    async fn recent_feedback(&self, limit: usize) -> Result<Vec<FeedbackRecord>>;
}
