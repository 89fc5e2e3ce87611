//! Feedback persistence for the OptiSecure assistant

mod store;

#[cfg(test)]
mod tests;

pub use store::{SqliteFeedbackStore, FEEDBACK_TABLE};

// Re-export core types for convenience
pub use optisecure_core::{Error, FeedbackRecord, FeedbackStats, FeedbackStore, Result};
