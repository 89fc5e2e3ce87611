//! Snapshot tests for the feedback store

#[cfg(test)]
mod snapshot_tests {
    use crate::{FeedbackStore, SqliteFeedbackStore};
    use insta::assert_yaml_snapshot;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_statistics_snapshot() {
        let dir = TempDir::new().unwrap();
        let store = SqliteFeedbackStore::open(dir.path().join("feedback.db")).unwrap();

        store.add_feedback("Quelle franchise ?", "150 euros.", true).await.unwrap();
        store.add_feedback("Suis-je couvert ?", "Oui.", true).await.unwrap();
        store.add_feedback("Délai de carence ?", "Je ne sais pas.", false).await.unwrap();

        assert_yaml_snapshot!(store.get_statistics().await.unwrap(), @r###"
        positive: 2
        negative: 1
        "###);
    }

    #[tokio::test]
    async fn test_recent_feedback_snapshot() {
        let dir = TempDir::new().unwrap();
        let store = SqliteFeedbackStore::open(dir.path().join("feedback.db")).unwrap();
        store.add_feedback("Franchise vol", "Cent euros", true).await.unwrap();

        let records = store.recent_feedback(5).await.unwrap();
        assert_yaml_snapshot!(records, {
            "[].timestamp" => "[timestamp]"
        }, @r###"
        - id: 1
          question: Franchise vol
          response: Cent euros
          is_helpful: true
          timestamp: "[timestamp]"
        "###);
    }
}
