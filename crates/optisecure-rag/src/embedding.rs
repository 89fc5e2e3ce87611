//! Local embedding model based on hashed word features

use async_trait::async_trait;

use optisecure_core::{EmbeddingModel, Error, Result};

/// Offline embedding model hashing words and word pairs into a fixed-size
/// vector.
///
/// Feature slots come from MD5 digests, so vectors are identical across
/// platforms and toolchain versions and stay valid on disk.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
    model_id: String,
}

impl HashingEmbedder {
    pub const DEFAULT_DIMENSIONS: usize = 384;

    /// Create an embedder producing [`Self::DEFAULT_DIMENSIONS`]-long vectors
    pub fn new() -> Self {
        Self::build(Self::DEFAULT_DIMENSIONS)
    }

    /// Create an embedder with a custom vector length
    pub fn with_dimensions(dimensions: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(Error::InvalidInput(
                "embedding dimensions must be greater than zero".to_string(),
            ));
        }
        Ok(Self::build(dimensions))
    }

    fn build(dimensions: usize) -> Self {
        Self {
            dimensions,
            model_id: format!("hashing-md5-{dimensions}"),
        }
    }

    /// Two slots derived from independent halves of the feature digest
    fn slots(&self, feature: &str) -> (usize, usize) {
        let digest = md5::compute(feature.as_bytes()).0;
        let (head, tail) = digest.split_at(8);
        let head = u64::from_le_bytes(head.try_into().unwrap_or_default());
        let tail = u64::from_le_bytes(tail.try_into().unwrap_or_default());
        let dimensions = self.dimensions as u64;
        ((head % dimensions) as usize, (tail % dimensions) as usize)
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let words = tokenize(text);
        let mut embedding = vec![0.0f32; self.dimensions];

        for word in &words {
            let (primary, secondary) = self.slots(word);
            embedding[primary] += 1.0;
            embedding[secondary] += 0.5;
        }

        for pair in words.windows(2) {
            let (slot, _) = self.slots(&format!("{} {}", pair[0], pair[1]));
            embedding[slot] += 0.8;
        }

        let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in embedding.iter_mut() {
                *value /= magnitude;
            }
        }

        embedding
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

/// Lowercased alphanumeric words
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(|word| word.to_lowercase())
        .collect()
}

#[async_trait]
impl EmbeddingModel for HashingEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.vectorize(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn test_tokenize_handles_accents_and_punctuation() {
        assert_eq!(
            tokenize("Dégâts des eaux: FRANCHISE, 2 ans."),
            vec!["dégâts", "des", "eaux", "franchise", "2", "ans"]
        );
    }

    #[tokio::test]
    async fn test_embeddings_are_normalized_and_sized() {
        let embedder = HashingEmbedder::new();
        let vector = embedder.embed("Assurance habitation multirisque").await.unwrap();

        assert_eq!(vector.len(), 384);
        assert!((dot(&vector, &vector) - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_empty_text_gives_zero_vector() {
        let embedder = HashingEmbedder::with_dimensions(16).unwrap();
        let vector = embedder.embed("  ... ").await.unwrap();
        assert_eq!(vector, vec![0.0; 16]);
    }

    #[tokio::test]
    async fn test_embeddings_are_deterministic() {
        let first = HashingEmbedder::new();
        let second = HashingEmbedder::new();

        let a = first.embed("résiliation du contrat").await.unwrap();
        let b = second.embed("résiliation du contrat").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_shared_words_increase_similarity() {
        let embedder = HashingEmbedder::new();
        let query = embedder.embed("exclusions").await.unwrap();
        let related = embedder.embed("2. Exclusions apply to flood damage").await.unwrap();
        let unrelated = embedder.embed("1. Coverage details for the vehicle").await.unwrap();

        assert!(dot(&query, &related) > dot(&query, &unrelated));
    }

    #[tokio::test]
    async fn test_batch_matches_single_embeddings() {
        let embedder = HashingEmbedder::new();
        let batch = embedder.embed_batch(&["vol", "incendie"]).await.unwrap();

        assert_eq!(batch[0], embedder.embed("vol").await.unwrap());
        assert_eq!(batch[1], embedder.embed("incendie").await.unwrap());
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        assert!(HashingEmbedder::with_dimensions(0).is_err());
        assert_eq!(HashingEmbedder::new().model_id(), "hashing-md5-384");
    }
}
