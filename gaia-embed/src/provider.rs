//! Embedding provider abstraction and the offline hashing provider

use crate::error::{EmbedError, Result};
use async_trait::async_trait;
use fnv::FnvHasher;
use half::f16;
use std::hash::Hasher;

/// Result of embedding generation
#[derive(Debug, Clone)]
pub struct EmbeddingResult {
    /// The generated embeddings, one per input text
    pub embeddings: Vec<Vec<f16>>,
    /// The dimension of each embedding vector
    pub dimension: usize,
}

impl EmbeddingResult {
    /// Create a new embedding result, inferring the dimension from the first
    /// vector (0 when there are none).
    pub fn new(embeddings: Vec<Vec<f16>>) -> Self {
        let dimension = embeddings.first().map(|e| e.len()).unwrap_or(0);
        Self {
            embeddings,
            dimension,
        }
    }

    /// Returns the number of embedding vectors in this result.
    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    /// Returns `true` if this result contains no embedding vectors.
    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }
}

/// Trait for embedding providers that can generate embeddings from text
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embeddings for a single text
    async fn embed_text(&self, text: &str) -> Result<Vec<f16>> {
        let texts = vec![text.to_string()];
        let result = self.embed_texts(&texts).await?;
        result
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbedError::unexpected_response("No embedding generated for text"))
    }

    /// Generate embeddings for multiple texts (batch processing)
    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult>;

    /// Get the dimension of embeddings produced by this provider.
    ///
    /// Remote providers may report 0 until the first response arrives.
    fn embedding_dimension(&self) -> usize;

    /// Get the name/identifier of this provider
    fn provider_name(&self) -> &str;
}

/// Convert an f32 vector to f16, optionally scaling it to unit length.
pub fn to_f16(embedding: &[f32], normalize: bool) -> Vec<f16> {
    let norm = if normalize {
        embedding.iter().map(|x| x * x).sum::<f32>().sqrt()
    } else {
        0.0
    };

    if norm > 0.0 {
        embedding.iter().map(|v| f16::from_f32(v / norm)).collect()
    } else {
        embedding.iter().copied().map(f16::from_f32).collect()
    }
}

/// Deterministic feature-hashing embedder.
///
/// Every lowercased alphanumeric token is hashed with FNV into one of
/// `dimension` buckets, with a second hash bit choosing the sign. The bucket
/// counts are L2-normalized. Texts sharing vocabulary land close together, which
/// is enough for offline runs and tests without an embedding server.
#[derive(Debug, Clone)]
pub struct HashEmbeddingProvider {
    dimension: usize,
}

impl HashEmbeddingProvider {
    pub const DEFAULT_DIMENSION: usize = 256;

    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(EmbedError::invalid_config(
                "hash embedding dimension must be at least 1",
            ));
        }
        Ok(Self { dimension })
    }

    fn embed_one(&self, text: &str) -> Vec<f16> {
        let mut buckets = vec![0f32; self.dimension];
        let lowered = text.to_lowercase();

        for token in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let mut hasher = FnvHasher::default();
            hasher.write(token.as_bytes());
            let hash = hasher.finish();
            let bucket = (hash % self.dimension as u64) as usize;
            let sign = if (hash >> 63) & 1 == 0 { 1.0 } else { -1.0 };
            buckets[bucket] += sign;
        }

        to_f16(&buckets, true)
    }
}

impl Default for HashEmbeddingProvider {
    fn default() -> Self {
        Self {
            dimension: Self::DEFAULT_DIMENSION,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbeddingProvider {
    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult> {
        tracing::debug!("Hashing {} texts into {} buckets", texts.len(), self.dimension);
        let embeddings = texts.iter().map(|t| self.embed_one(t)).collect();
        Ok(EmbeddingResult::new(embeddings))
    }

    fn embedding_dimension(&self) -> usize {
        self.dimension
    }

    fn provider_name(&self) -> &str {
        "hash"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot(a: &[f16], b: &[f16]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x.to_f32() * y.to_f32()).sum()
    }

    #[test]
    fn test_embedding_result() {
        let embeddings = vec![
            vec![f16::from_f32(0.1), f16::from_f32(0.2), f16::from_f32(0.3)],
            vec![f16::from_f32(0.4), f16::from_f32(0.5), f16::from_f32(0.6)],
        ];
        let result = EmbeddingResult::new(embeddings);

        assert_eq!(result.len(), 2);
        assert_eq!(result.dimension, 3);
        assert!(!result.is_empty());
        assert_eq!(EmbeddingResult::new(vec![]).dimension, 0);
    }

    #[test]
    fn test_to_f16_normalizes() {
        let v = to_f16(&[3.0, 4.0], true);
        assert!((v[0].to_f32() - 0.6).abs() < 1e-3);
        assert!((v[1].to_f32() - 0.8).abs() < 1e-3);

        let raw = to_f16(&[3.0, 4.0], false);
        assert_eq!(raw[0].to_f32(), 3.0);

        let zero = to_f16(&[0.0, 0.0], true);
        assert!(zero.iter().all(|x| x.to_f32() == 0.0));
    }

    #[test]
    fn test_hash_provider_rejects_zero_dimension() {
        assert!(HashEmbeddingProvider::new(0).is_err());
    }

    #[tokio::test]
    async fn test_hash_provider_is_deterministic() -> Result<()> {
        let provider = HashEmbeddingProvider::default();
        let a = provider.embed_text("Der alte Drache schläft").await?;
        let b = provider.embed_text("der ALTE drache, schläft!").await?;

        assert_eq!(a.len(), HashEmbeddingProvider::DEFAULT_DIMENSION);
        assert_eq!(a, b);
        assert!((dot(&a, &a) - 1.0).abs() < 1e-2);
        Ok(())
    }

    #[tokio::test]
    async fn test_hash_provider_prefers_shared_vocabulary() -> Result<()> {
        let provider = HashEmbeddingProvider::new(512)?;
        let texts = vec![
            "dragon lore of the northern mountains".to_string(),
            "dragon lore".to_string(),
            "character sheet for the innkeeper".to_string(),
        ];
        let result = provider.embed_texts(&texts).await?;
        assert_eq!(result.len(), 3);

        let related = dot(&result.embeddings[0], &result.embeddings[1]);
        let unrelated = dot(&result.embeddings[2], &result.embeddings[1]);
        assert!(related > unrelated);
        Ok(())
    }

    #[test]
    fn test_empty_text_embeds_to_zero_vector() {
        let provider = HashEmbeddingProvider::new(8).unwrap();
        let result = tokio_test::block_on(provider.embed_text("   ")).unwrap();
        assert!(result.iter().all(|x| x.to_f32() == 0.0));
    }
}
