//! External capability seams the pipeline orchestrates.
//!
//! Every model, store, and side-channel the pipeline talks to lives behind one
//! of these async traits, injected as `Arc<dyn Trait>` handles when the
//! pipeline is built. Nothing here is a module-level singleton; lifecycle is
//! owned by whoever constructs the [`crate::pipeline::SearchPipeline`].
//!
//! Fallback policy per capability:
//!
//! | Capability         | On failure at query time                    |
//! |--------------------|---------------------------------------------|
//! | [`Encoder`]        | fatal — the request fails                   |
//! | [`VectorStore`]    | fatal — the request fails                   |
//! | [`PairwiseScorer`] | degrade to retrieval order                  |
//! | [`TextGenerator`]  | degrade to the original query / source text |
//! | [`LanguageDetector`] | degrade to the configured base language   |
//! | [`ResponseCache`]  | treated as a miss                           |

use async_trait::async_trait;
use std::time::Duration;

use crate::types::{EmbeddingRecord, RetrievalMatch, SearchError};

/// Dense embedding model: text in, fixed-length vector out.
///
/// Output must be deterministic for identical input; dimensionality is fixed
/// per deployment.
#[async_trait]
pub trait Encoder: Send + Sync {
    async fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SearchError>;
}

/// Nearest-neighbor index over embedding records.
///
/// `upsert` is idempotent by record id; `query` returns at most `top_k`
/// matches ordered by similarity, each carrying the record's metadata.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn upsert(&self, records: Vec<EmbeddingRecord>) -> Result<(), SearchError>;

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievalMatch>, SearchError>;
}

/// Pairwise relevance model used by the precision reranking pass.
///
/// Returns one score per `(query, passage)` pair, same length and order as
/// the input; higher means more relevant and values may be negative.
#[async_trait]
pub trait PairwiseScorer: Send + Sync {
    async fn score(&self, pairs: &[(String, String)]) -> Result<Vec<f32>, SearchError>;
}

/// Generative text backend for query expansion and translation.
///
/// Both operations are best-effort and externally rate-limited; callers own
/// the fallback when they fail.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Produce semantically related rewordings of a short query.
    async fn expand(&self, query: &str) -> Result<Vec<String>, SearchError>;

    /// Translate `text` into the language named by `target_lang`.
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String, SearchError>;
}

/// Best-effort language identification for incoming queries.
#[async_trait]
pub trait LanguageDetector: Send + Sync {
    /// Returns a short language code such as `en` or `hi`.
    async fn detect(&self, text: &str) -> Result<String, SearchError>;
}

/// Process-wide key-value cache with per-entry expiry.
///
/// Writes are atomic set-with-TTL overwrites; the pipeline never deletes
/// entries. A `get` on an expired or failing backend is simply a miss.
#[async_trait]
pub trait ResponseCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;

    async fn set(&self, key: &str, value: String, ttl: Duration);
}

/// Deterministic hash-based encoder for tests and offline runs.
///
/// Identical input always yields an identical vector; different inputs yield
/// different vectors with overwhelming likelihood. Vectors are not normalized
/// here — the vectorizer owns normalization.
#[derive(Clone, Debug)]
pub struct MockEncoder {
    dim: usize,
}

impl MockEncoder {
    pub fn new() -> Self {
        Self { dim: 32 }
    }

    pub fn with_dim(dim: usize) -> Self {
        Self { dim }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    fn encode_one(&self, text: &str) -> Vec<f32> {
        use std::hash::{DefaultHasher, Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let mut state = hasher.finish() | 1;

        (0..self.dim)
            .map(|_| {
                // xorshift keeps the sequence cheap and reproducible.
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                (state as f64 / u64::MAX as f64) as f32 - 0.5
            })
            .collect()
    }
}

impl Default for MockEncoder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Encoder for MockEncoder {
    async fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SearchError> {
        Ok(texts.iter().map(|text| self.encode_one(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_encoder_is_deterministic() {
        let encoder = MockEncoder::new();
        let inputs = vec![
            "hello world".to_string(),
            "goodbye world".to_string(),
            "hello world".to_string(),
        ];

        let first = encoder.encode_batch(&inputs).await.unwrap();
        let second = encoder.encode_batch(&inputs).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first[0], first[2]);
        assert_ne!(first[0], first[1]);
        assert_eq!(first[0].len(), encoder.dim());
    }
}
