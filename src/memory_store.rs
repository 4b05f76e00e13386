//! Brute-force cosine [`VectorStore`] for tests and single-process runs.
//!
//! Production deployments inject an adapter over their managed vector index;
//! this store exists so the pipeline is usable and testable without one. It
//! honors the same contract: upserts are idempotent by record id and queries
//! return at most `top_k` matches ordered by similarity.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::capabilities::VectorStore;
use crate::types::{EmbeddingRecord, RetrievalMatch, SearchError};

#[derive(Default)]
pub struct InMemoryVectorStore {
    records: RwLock<HashMap<String, EmbeddingRecord>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(&self, records: Vec<EmbeddingRecord>) -> Result<(), SearchError> {
        let mut stored = self.records.write();
        for record in records {
            stored.insert(record.id.to_string(), record);
        }
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievalMatch>, SearchError> {
        let records = self.records.read();
        let mut matches: Vec<RetrievalMatch> = records
            .values()
            .filter(|record| record.vector.len() == vector.len())
            .map(|record| RetrievalMatch {
                id: record.id.to_string(),
                score: cosine(vector, &record.vector),
                metadata: record.metadata.clone(),
            })
            .collect();

        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(top_k);
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChunkId, DocumentId};
    use serde_json::json;

    fn record(doc: &str, index: usize, vector: Vec<f32>) -> EmbeddingRecord {
        EmbeddingRecord {
            id: ChunkId::body(DocumentId::new(doc), index),
            vector,
            metadata: json!({ "doc_uid": doc }),
        }
    }

    #[tokio::test]
    async fn query_orders_by_similarity() {
        let store = InMemoryVectorStore::new();
        store
            .upsert(vec![
                record("a", 0, vec![1.0, 0.0]),
                record("b", 0, vec![0.0, 1.0]),
                record("c", 0, vec![0.7, 0.7]),
            ])
            .await
            .unwrap();

        let matches = store.query(&[1.0, 0.0], 2).await.unwrap();

        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].id, "a_body_0");
        assert_eq!(matches[1].id, "c_body_0");
        assert!(matches[0].score > matches[1].score);
    }

    #[tokio::test]
    async fn upsert_overwrites_by_id() {
        let store = InMemoryVectorStore::new();
        store
            .upsert(vec![record("a", 0, vec![1.0, 0.0])])
            .await
            .unwrap();
        store
            .upsert(vec![record("a", 0, vec![0.0, 1.0])])
            .await
            .unwrap();

        assert_eq!(store.len(), 1);
        let matches = store.query(&[0.0, 1.0], 1).await.unwrap();
        assert!((matches[0].score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn mismatched_dimensions_are_skipped() {
        let store = InMemoryVectorStore::new();
        store
            .upsert(vec![
                record("a", 0, vec![1.0, 0.0]),
                record("b", 0, vec![1.0, 0.0, 0.0]),
            ])
            .await
            .unwrap();

        let matches = store.query(&[1.0, 0.0], 10).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, "a_body_0");
    }
}
