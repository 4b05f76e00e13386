//! Turns documents into normalized embedding records ready for upsert.
//!
//! Each document yields at most one title record plus one record per body
//! chunk. Record ids are re-derivable from `(document, kind, index)`, so
//! re-indexing a document overwrites its previous records instead of
//! duplicating them.

use serde_json::json;
use std::sync::Arc;
use std::sync::LazyLock;
use tracing::debug;

use crate::capabilities::Encoder;
use crate::chunker::Chunker;
use crate::types::{ChunkId, Document, EmbeddingRecord, SearchError};

static HTML_TAG: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new("<[^>]*>").expect("html tag pattern is valid"));

/// Removes HTML tags and trims the result.
///
/// CMS rich-text fields arrive with markup; only the visible text should be
/// embedded or previewed.
pub fn strip_html_tags(text: &str) -> String {
    HTML_TAG.replace_all(text, "").trim().to_string()
}

/// Scales `vector` to unit Euclidean length.
///
/// A vector of exactly zero norm is returned unchanged rather than divided
/// by zero.
pub fn normalize(mut vector: Vec<f32>) -> Vec<f32> {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 {
        return vector;
    }
    for value in &mut vector {
        *value /= norm;
    }
    vector
}

/// Produces embedding records for one document at a time.
///
/// The actual upsert into the vector store belongs to the caller; this
/// component has no side effects beyond calling the encoder.
pub struct Vectorizer {
    encoder: Arc<dyn Encoder>,
    chunker: Chunker,
}

impl Vectorizer {
    pub fn new(encoder: Arc<dyn Encoder>, chunk_size: usize) -> Self {
        Self {
            encoder,
            chunker: Chunker::new(chunk_size),
        }
    }

    /// Builds the full record set for `document`.
    ///
    /// Title and body are stripped of HTML markup first; CMS webhooks deliver
    /// rich-text fields. Emits one `{uid}_title` record when the title is
    /// non-empty, then one `{uid}_body_{index}` record per body chunk with
    /// indexes starting at zero, strictly increasing, no gaps. All vectors
    /// are unit-normalized.
    ///
    /// # Errors
    ///
    /// Fails as a whole when the encoder fails; partial record sets are never
    /// produced.
    pub async fn prepare(&self, document: &Document) -> Result<Vec<EmbeddingRecord>, SearchError> {
        let mut ids = Vec::new();
        let mut texts = Vec::new();
        let mut metadatas = Vec::new();

        let title = strip_html_tags(&document.title);
        let body = strip_html_tags(&document.body);
        if !title.is_empty() {
            ids.push(ChunkId::title(document.uid.clone()));
            texts.push(title.to_string());
            metadatas.push(json!({
                "doc_uid": document.uid.as_str(),
                "title": title,
                "chunk_type": "title",
                "locale": document.locale,
                "content_type": document.content_type,
                "text": title,
            }));
        }

        for (index, chunk) in self.chunker.chunks(&body).enumerate() {
            ids.push(ChunkId::body(document.uid.clone(), index));
            metadatas.push(json!({
                "doc_uid": document.uid.as_str(),
                "title": title,
                "chunk_type": "body",
                "chunk_index": index,
                "locale": document.locale,
                "content_type": document.content_type,
                "text": chunk,
            }));
            texts.push(chunk);
        }

        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let vectors = self.encoder.encode_batch(&texts).await?;
        if vectors.len() != texts.len() {
            return Err(SearchError::Encoder(format!(
                "encoder returned {} vectors for {} inputs",
                vectors.len(),
                texts.len()
            )));
        }

        let records: Vec<EmbeddingRecord> = ids
            .into_iter()
            .zip(vectors)
            .zip(metadatas)
            .map(|((id, vector), metadata)| EmbeddingRecord {
                id,
                vector: normalize(vector),
                metadata,
            })
            .collect();

        debug!(
            doc_uid = %document.uid,
            records = records.len(),
            "prepared embedding records"
        );
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::MockEncoder;
    use crate::types::ChunkKind;
    use async_trait::async_trait;

    fn doc(title: &str, body: &str) -> Document {
        Document {
            uid: crate::types::DocumentId::new("en-us_blt001"),
            title: title.to_string(),
            body: body.to_string(),
            locale: "en-us".to_string(),
            content_type: "blog_post".to_string(),
        }
    }

    fn vectorizer() -> Vectorizer {
        Vectorizer::new(Arc::new(MockEncoder::new()), 3)
    }

    #[tokio::test]
    async fn emits_title_and_sequential_body_records() {
        let records = vectorizer()
            .prepare(&doc("A Title", "one two three four five six seven"))
            .await
            .unwrap();

        assert_eq!(records.len(), 4);
        assert_eq!(records[0].id.to_string(), "en-us_blt001_title");
        assert_eq!(records[0].id.kind(), ChunkKind::Title);
        for (i, record) in records[1..].iter().enumerate() {
            assert_eq!(record.id.to_string(), format!("en-us_blt001_body_{i}"));
            assert_eq!(record.id.index(), Some(i));
        }
    }

    #[tokio::test]
    async fn record_ids_are_unique_and_deterministic() {
        let first = vectorizer().prepare(&doc("T", "a b c d")).await.unwrap();
        let second = vectorizer().prepare(&doc("T", "a b c d")).await.unwrap();

        let ids: Vec<String> = first.iter().map(|r| r.id.to_string()).collect();
        let mut deduped = ids.clone();
        deduped.dedup();
        assert_eq!(ids, deduped);
        assert_eq!(
            ids,
            second.iter().map(|r| r.id.to_string()).collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn vectors_are_unit_length() {
        let records = vectorizer().prepare(&doc("T", "a b c d e")).await.unwrap();
        for record in records {
            let norm = record.vector.iter().map(|v| v * v).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-5, "norm was {norm}");
        }
    }

    #[tokio::test]
    async fn zero_vectors_survive_normalization_unchanged() {
        struct ZeroEncoder;

        #[async_trait]
        impl Encoder for ZeroEncoder {
            async fn encode_batch(
                &self,
                texts: &[String],
            ) -> Result<Vec<Vec<f32>>, SearchError> {
                Ok(texts.iter().map(|_| vec![0.0; 8]).collect())
            }
        }

        let vectorizer = Vectorizer::new(Arc::new(ZeroEncoder), 3);
        let records = vectorizer.prepare(&doc("T", "")).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].vector, vec![0.0; 8]);
    }

    #[tokio::test]
    async fn empty_document_yields_no_records() {
        let records = vectorizer().prepare(&doc("", "  ")).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn encoder_failure_fails_the_whole_operation() {
        struct FailingEncoder;

        #[async_trait]
        impl Encoder for FailingEncoder {
            async fn encode_batch(
                &self,
                _texts: &[String],
            ) -> Result<Vec<Vec<f32>>, SearchError> {
                Err(SearchError::Encoder("model offline".to_string()))
            }
        }

        let vectorizer = Vectorizer::new(Arc::new(FailingEncoder), 3);
        let err = vectorizer.prepare(&doc("T", "a b c")).await.unwrap_err();
        assert!(matches!(err, SearchError::Encoder(_)));
    }

    #[tokio::test]
    async fn markup_is_stripped_before_encoding() {
        let records = vectorizer()
            .prepare(&doc(
                "<h1>Budget flowers</h1>",
                "<p>Growing <b>flower</b> beds</p> on a budget",
            ))
            .await
            .unwrap();

        assert_eq!(records[0].metadata["title"], "Budget flowers");
        for record in &records {
            let text = record.metadata["text"].as_str().unwrap();
            assert!(!text.contains('<'), "markup leaked into {text:?}");
        }
        let body_text: Vec<&str> = records[1..]
            .iter()
            .map(|r| r.metadata["text"].as_str().unwrap())
            .collect();
        assert_eq!(body_text.join(" "), "Growing flower beds on a budget");
    }

    #[test]
    fn strip_html_removes_markup() {
        assert_eq!(
            strip_html_tags("<p>Hello <b>world</b></p>\n"),
            "Hello world"
        );
        assert_eq!(strip_html_tags(""), "");
    }

    #[test]
    fn normalize_keeps_direction() {
        let normalized = normalize(vec![3.0, 4.0]);
        assert!((normalized[0] - 0.6).abs() < 1e-6);
        assert!((normalized[1] - 0.8).abs() < 1e-6);
    }
}
