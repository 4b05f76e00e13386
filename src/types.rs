//! Core domain types shared across the retrieval pipeline.
//!
//! Identifiers are typed: a [`ChunkId`] is produced once at vectorization time
//! and carries a documented format/parse pair, so downstream stages resolve a
//! match back to its owning [`DocumentId`] with a structured parse instead of
//! ad-hoc string surgery.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Stable identifier of a source document, as assigned by the CMS.
///
/// The value is opaque to the pipeline and may itself contain underscores
/// (e.g. `en-us_blt8f64b5c866280d11`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether a chunk holds the document title or a window of its body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    Title,
    Body,
}

/// Identifier of one embedding record inside the vector store.
///
/// Formats as `{doc}_title` for the title chunk and `{doc}_body_{index}` for
/// body chunks. Re-deriving the same id for the same `(document, kind, index)`
/// triple makes re-indexing an idempotent overwrite.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkId {
    document: DocumentId,
    kind: ChunkKind,
    index: Option<usize>,
}

impl ChunkId {
    /// Id for a document's title chunk.
    pub fn title(document: DocumentId) -> Self {
        Self {
            document,
            kind: ChunkKind::Title,
            index: None,
        }
    }

    /// Id for the `index`-th body chunk of a document.
    pub fn body(document: DocumentId, index: usize) -> Self {
        Self {
            document,
            kind: ChunkKind::Body,
            index: Some(index),
        }
    }

    pub fn document(&self) -> &DocumentId {
        &self.document
    }

    pub fn kind(&self) -> ChunkKind {
        self.kind
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }

    /// Parses a chunk id back into its components.
    ///
    /// Returns `None` when the string carries neither a `_title` nor a
    /// `_body_{n}` suffix; callers treat such ids as bare document ids.
    pub fn parse(raw: &str) -> Option<Self> {
        if let Some(doc) = raw.strip_suffix("_title") {
            if doc.is_empty() {
                return None;
            }
            return Some(Self::title(DocumentId::new(doc)));
        }
        let at = raw.rfind("_body_")?;
        let (doc, tail) = raw.split_at(at);
        let index: usize = tail.strip_prefix("_body_")?.parse().ok()?;
        if doc.is_empty() {
            return None;
        }
        Some(Self::body(DocumentId::new(doc), index))
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.kind, self.index) {
            (ChunkKind::Title, _) => write!(f, "{}_title", self.document),
            (ChunkKind::Body, Some(index)) => write!(f, "{}_body_{}", self.document, index),
            // Body without an index cannot be constructed through the public API.
            (ChunkKind::Body, None) => write!(f, "{}_body_0", self.document),
        }
    }
}

/// An external content unit as delivered by the CMS, pre-sanitized to plain
/// text. The pipeline never creates documents itself.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Document {
    pub uid: DocumentId,
    pub title: String,
    pub body: String,
    pub locale: String,
    pub content_type: String,
}

/// One vector representation ready for upsert into the vector store.
#[derive(Clone, Debug)]
pub struct EmbeddingRecord {
    pub id: ChunkId,
    /// Unit-length (or exactly zero) vector with the encoder's dimensionality.
    pub vector: Vec<f32>,
    pub metadata: serde_json::Value,
}

/// One nearest-neighbor hit returned by the vector store for a query vector.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetrievalMatch {
    pub id: String,
    /// Similarity score; higher is closer.
    pub score: f32,
    pub metadata: serde_json::Value,
}

/// A document-level candidate produced by collapsing chunk-level matches.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AggregatedCandidate {
    pub doc_id: DocumentId,
    /// Maximum score among the contributing matches.
    pub score: f32,
    /// Number of matches that mapped to this document.
    pub chunk_matches: usize,
    /// Metadata of the highest-scoring contributing match.
    pub metadata: serde_json::Value,
}

/// A final, optionally reranked hit.
///
/// `final_score` is the sole ordering key of the response; `score` mirrors it
/// for wire compatibility with consumers of the original service.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RankedHit {
    pub id: DocumentId,
    pub score: f32,
    pub metadata: serde_json::Value,
    pub chunk_matches: usize,
    pub reranker_score: Option<f32>,
    pub final_score: f32,
}

impl RankedHit {
    /// Lifts an aggregated candidate into a hit without applying a rerank.
    pub fn from_candidate(candidate: AggregatedCandidate) -> Self {
        Self {
            id: candidate.doc_id,
            score: candidate.score,
            metadata: candidate.metadata,
            chunk_matches: candidate.chunk_matches,
            reranker_score: None,
            final_score: candidate.score,
        }
    }
}

fn default_top_k() -> usize {
    5
}

fn default_true() -> bool {
    true
}

/// A single search request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_true")]
    pub use_reranking: bool,
    #[serde(default)]
    pub target_lang: Option<String>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            top_k: default_top_k(),
            use_reranking: true,
            target_lang: None,
        }
    }

    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    #[must_use]
    pub fn with_reranking(mut self, use_reranking: bool) -> Self {
        self.use_reranking = use_reranking;
        self
    }

    #[must_use]
    pub fn with_target_lang(mut self, target_lang: impl Into<String>) -> Self {
        self.target_lang = Some(target_lang.into());
        self
    }
}

/// The full search response; this is also the payload stored in the cache.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<RankedHit>,
    pub query_language: String,
    pub target_language: String,
}

/// Errors surfaced by the retrieval pipeline.
///
/// Degradable dependency failures (expansion, reranking, translation,
/// language detection) never appear here; they are logged and downgraded at
/// the component that owns the fallback.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("query must not be empty")]
    EmptyQuery,

    #[error("top_k must be greater than zero")]
    InvalidTopK,

    #[error("encoder failure: {0}")]
    Encoder(String),

    #[error("vector store failure: {0}")]
    VectorStore(String),

    #[error("text generation failure: {0}")]
    Generation(String),

    #[error("pairwise scoring failure: {0}")]
    Scoring(String),

    #[error("language detection failure: {0}")]
    Detection(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_id_formats_title_and_body() {
        let doc = DocumentId::new("en-us_blt001");
        assert_eq!(ChunkId::title(doc.clone()).to_string(), "en-us_blt001_title");
        assert_eq!(ChunkId::body(doc, 3).to_string(), "en-us_blt001_body_3");
    }

    #[test]
    fn chunk_id_parse_round_trips() {
        for raw in ["en-us_blt001_title", "en-us_blt001_body_0", "doc_body_17"] {
            let parsed = ChunkId::parse(raw).unwrap();
            assert_eq!(parsed.to_string(), raw);
        }
    }

    #[test]
    fn chunk_id_parse_keeps_underscored_document_ids_intact() {
        let parsed = ChunkId::parse("en-us_blt8f64b5c866280d11_body_2").unwrap();
        assert_eq!(parsed.document().as_str(), "en-us_blt8f64b5c866280d11");
        assert_eq!(parsed.kind(), ChunkKind::Body);
        assert_eq!(parsed.index(), Some(2));
    }

    #[test]
    fn chunk_id_parse_rejects_bare_ids() {
        assert!(ChunkId::parse("en-us_blt001").is_none());
        assert!(ChunkId::parse("_title").is_none());
        assert!(ChunkId::parse("doc_body_x").is_none());
    }

    #[test]
    fn search_request_deserializes_with_defaults() {
        let req: SearchRequest = serde_json::from_str(r#"{"query":"hello"}"#).unwrap();
        assert_eq!(req.top_k, 5);
        assert!(req.use_reranking);
        assert!(req.target_lang.is_none());
    }
}
