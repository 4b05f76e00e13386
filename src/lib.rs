//! Multi-stage semantic retrieval and ranking over CMS content.
//!
//! ```text
//! CMS webhook ──► Document ──► Vectorizer ──► EmbeddingRecords ──► VectorStore
//!
//! query ──► QueryExpander ──► Encoder ──► VectorStore
//!              │                              │
//!              ▼                              ▼
//!          variations                 chunk-level matches
//!                                             │
//!                  Aggregator ◄───────────────┘
//!                      │
//!                  Reranker ──► relevance floor ──► TranslationEnricher
//!                                                        │
//!                  ResponseCache ◄───────────────────────┘
//! ```
//!
//! The crate is the orchestration core only: the embedding model, the vector
//! index, the pairwise relevance model, the generative backend, and the
//! language detector are external capabilities behind the traits in
//! [`capabilities`], injected when the [`pipeline::SearchPipeline`] is built.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use semsearch::capabilities::MockEncoder;
//! use semsearch::memory_store::InMemoryVectorStore;
//! use semsearch::pipeline::SearchPipeline;
//! use semsearch::types::SearchRequest;
//!
//! let pipeline = SearchPipeline::builder()
//!     .with_encoder(Arc::new(MockEncoder::new()))
//!     .with_vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .build()?;
//!
//! let response = pipeline.search(&SearchRequest::new("cheap flowers")).await?;
//! ```

pub mod aggregate;
pub mod cache;
pub mod capabilities;
pub mod chunker;
pub mod config;
pub mod expansion;
pub mod filtering;
pub mod generation;
pub mod memory_store;
pub mod pipeline;
pub mod rerank;
pub mod translate;
pub mod types;
pub mod vectorizer;

pub use config::SearchConfig;
pub use pipeline::{SearchPipeline, SearchPipelineBuilder};
pub use types::{
    AggregatedCandidate, ChunkId, ChunkKind, Document, DocumentId, EmbeddingRecord, RankedHit,
    RetrievalMatch, SearchError, SearchRequest, SearchResponse,
};
