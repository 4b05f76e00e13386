//! The multi-stage retrieval and ranking pipeline.
//!
//! One [`SearchPipeline`] owns injected capability handles and orchestrates
//! the full query path:
//!
//! ```text
//! query ──► language resolution ──► cache probe
//!             │                        │ hit ──► cached response
//!             ▼
//!          query expansion (static, + generative variations)
//!             ▼
//!          encode ──► vector store query per variation ──► score-max union
//!             ▼
//!          aggregate ──► rerank ──► relevance floor ──► translate ──► cache
//! ```
//!
//! Ingest is the mirror image: documents are chunked, encoded, normalized,
//! and upserted under deterministic record ids.
//!
//! Every suspension point is an external call; the CPU-bound stages between
//! them run to completion. Expansion, reranking, translation, and language
//! detection degrade on failure; encoder and vector store failures at query
//! time are fatal to that request.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::aggregate::aggregate_matches;
use crate::cache::{InMemoryCache, search_cache_key};
use crate::capabilities::{
    Encoder, LanguageDetector, PairwiseScorer, ResponseCache, TextGenerator, VectorStore,
};
use crate::config::SearchConfig;
use crate::expansion::QueryExpander;
use crate::filtering::apply_score_floor;
use crate::rerank::Reranker;
use crate::translate::TranslationEnricher;
use crate::types::{
    Document, RetrievalMatch, SearchError, SearchRequest, SearchResponse,
};
use crate::vectorizer::{Vectorizer, normalize};

/// Orchestrates ingest and search over injected capability handles.
pub struct SearchPipeline {
    encoder: Arc<dyn Encoder>,
    store: Arc<dyn VectorStore>,
    cache: Arc<dyn ResponseCache>,
    detector: Option<Arc<dyn LanguageDetector>>,
    vectorizer: Vectorizer,
    expander: QueryExpander,
    reranker: Reranker,
    enricher: TranslationEnricher,
    config: SearchConfig,
}

impl SearchPipeline {
    /// Start assembling a pipeline. Encoder and vector store are required;
    /// everything else has a sensible absence behavior.
    #[must_use]
    pub fn builder() -> SearchPipelineBuilder {
        SearchPipelineBuilder::default()
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Vectorizes `document` and upserts its records into the vector store.
    ///
    /// Returns the number of records written. Re-ingesting a document
    /// overwrites its previous records because ids are deterministic. A
    /// failure here never affects in-flight searches.
    ///
    /// # Errors
    ///
    /// Fails when the encoder or the vector store fails; no partial record
    /// set is upserted.
    pub async fn index_document(&self, document: &Document) -> Result<usize, SearchError> {
        let records = self.vectorizer.prepare(document).await?;
        if records.is_empty() {
            warn!(doc_uid = %document.uid, "document produced no records, skipping upsert");
            return Ok(0);
        }

        let count = records.len();
        self.store.upsert(records).await?;
        info!(doc_uid = %document.uid, records = count, "indexed document");
        Ok(count)
    }

    /// Runs the full search path for one request.
    ///
    /// # Errors
    ///
    /// [`SearchError::EmptyQuery`] / [`SearchError::InvalidTopK`] for client
    /// input errors; encoder or vector store failures propagate as-is. All
    /// other dependency failures degrade internally.
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, SearchError> {
        let query = request.query.trim();
        if query.is_empty() {
            return Err(SearchError::EmptyQuery);
        }
        if request.top_k == 0 {
            return Err(SearchError::InvalidTopK);
        }

        let detected = self.detect_language(query).await;
        let target = request
            .target_lang
            .as_deref()
            .filter(|lang| !lang.trim().is_empty())
            .unwrap_or(&detected)
            .to_string();

        let cache_key = search_cache_key(
            &request.query,
            request.top_k,
            request.use_reranking,
            &target,
        );
        if let Some(cached) = self.cache.get(&cache_key).await {
            match serde_json::from_str::<SearchResponse>(&cached) {
                Ok(response) => {
                    debug!(%cache_key, "serving cached search response");
                    return Ok(response);
                }
                Err(err) => warn!(%cache_key, %err, "discarding malformed cache entry"),
            }
        }

        let matches = self.retrieve(query).await?;
        if matches.is_empty() {
            debug!(%query, "no matches in the vector store");
            return Ok(SearchResponse {
                results: Vec::new(),
                query_language: detected,
                target_language: target,
            });
        }

        let candidates = aggregate_matches(&matches);
        let rerank_enabled = self.config.rerank_enabled && request.use_reranking;
        let hits = self
            .reranker
            .rerank(query, candidates, request.top_k, rerank_enabled)
            .await;
        let mut hits = apply_score_floor(hits, self.config.min_score_threshold);

        if !hits.is_empty() {
            self.enricher.enrich(&mut hits, &target).await;
        }

        let response = SearchResponse {
            results: hits,
            query_language: detected,
            target_language: target,
        };

        // Empty result sets are never cached: transient index emptiness must
        // be retried on the next identical request.
        if !response.results.is_empty() {
            let serialized = serde_json::to_string(&response)?;
            self.cache
                .set(&cache_key, serialized, self.config.cache_ttl())
                .await;
        }

        info!(
            %query,
            results = response.results.len(),
            target_language = %response.target_language,
            "search completed"
        );
        Ok(response)
    }

    async fn detect_language(&self, query: &str) -> String {
        let Some(detector) = &self.detector else {
            return self.config.base_language.clone();
        };
        match detector.detect(query).await {
            Ok(lang) if !lang.trim().is_empty() => lang,
            Ok(_) => self.config.base_language.clone(),
            Err(err) => {
                warn!(%err, "language detection failed, defaulting to base language");
                self.config.base_language.clone()
            }
        }
    }

    /// Encodes the expanded query (plus any generative variations), queries
    /// the vector store once per encoding, and unions the match sets by
    /// record id keeping the maximum score.
    async fn retrieve(&self, query: &str) -> Result<Vec<RetrievalMatch>, SearchError> {
        let mut queries = vec![self.expander.static_expand(query)];
        queries.extend(self.expander.generative_variations(query).await);

        let vectors = self.encoder.encode_batch(&queries).await?;
        if vectors.len() != queries.len() {
            return Err(SearchError::Encoder(format!(
                "encoder returned {} vectors for {} queries",
                vectors.len(),
                queries.len()
            )));
        }

        let mut union: Vec<RetrievalMatch> = Vec::new();
        let mut by_id: HashMap<String, usize> = HashMap::new();
        for vector in vectors {
            let vector = normalize(vector);
            let matches = self
                .store
                .query(&vector, self.config.initial_candidates)
                .await?;
            for m in matches {
                match by_id.get(&m.id) {
                    Some(&slot) => {
                        if m.score > union[slot].score {
                            union[slot] = m;
                        }
                    }
                    None => {
                        by_id.insert(m.id.clone(), union.len());
                        union.push(m);
                    }
                }
            }
        }

        debug!(
            queries = queries.len(),
            matches = union.len(),
            "retrieved candidate chunks"
        );
        Ok(union)
    }
}

/// Builder wiring capability handles into a [`SearchPipeline`].
#[derive(Default)]
pub struct SearchPipelineBuilder {
    encoder: Option<Arc<dyn Encoder>>,
    store: Option<Arc<dyn VectorStore>>,
    scorer: Option<Arc<dyn PairwiseScorer>>,
    generator: Option<Arc<dyn TextGenerator>>,
    detector: Option<Arc<dyn LanguageDetector>>,
    cache: Option<Arc<dyn ResponseCache>>,
    config: Option<SearchConfig>,
}

impl SearchPipelineBuilder {
    #[must_use]
    pub fn with_encoder(mut self, encoder: Arc<dyn Encoder>) -> Self {
        self.encoder = Some(encoder);
        self
    }

    #[must_use]
    pub fn with_vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Pairwise scorer for the precision reranking pass. Without one,
    /// reranking silently degrades to retrieval order.
    #[must_use]
    pub fn with_pairwise_scorer(mut self, scorer: Arc<dyn PairwiseScorer>) -> Self {
        self.scorer = Some(scorer);
        self
    }

    /// Text generation backend for generative expansion and translation.
    #[must_use]
    pub fn with_text_generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Language detector for incoming queries. Without one, every query is
    /// assumed to be in the configured base language.
    #[must_use]
    pub fn with_language_detector(mut self, detector: Arc<dyn LanguageDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    /// Response cache backend. Defaults to a process-local
    /// [`InMemoryCache`].
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn ResponseCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: SearchConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Assemble the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] when the encoder or vector store is
    /// missing.
    pub fn build(self) -> Result<SearchPipeline, SearchError> {
        let encoder = self
            .encoder
            .ok_or_else(|| SearchError::Config("an encoder is required".to_string()))?;
        let store = self
            .store
            .ok_or_else(|| SearchError::Config("a vector store is required".to_string()))?;
        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(InMemoryCache::new()));
        let config = self.config.unwrap_or_default();

        if config.chunk_size == 0 {
            return Err(SearchError::Config(
                "chunk_size must be greater than zero".to_string(),
            ));
        }

        let vectorizer = Vectorizer::new(encoder.clone(), config.chunk_size);
        let expander = QueryExpander::new(
            self.generator.clone(),
            cache.clone(),
            config.generative_expansion,
            config.expansion_ttl(),
        );
        let reranker = Reranker::new(self.scorer);
        let enricher = TranslationEnricher::new(self.generator, config.base_language.clone());

        Ok(SearchPipeline {
            encoder,
            store,
            cache,
            detector: self.detector,
            vectorizer,
            expander,
            reranker,
            enricher,
            config,
        })
    }
}
