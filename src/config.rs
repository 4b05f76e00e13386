//! Pipeline configuration with compiled defaults and environment overlay.
//!
//! Defaults match the production deployment of the original service. The
//! builder optionally overlays `SEMSEARCH_*` environment variables (loading a
//! `.env` file first when present), so deployments tune the pipeline without
//! code changes:
//!
//! - `SEMSEARCH_CHUNK_SIZE` — words per body chunk
//! - `SEMSEARCH_INITIAL_CANDIDATES` — retrieval pool size before aggregation
//! - `SEMSEARCH_MIN_SCORE_THRESHOLD` — relevance floor (may be negative)
//! - `SEMSEARCH_RERANK_ENABLED` — global rerank switch
//! - `SEMSEARCH_CACHE_TTL` — response cache TTL in seconds
//! - `SEMSEARCH_LLM_ENABLED` — generative query expansion switch
//! - `SEMSEARCH_BASE_LANGUAGE` — content base language code

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::types::SearchError;

fn default_chunk_size() -> usize {
    200
}

fn default_initial_candidates() -> usize {
    50
}

fn default_min_score_threshold() -> f32 {
    -15.0
}

fn default_rerank_enabled() -> bool {
    true
}

fn default_cache_ttl_secs() -> u64 {
    3600
}

fn default_expansion_ttl_multiplier() -> u32 {
    24
}

fn default_base_language() -> String {
    "en".to_string()
}

/// Tuning knobs for the retrieval and ranking pipeline.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Words per body chunk at vectorization time.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Nearest-neighbor pool requested from the vector store before
    /// document-level aggregation; deliberately larger than any `top_k`.
    #[serde(default = "default_initial_candidates")]
    pub initial_candidates: usize,

    /// Inclusive relevance floor applied to `final_score`. Signed, because
    /// pairwise relevance models score below zero.
    #[serde(default = "default_min_score_threshold")]
    pub min_score_threshold: f32,

    /// Global reranking switch; a request's `use_reranking` flag can only
    /// narrow this, never widen it.
    #[serde(default = "default_rerank_enabled")]
    pub rerank_enabled: bool,

    /// Response cache TTL in seconds.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Generative expansions are query-text-pure, so they live much longer
    /// than responses: `cache_ttl_secs * expansion_ttl_multiplier`.
    #[serde(default = "default_expansion_ttl_multiplier")]
    pub expansion_ttl_multiplier: u32,

    /// Enables the generative (LLM) query-expansion layer.
    #[serde(default)]
    pub generative_expansion: bool,

    /// Language the corpus is authored in; translation is skipped when the
    /// target language equals this code.
    #[serde(default = "default_base_language")]
    pub base_language: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            initial_candidates: default_initial_candidates(),
            min_score_threshold: default_min_score_threshold(),
            rerank_enabled: default_rerank_enabled(),
            cache_ttl_secs: default_cache_ttl_secs(),
            expansion_ttl_multiplier: default_expansion_ttl_multiplier(),
            generative_expansion: false,
            base_language: default_base_language(),
        }
    }
}

impl SearchConfig {
    /// Start building a configuration from the compiled defaults.
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// TTL for cached search responses.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// TTL for cached generative expansions.
    pub fn expansion_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs * u64::from(self.expansion_ttl_multiplier))
    }
}

/// Builder that layers environment variables over the compiled defaults.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    base: SearchConfig,
    use_env: bool,
}

impl ConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            base: SearchConfig::default(),
            use_env: false,
        }
    }

    /// Replace the starting configuration.
    #[must_use]
    pub fn with_base(mut self, base: SearchConfig) -> Self {
        self.base = base;
        self
    }

    /// Enable the `SEMSEARCH_*` environment overlay.
    #[must_use]
    pub fn with_env(mut self) -> Self {
        self.use_env = true;
        self
    }

    /// Build the final configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] when an environment variable is set
    /// but does not parse, or when the resulting values are unusable.
    pub fn build(mut self) -> Result<SearchConfig, SearchError> {
        if self.use_env {
            dotenvy::dotenv().ok();

            overlay(&mut self.base.chunk_size, "SEMSEARCH_CHUNK_SIZE")?;
            overlay(
                &mut self.base.initial_candidates,
                "SEMSEARCH_INITIAL_CANDIDATES",
            )?;
            overlay(
                &mut self.base.min_score_threshold,
                "SEMSEARCH_MIN_SCORE_THRESHOLD",
            )?;
            overlay(&mut self.base.rerank_enabled, "SEMSEARCH_RERANK_ENABLED")?;
            overlay(&mut self.base.cache_ttl_secs, "SEMSEARCH_CACHE_TTL")?;
            overlay(&mut self.base.generative_expansion, "SEMSEARCH_LLM_ENABLED")?;
            if let Ok(lang) = std::env::var("SEMSEARCH_BASE_LANGUAGE") {
                self.base.base_language = lang;
            }
        }

        if self.base.chunk_size == 0 {
            return Err(SearchError::Config(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.base.initial_candidates == 0 {
            return Err(SearchError::Config(
                "initial_candidates must be greater than zero".to_string(),
            ));
        }
        if self.base.base_language.trim().is_empty() {
            return Err(SearchError::Config(
                "base_language must not be empty".to_string(),
            ));
        }

        Ok(self.base)
    }
}

fn overlay<T>(slot: &mut T, key: &str) -> Result<(), SearchError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => {
            *slot = raw
                .parse()
                .map_err(|err| SearchError::Config(format!("{key}: {err}")))?;
            Ok(())
        }
        Err(_) => Ok(()),
    }
}
