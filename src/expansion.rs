//! Query expansion: a static pattern table plus an optional generative layer.
//!
//! Terse queries embed poorly, so every query of two words or fewer is
//! guaranteed to grow: the first matching pattern in a fixed, ordered table
//! appends its expansion phrase (first match wins, scanning stops), and a
//! generic suffix covers queries no pattern recognizes.
//!
//! The generative layer asks a text-generation backend for a strict JSON
//! array of rewordings and caches the parsed list, since expansions depend on
//! nothing but the query text. It never fails upward: any error degrades to
//! "no extra variations".

use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::cache::expansion_cache_key;
use crate::capabilities::{ResponseCache, TextGenerator};

/// Appended when no pattern in the table matches a short query.
pub const FALLBACK_SUFFIX: &str = "related article blog post";

/// Queries longer than this many words skip static expansion.
const STATIC_EXPANSION_MAX_WORDS: usize = 2;

/// Queries longer than this many words skip generative expansion.
const GENERATIVE_EXPANSION_MAX_WORDS: usize = 3;

/// Generated variations kept beyond the original query.
const MAX_VARIATIONS: usize = 4;

/// One `(pattern, expansion phrase)` entry of the static table.
#[derive(Clone, Debug)]
pub struct ExpansionRule {
    pattern: Regex,
    phrase: &'static str,
}

impl ExpansionRule {
    fn new(pattern: &str, phrase: &'static str) -> Self {
        Self {
            // Table patterns are compile-time constants; an invalid one is a
            // programming error caught by the default_rules test.
            pattern: Regex::new(&format!("(?i){pattern}")).expect("expansion pattern is valid"),
            phrase,
        }
    }
}

/// The fixed, ordered expansion table. Order matters: the first matching
/// pattern wins and scanning stops.
pub fn default_rules() -> Vec<ExpansionRule> {
    vec![
        ExpansionRule::new(r"\btraffic\b", "urban traffic congestion city roads jam"),
        ExpansionRule::new(r"\bflower\b", "flowers gardening plants blossom bloom"),
        ExpansionRule::new(r"\bcheap\b", "affordable inexpensive budget low cost"),
        ExpansionRule::new(r"\bhobby\b", "hobbies leisure activity pastime"),
        ExpansionRule::new(r"\bjogging\b", "running exercise fitness workout"),
        ExpansionRule::new(r"\bcity\b", "big city metropolis urban"),
        ExpansionRule::new(r"\bhappy\b", "joyful happiness contentment"),
    ]
}

/// Rewrites under-specified queries into richer query text.
pub struct QueryExpander {
    rules: Vec<ExpansionRule>,
    generator: Option<Arc<dyn TextGenerator>>,
    cache: Arc<dyn ResponseCache>,
    generative_enabled: bool,
    expansion_ttl: Duration,
}

impl QueryExpander {
    pub fn new(
        generator: Option<Arc<dyn TextGenerator>>,
        cache: Arc<dyn ResponseCache>,
        generative_enabled: bool,
        expansion_ttl: Duration,
    ) -> Self {
        Self {
            rules: default_rules(),
            generator,
            cache,
            generative_enabled,
            expansion_ttl,
        }
    }

    /// Replace the static expansion table.
    #[must_use]
    pub fn with_rules(mut self, rules: Vec<ExpansionRule>) -> Self {
        self.rules = rules;
        self
    }

    /// Static expansion: pure, no I/O, always produces exactly one query.
    ///
    /// Queries with more than two words pass through unchanged. Otherwise the
    /// first matching table entry appends its phrase; with no match the
    /// generic [`FALLBACK_SUFFIX`] is appended, so every short query becomes
    /// a longer one.
    pub fn static_expand(&self, query: &str) -> String {
        if query.split_whitespace().count() > STATIC_EXPANSION_MAX_WORDS {
            return query.to_string();
        }

        for rule in &self.rules {
            if rule.pattern.is_match(query) {
                let expanded = format!("{query} {}", rule.phrase);
                debug!(%query, %expanded, "static query expansion");
                return expanded;
            }
        }

        let expanded = format!("{query} {FALLBACK_SUFFIX}");
        debug!(%query, %expanded, "fallback query expansion");
        expanded
    }

    /// Generative expansion: returns extra query variations, or an empty list.
    ///
    /// Gated on configuration, a configured generator, and query length (at
    /// most three words). Parsed variations are cached under the lower-cased
    /// query with a long TTL. This path never raises: every failure is logged
    /// and degrades to no variations.
    pub async fn generative_variations(&self, query: &str) -> Vec<String> {
        if !self.generative_enabled
            || query.is_empty()
            || query.split_whitespace().count() > GENERATIVE_EXPANSION_MAX_WORDS
        {
            return Vec::new();
        }
        let Some(generator) = &self.generator else {
            return Vec::new();
        };

        let key = expansion_cache_key(query);
        if let Some(cached) = self.cache.get(&key).await {
            match serde_json::from_str::<Vec<String>>(&cached) {
                Ok(variations) => return variations,
                Err(err) => warn!(%key, %err, "discarding malformed cached expansion"),
            }
        }

        match generator.expand(query).await {
            Ok(variations) => {
                let variations: Vec<String> = variations
                    .into_iter()
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case(query))
                    .take(MAX_VARIATIONS)
                    .collect();
                match serde_json::to_string(&variations) {
                    Ok(serialized) => {
                        self.cache.set(&key, serialized, self.expansion_ttl).await;
                    }
                    Err(err) => warn!(%err, "failed to serialize expansion for caching"),
                }
                debug!(%query, count = variations.len(), "generative query expansion");
                variations
            }
            Err(err) => {
                warn!(%query, %err, "generative expansion failed, using original query only");
                Vec::new()
            }
        }
    }
}
