//! Response caching: key normalization and an in-memory TTL store.
//!
//! Cache keys are normalized so two requests that differ only by query casing
//! or surrounding whitespace share one entry. The bundled [`InMemoryCache`]
//! backs tests and single-process deployments; production deployments hand
//! the pipeline a [`ResponseCache`] over their shared store instead.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::capabilities::ResponseCache;

/// Normalized key for a full search response.
///
/// Two requests differing only by query casing or surrounding whitespace must
/// hit the same entry, so the query is trimmed and lower-cased before being
/// joined with the remaining request signature.
pub fn search_cache_key(query: &str, top_k: usize, use_reranking: bool, target_lang: &str) -> String {
    format!(
        "search:{}:{top_k}:{use_reranking}:{target_lang}",
        query.trim().to_lowercase()
    )
}

/// Normalized key for a cached generative expansion.
pub fn expansion_cache_key(query: &str) -> String {
    format!("llm_expansion:{}", query.trim().to_lowercase())
}

/// Process-wide in-memory cache with per-entry expiry.
///
/// Entries are never deleted eagerly; an expired entry is logically absent on
/// read and physically replaced on the next overwrite.
#[derive(Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<String, CacheSlot>>,
}

struct CacheSlot {
    value: String,
    expires_at: Instant,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of physically stored entries, including expired ones.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl ResponseCache for InMemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.read();
        let slot = entries.get(key)?;
        if Instant::now() >= slot.expires_at {
            return None;
        }
        Some(slot.value.clone())
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) {
        let slot = CacheSlot {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().insert(key.to_string(), slot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_normalize_case_and_whitespace() {
        let a = search_cache_key("  Cheap Flowers ", 5, true, "en");
        let b = search_cache_key("cheap flowers", 5, true, "en");
        assert_eq!(a, b);
        assert_eq!(a, "search:cheap flowers:5:true:en");
    }

    #[test]
    fn keys_distinguish_every_signature_field() {
        let base = search_cache_key("q", 5, true, "en");
        assert_ne!(base, search_cache_key("q", 10, true, "en"));
        assert_ne!(base, search_cache_key("q", 5, false, "en"));
        assert_ne!(base, search_cache_key("q", 5, true, "hi"));
    }

    #[test]
    fn expansion_keys_are_lowercased() {
        assert_eq!(expansion_cache_key(" Flowers"), "llm_expansion:flowers");
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let cache = InMemoryCache::new();
        cache
            .set("k", "v".to_string(), Duration::from_secs(60))
            .await;
        assert_eq!(cache.get("k").await.as_deref(), Some("v"));
        assert_eq!(cache.get("missing").await, None);
    }

    #[tokio::test]
    async fn expired_entries_are_logically_absent() {
        let cache = InMemoryCache::new();
        cache.set("k", "v".to_string(), Duration::ZERO).await;
        assert_eq!(cache.get("k").await, None);
        // Still physically present until overwritten.
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn overwrites_replace_the_previous_value() {
        let cache = InMemoryCache::new();
        cache
            .set("k", "old".to_string(), Duration::from_secs(60))
            .await;
        cache
            .set("k", "new".to_string(), Duration::from_secs(60))
            .await;
        assert_eq!(cache.get("k").await.as_deref(), Some("new"));
        assert_eq!(cache.len(), 1);
    }
}
