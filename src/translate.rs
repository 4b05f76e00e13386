//! Cross-lingual enrichment of final hits.
//!
//! When the resolved target language differs from the corpus base language,
//! each hit's metadata gains a translated title and a translated, bounded
//! preview of its best body text, plus the language pair. Translation runs
//! per field and never aborts the request: a failed field keeps its original
//! text.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::capabilities::TextGenerator;
use crate::types::RankedHit;

/// Maximum characters of body text translated per hit.
pub const PREVIEW_CHARS: usize = 200;

/// Marker appended to previews that were cut.
const TRUNCATION_MARKER: &str = "...";

/// Maps a short language code to the display name handed to the translation
/// backend. Unrecognized codes fall back to English.
pub fn display_language(code: &str) -> &'static str {
    match code {
        "en" => "English",
        "mr" => "Marathi",
        "hi" => "Hindi",
        "kn" => "Kannada",
        "ta" => "Tamil",
        "te" => "Telugu",
        "gu" => "Gujarati",
        "bn" => "Bengali",
        "pa" => "Punjabi",
        "ml" => "Malayalam",
        "or" => "Odia",
        "ur" => "Urdu",
        "ne" => "Nepali",
        _ => "English",
    }
}

/// Returns at most [`PREVIEW_CHARS`] characters of `text`, appending a
/// truncation marker when cut. Counts characters, not bytes, so multi-byte
/// scripts are never split mid-character.
pub fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let cut: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{cut}{TRUNCATION_MARKER}")
    } else {
        cut
    }
}

/// Augments hits with translated title/preview metadata.
pub struct TranslationEnricher {
    generator: Option<Arc<dyn TextGenerator>>,
    base_language: String,
}

impl TranslationEnricher {
    pub fn new(generator: Option<Arc<dyn TextGenerator>>, base_language: impl Into<String>) -> Self {
        Self {
            generator,
            base_language: base_language.into(),
        }
    }

    pub fn base_language(&self) -> &str {
        &self.base_language
    }

    /// Enriches every hit in place for `target_lang`.
    ///
    /// A no-op when the target equals the base language or no generator is
    /// configured. Hits are processed one at a time in ranking order; result
    /// order is never changed. A translation failure for a field logs a
    /// warning and keeps that field's original text.
    pub async fn enrich(&self, hits: &mut [RankedHit], target_lang: &str) {
        if target_lang == self.base_language {
            return;
        }
        let Some(generator) = &self.generator else {
            debug!("no text generator configured, skipping translation");
            return;
        };

        for hit in hits.iter_mut() {
            let Some(metadata) = hit.metadata.as_object_mut() else {
                continue;
            };

            let title = metadata
                .get("title")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            if !title.is_empty() {
                let translated = match generator.translate(&title, target_lang).await {
                    Ok(translated) => translated,
                    Err(err) => {
                        warn!(%err, target_lang, "title translation failed, keeping original");
                        title.clone()
                    }
                };
                metadata.insert("title_translated".to_string(), translated.into());
            }

            // Best available body text: body, then chunk text, then the
            // title. An empty field falls through to the next one.
            let content = ["body", "text", "title"]
                .iter()
                .find_map(|field| {
                    metadata
                        .get(*field)
                        .and_then(|v| v.as_str())
                        .filter(|v| !v.is_empty())
                })
                .map(preview);
            if let Some(content) = content {
                let translated = match generator.translate(&content, target_lang).await {
                    Ok(translated) => translated,
                    Err(err) => {
                        warn!(%err, target_lang, "content translation failed, keeping original");
                        content
                    }
                };
                metadata.insert("content_translated".to_string(), translated.into());
            }

            metadata.insert(
                "original_language".to_string(),
                self.base_language.clone().into(),
            );
            metadata.insert("translated_language".to_string(), target_lang.into());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DocumentId, SearchError};
    use async_trait::async_trait;
    use serde_json::json;

    struct UppercasingTranslator;

    #[async_trait]
    impl TextGenerator for UppercasingTranslator {
        async fn expand(&self, _query: &str) -> Result<Vec<String>, SearchError> {
            Ok(Vec::new())
        }

        async fn translate(&self, text: &str, _lang: &str) -> Result<String, SearchError> {
            Ok(text.to_uppercase())
        }
    }

    struct FailingTranslator;

    #[async_trait]
    impl TextGenerator for FailingTranslator {
        async fn expand(&self, _query: &str) -> Result<Vec<String>, SearchError> {
            Ok(Vec::new())
        }

        async fn translate(&self, _text: &str, _lang: &str) -> Result<String, SearchError> {
            Err(SearchError::Generation("quota exhausted".to_string()))
        }
    }

    fn hit(metadata: serde_json::Value) -> RankedHit {
        RankedHit {
            id: DocumentId::new("doc"),
            score: 1.0,
            metadata,
            chunk_matches: 1,
            reranker_score: None,
            final_score: 1.0,
        }
    }

    #[tokio::test]
    async fn base_language_target_is_a_no_op() {
        let enricher = TranslationEnricher::new(Some(Arc::new(UppercasingTranslator)), "en");
        let mut hits = vec![hit(json!({ "title": "Hello", "text": "World" }))];

        enricher.enrich(&mut hits, "en").await;

        let metadata = hits[0].metadata.as_object().unwrap();
        assert!(!metadata.contains_key("title_translated"));
        assert!(!metadata.contains_key("content_translated"));
        assert!(!metadata.contains_key("original_language"));
    }

    #[tokio::test]
    async fn translates_title_and_preview() {
        let enricher = TranslationEnricher::new(Some(Arc::new(UppercasingTranslator)), "en");
        let mut hits = vec![hit(json!({ "title": "Hello", "text": "World" }))];

        enricher.enrich(&mut hits, "hi").await;

        let metadata = hits[0].metadata.as_object().unwrap();
        assert_eq!(metadata["title_translated"], "HELLO");
        assert_eq!(metadata["content_translated"], "WORLD");
        assert_eq!(metadata["original_language"], "en");
        assert_eq!(metadata["translated_language"], "hi");
    }

    #[tokio::test]
    async fn failure_keeps_original_text_per_field() {
        let enricher = TranslationEnricher::new(Some(Arc::new(FailingTranslator)), "en");
        let mut hits = vec![hit(json!({ "title": "Hello", "text": "World" }))];

        enricher.enrich(&mut hits, "hi").await;

        let metadata = hits[0].metadata.as_object().unwrap();
        assert_eq!(metadata["title_translated"], "Hello");
        assert_eq!(metadata["content_translated"], "World");
        assert_eq!(metadata["translated_language"], "hi");
    }

    #[tokio::test]
    async fn body_is_preferred_over_text_for_the_preview() {
        let enricher = TranslationEnricher::new(Some(Arc::new(UppercasingTranslator)), "en");
        let mut hits = vec![hit(
            json!({ "title": "T", "body": "body text", "text": "chunk text" }),
        )];

        enricher.enrich(&mut hits, "hi").await;

        assert_eq!(
            hits[0].metadata.as_object().unwrap()["content_translated"],
            "BODY TEXT"
        );
    }

    #[tokio::test]
    async fn empty_body_falls_through_to_the_chunk_text() {
        let enricher = TranslationEnricher::new(Some(Arc::new(UppercasingTranslator)), "en");
        let mut hits = vec![hit(
            json!({ "title": "T", "body": "", "text": "chunk text" }),
        )];

        enricher.enrich(&mut hits, "hi").await;

        assert_eq!(
            hits[0].metadata.as_object().unwrap()["content_translated"],
            "CHUNK TEXT"
        );
    }

    #[test]
    fn preview_truncates_long_text_with_marker() {
        let long = "x".repeat(PREVIEW_CHARS + 50);
        let p = preview(&long);
        assert_eq!(p.chars().count(), PREVIEW_CHARS + TRUNCATION_MARKER.len());
        assert!(p.ends_with(TRUNCATION_MARKER));

        let short = "short text";
        assert_eq!(preview(short), short);
        let exact = "y".repeat(PREVIEW_CHARS);
        assert_eq!(preview(&exact), exact);
    }

    #[test]
    fn display_language_falls_back_to_english() {
        assert_eq!(display_language("hi"), "Hindi");
        assert_eq!(display_language("zz"), "English");
        assert_eq!(display_language(""), "English");
    }
}
