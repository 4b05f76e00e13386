//! OpenAI-compatible chat-completions implementation of [`TextGenerator`].
//!
//! Speaks the `/v1/chat/completions` wire shape, so any compatible backend
//! works by pointing `api_url` at it. Expansion requests demand a strict JSON
//! array back and treat anything else as a generation failure; the caller's
//! degradation policy handles the rest.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::capabilities::TextGenerator;
use crate::translate::display_language;
use crate::types::SearchError;

/// Default endpoint; override for self-hosted or proxy deployments.
pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";

const EXPANSION_SYSTEM_PROMPT: &str =
    "You are a search query optimization expert. Return only JSON arrays.";

const TRANSLATION_SYSTEM_PROMPT: &str = "You are a translation machine. Your only function is to \
     translate text. Never provide explanations, options, or additional text. Only output the \
     translated text.";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Chat-completions client for query expansion and translation.
pub struct OpenAiGenerator {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl OpenAiGenerator {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: DEFAULT_API_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// Point the client at a different chat-completions endpoint.
    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    async fn chat(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, SearchError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature,
            max_tokens,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|err| SearchError::Generation(err.to_string()))?
            .error_for_status()
            .map_err(|err| SearchError::Generation(err.to_string()))?;

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|err| SearchError::Generation(err.to_string()))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| SearchError::Generation("response carried no choices".to_string()))?;

        Ok(content.trim().to_string())
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn expand(&self, query: &str) -> Result<Vec<String>, SearchError> {
        let prompt = format!(
            "Generate 3-5 semantic search query variations for: \"{query}\"\n\
             Focus on synonyms, related concepts, and natural language expressions.\n\
             Return ONLY a JSON array of strings.\n\
             Example: [\"urban traffic congestion\", \"city traffic jams\", \"road congestion problems\"]"
        );

        let content = self.chat(EXPANSION_SYSTEM_PROMPT, &prompt, 0.7, 150).await?;
        let variations: Vec<String> = serde_json::from_str(&content).map_err(|err| {
            SearchError::Generation(format!("expansion response was not a JSON array: {err}"))
        })?;

        debug!(%query, count = variations.len(), "generated query variations");
        Ok(variations)
    }

    async fn translate(&self, text: &str, target_lang: &str) -> Result<String, SearchError> {
        let prompt = format!("Translate this to {}: {text}", display_language(target_lang));
        self.chat(TRANSLATION_SYSTEM_PROMPT, &prompt, 0.2, 400).await
    }
}
