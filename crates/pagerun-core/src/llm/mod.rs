//! Hosted language-model integration for keyword extraction.
//!
//! The model call is a plain chat completion with a fixed system prompt and a
//! fixed sampling temperature; the interesting part is only the parsing of the
//! comma-separated reply. Model quality is explicitly out of scope.

use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::CoreError;

pub mod providers;

pub use providers::openai::OpenAiClient;

/// System prompt sent with every keyword-extraction request.
pub const KEYWORD_SYSTEM_PROMPT: &str = "You are a keyword extraction assistant. \
Extract the most relevant keywords from the provided text and return them as a \
single comma-separated list with no additional commentary.";

/// Sampling temperature for keyword extraction.
pub const KEYWORD_TEMPERATURE: f64 = 0.3;

/// Minimal chat-completion seam, so the extractor can be tested without a
/// network and swapped to another provider without touching callers.
#[async_trait]
pub trait Llm: Send + Sync {
    async fn generate(&self, system: &str, user: &str) -> Result<String, CoreError>;
}

/// Extracts keywords from free text via a hosted model.
#[derive(Clone)]
pub struct KeywordExtractor {
    llm: Arc<dyn Llm>,
}

impl KeywordExtractor {
    pub fn new(llm: Arc<dyn Llm>) -> Self {
        Self { llm }
    }

    pub async fn extract(&self, text: &str) -> Result<Vec<String>, CoreError> {
        if text.trim().is_empty() {
            return Err(CoreError::Validation("No text provided".to_string()));
        }
        let raw = self.llm.generate(KEYWORD_SYSTEM_PROMPT, text).await?;
        log::debug!("keyword model replied: {}", raw);
        Ok(parse_keywords(&raw))
    }
}

/// Split the model's comma-separated reply, trimming entries and discarding
/// empties.
pub fn parse_keywords(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(String::from)
        .collect()
}
