//! Key-phrase extraction through an external language-model service.
//!
//! The pipeline talks to a [`PhraseExtractor`]; [`GroqClient`] is the
//! production implementation and [`MockExtractor`] serves scripted
//! answers in tests.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::TextChunk;

mod client;
mod mock;
mod prompt;

pub use client::GroqClient;
pub use mock::MockExtractor;
pub use prompt::{user_prompt, SYSTEM_PROMPT};

/// Source of candidate key phrases for a chunk of text
#[async_trait]
pub trait PhraseExtractor: Send + Sync + std::fmt::Debug {
    /// Human-readable name of the service
    fn name(&self) -> &str;

    /// Ask the service for the key phrases of one chunk, in response order
    async fn extract_phrases(&self, chunk: &TextChunk) -> Result<Vec<String>, PhraseError>;
}

/// Errors that can occur while extracting phrases for a chunk
#[derive(Debug, Error)]
pub enum PhraseError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (HTTP {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Rate limit still exceeded after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("No API key configured (set GROQ_API_KEY or [service] api_key)")]
    MissingApiKey,
}

impl From<reqwest::Error> for PhraseError {
    fn from(err: reqwest::Error) -> Self {
        PhraseError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for PhraseError {
    fn from(err: serde_json::Error) -> Self {
        PhraseError::Parse(format!("JSON: {}", err))
    }
}

/// Split a service answer into phrases: one per line, trimmed, blank
/// lines dropped
pub fn parse_phrases(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
