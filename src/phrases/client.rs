//! Groq chat-completions client.
//!
//! Speaks the OpenAI-compatible `chat/completions` protocol. Rate-limited
//! requests (HTTP 429) are retried per [`RetryPolicy`], waiting for the
//! "try again in" hint from the error body when the service sends one.

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ServiceConfig;
use crate::models::TextChunk;
use crate::phrases::prompt::{user_prompt, SYSTEM_PROMPT};
use crate::phrases::{parse_phrases, PhraseError, PhraseExtractor};
use crate::utils::{
    hint_from_secs, parse_retry_after, with_retry, AttemptError, HttpClient, RetryError,
    RetryPolicy,
};

#[derive(Debug, Serialize)]
struct GroqRequest<'a> {
    model: &'a str,
    messages: Vec<GroqMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
}

#[derive(Debug, Serialize)]
struct GroqMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct GroqResponse {
    choices: Option<Vec<GroqChoice>>,
}

#[derive(Debug, Deserialize)]
struct GroqChoice {
    message: GroqResponseMessage,
}

#[derive(Debug, Deserialize)]
struct GroqResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GroqErrorBody {
    error: Option<GroqError>,
}

#[derive(Debug, Deserialize)]
struct GroqError {
    message: String,
}

/// Phrase extractor backed by the Groq API
#[derive(Clone)]
pub struct GroqClient {
    http: HttpClient,
    api_key: String,
    service: ServiceConfig,
    policy: RetryPolicy,
}

impl std::fmt::Debug for GroqClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroqClient")
            .field("endpoint", &self.service.endpoint)
            .field("model", &self.service.model)
            .field("api_key", &"<redacted>")
            .field("policy", &self.policy)
            .finish()
    }
}

impl GroqClient {
    /// Create a client; the key is checked before any request is made
    pub fn new(
        api_key: impl Into<String>,
        service: ServiceConfig,
        policy: RetryPolicy,
    ) -> Result<Self, PhraseError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(PhraseError::MissingApiKey);
        }
        let http = HttpClient::new(service.timeout())?;
        Ok(Self {
            http,
            api_key,
            service,
            policy,
        })
    }

    /// Point the client at another endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.service.endpoint = endpoint.into();
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.service.endpoint
    }

    pub fn model(&self) -> &str {
        &self.service.model
    }

    fn build_request<'a>(&'a self, prompt: &'a str) -> GroqRequest<'a> {
        GroqRequest {
            model: &self.service.model,
            messages: vec![
                GroqMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                GroqMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.service.temperature,
            max_tokens: self.service.max_tokens,
            top_p: self.service.top_p,
        }
    }

    async fn attempt(
        &self,
        request: &GroqRequest<'_>,
        chunk_index: usize,
        attempt: u32,
    ) -> Result<Vec<String>, AttemptError<PhraseError>> {
        debug!(
            "Sending chunk {} to {} (attempt {})",
            chunk_index + 1,
            self.service.endpoint,
            attempt
        );

        let response = self
            .http
            .client()
            .post(&self.service.endpoint)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| AttemptError::Permanent(e.into()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let header_hint = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<f64>().ok())
                .and_then(hint_from_secs);
            let body = response.text().await.unwrap_or_default();
            return Err(AttemptError::RateLimited(rate_limit_hint(&body).or(header_hint)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AttemptError::Permanent(e.into()))?;

        if !status.is_success() {
            return Err(AttemptError::Permanent(PhraseError::Api {
                status: status.as_u16(),
                body,
            }));
        }

        parse_completion(&body).map_err(AttemptError::Permanent)
    }
}

/// Retry hint from a 429 body: the JSON error message, else the raw text
fn rate_limit_hint(body: &str) -> Option<Duration> {
    let message = serde_json::from_str::<GroqErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .map(|e| e.message);
    message
        .as_deref()
        .and_then(parse_retry_after)
        .or_else(|| parse_retry_after(body))
}

/// Phrases from a successful completion body
fn parse_completion(body: &str) -> Result<Vec<String>, PhraseError> {
    let response: GroqResponse = serde_json::from_str(body)?;
    let choice = response
        .choices
        .and_then(|choices| choices.into_iter().next())
        .ok_or_else(|| PhraseError::Parse("response has no choices".to_string()))?;
    Ok(parse_phrases(choice.message.content.as_deref().unwrap_or_default()))
}

#[async_trait]
impl PhraseExtractor for GroqClient {
    fn name(&self) -> &str {
        "Groq"
    }

    async fn extract_phrases(&self, chunk: &TextChunk) -> Result<Vec<String>, PhraseError> {
        if chunk.is_blank() {
            debug!("Chunk {} is blank, skipping request", chunk.index + 1);
            return Ok(Vec::new());
        }

        let prompt = user_prompt(&chunk.text);
        let request = self.build_request(&prompt);

        let result = with_retry(self.policy, |attempt| self.attempt(&request, chunk.index, attempt)).await;
        match result {
            Ok(phrases) => {
                debug!("Chunk {} yielded {} phrases", chunk.index + 1, phrases.len());
                Ok(phrases)
            }
            Err(RetryError::Exhausted { attempts }) => {
                warn!("Chunk {}: rate limit persisted over {} attempts", chunk.index + 1, attempts);
                Err(PhraseError::RateLimited { attempts })
            }
            Err(RetryError::Permanent(error)) => {
                warn!("Chunk {}: {}", chunk.index + 1, error);
                Err(error)
            }
        }
    }
}
