//! Scripted phrase extractor for testing purposes.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::models::TextChunk;
use crate::phrases::{PhraseError, PhraseExtractor};

/// A phrase extractor that returns queued responses in order.
///
/// Once the queue is empty every further call yields no phrases.
#[derive(Debug, Default)]
pub struct MockExtractor {
    responses: Mutex<VecDeque<Result<Vec<String>, PhraseError>>>,
    calls: Mutex<Vec<TextChunk>>,
}

impl MockExtractor {
    /// Create a new mock extractor with nothing queued.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response.
    pub fn push_phrases<I, S>(&self, phrases: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let phrases = phrases.into_iter().map(Into::into).collect();
        self.push_result(Ok(phrases));
    }

    /// Queue a failure.
    pub fn push_error(&self, error: PhraseError) {
        self.push_result(Err(error));
    }

    fn push_result(&self, result: Result<Vec<String>, PhraseError>) {
        if let Ok(mut queue) = self.responses.lock() {
            queue.push_back(result);
        }
    }

    /// Chunks received so far, in call order.
    pub fn calls(&self) -> Vec<TextChunk> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }
}

#[async_trait]
impl PhraseExtractor for MockExtractor {
    fn name(&self) -> &str {
        "Mock Extractor"
    }

    async fn extract_phrases(&self, chunk: &TextChunk) -> Result<Vec<String>, PhraseError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(chunk.clone());
        }
        let next = self
            .responses
            .lock()
            .ok()
            .and_then(|mut queue| queue.pop_front());
        next.unwrap_or_else(|| Ok(Vec::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_serves_queue_in_order() {
        let mock = MockExtractor::new();
        mock.push_phrases(["one phrase"]);
        mock.push_error(PhraseError::Parse("bad".to_string()));

        let chunk = TextChunk::new(0, "text");
        let first = tokio_test::assert_ok!(mock.extract_phrases(&chunk).await);
        assert_eq!(first, vec!["one phrase"]);
        assert!(matches!(
            mock.extract_phrases(&chunk).await,
            Err(PhraseError::Parse(_))
        ));
        assert!(mock.extract_phrases(&chunk).await.unwrap().is_empty());
        assert_eq!(mock.call_count(), 3);
        assert_eq!(mock.calls()[0].text, "text");
    }
}
