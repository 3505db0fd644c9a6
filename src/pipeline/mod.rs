//! End-to-end orchestration: extract, chunk, ask for phrases, highlight.
//!
//! A run is a single sequential task. Chunks are sent one at a time with
//! a fixed pause between them; a chunk that fails is reported as a
//! warning and contributes no phrases. Only an unreadable input, a
//! refused confirmation or a failure to write the highlighted document
//! end the run with an error.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Config;
use crate::pdf::{extract_text, load_document, HighlightError, Highlighter, LayoutError};
use crate::phrases::PhraseExtractor;
use crate::text::chunk_text;
use crate::utils::{NoopProgress, ProgressListener, Stage};

mod gate;

pub use gate::{AlwaysProceed, ChannelGate, ConfirmationGate};

/// Pipeline-fatal errors
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid PDF: {0}")]
    InvalidPdf(#[from] LayoutError),

    #[error("Highlighting failed: {0}")]
    Highlight(#[from] HighlightError),

    #[error("Processing of {chunks} chunks was not confirmed")]
    Declined { chunks: usize },
}

/// Tunables for a run
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub max_chunk_size: usize,
    pub min_phrase_len: usize,
    pub inter_chunk_delay: Duration,
    pub warn_threshold: usize,
    pub confirm_threshold: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for PipelineSettings {
    fn from(config: &Config) -> Self {
        Self {
            max_chunk_size: config.chunking.max_chunk_size,
            min_phrase_len: config.highlight.min_phrase_len,
            inter_chunk_delay: config.pipeline.inter_chunk_delay(),
            warn_threshold: config.pipeline.warn_threshold,
            confirm_threshold: config.pipeline.confirm_threshold,
        }
    }
}

/// Result of a successful run
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Highlighted document, or the input bytes when nothing was marked
    pub pdf: Vec<u8>,
    /// Characters of extracted text
    pub characters: usize,
    /// Chunks processed
    pub chunks: usize,
    /// Phrases in chunk order, then response order
    pub phrases: Vec<String>,
    /// Highlight annotations attached
    pub annotations: usize,
    /// Phrases that matched nowhere
    pub unmatched: Vec<String>,
    /// Non-fatal issues raised during the run
    pub warnings: Vec<String>,
}

/// Key-phrase highlighting pipeline
pub struct Pipeline {
    settings: PipelineSettings,
    extractor: Arc<dyn PhraseExtractor>,
    listener: Arc<dyn ProgressListener>,
    gate: Arc<dyn ConfirmationGate>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("settings", &self.settings)
            .field("extractor", &self.extractor.name())
            .finish()
    }
}

impl Pipeline {
    pub fn new(settings: PipelineSettings, extractor: Arc<dyn PhraseExtractor>) -> Self {
        Self {
            settings,
            extractor,
            listener: Arc::new(NoopProgress),
            gate: Arc::new(AlwaysProceed),
        }
    }

    pub fn with_listener(mut self, listener: Arc<dyn ProgressListener>) -> Self {
        self.listener = listener;
        self
    }

    pub fn with_gate(mut self, gate: Arc<dyn ConfirmationGate>) -> Self {
        self.gate = gate;
        self
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Run the whole pipeline over a PDF held in memory
    pub async fn run(&self, pdf: &[u8]) -> Result<PipelineOutput, PipelineError> {
        let listener = self.listener.as_ref();
        let mut warnings = Vec::new();

        listener.stage(Stage::Extracting);
        let document = load_document(pdf)?;
        let text = extract_text(&document);
        let characters = text.chars().count();
        info!(
            "Extracted {} characters from {} pages",
            characters,
            document.page_count()
        );

        listener.stage(Stage::Chunking);
        let chunks = chunk_text(&text, self.settings.max_chunk_size);
        let total = chunks.len();
        info!("Document split into {} chunks", total);

        if chunks.is_empty() {
            listener.stage(Stage::Done);
            return Ok(PipelineOutput {
                pdf: pdf.to_vec(),
                characters,
                chunks: 0,
                phrases: Vec::new(),
                annotations: 0,
                unmatched: Vec::new(),
                warnings,
            });
        }

        if total > self.settings.warn_threshold {
            let message = format!(
                "Large document with {} chunks; processing may take a while because of API rate limits",
                total
            );
            listener.warning(&message);
            warnings.push(message);
        }

        if total > self.settings.confirm_threshold {
            listener.stage(Stage::AwaitingConfirmation);
            if !self.gate.confirm(total).await {
                info!("Run declined before processing {} chunks", total);
                return Err(PipelineError::Declined { chunks: total });
            }
        }

        listener.stage(Stage::ExtractingPhrases);
        let mut phrases = Vec::new();
        for (i, chunk) in chunks.iter().enumerate() {
            listener.chunk_started(i + 1, total);

            match self.extractor.extract_phrases(chunk).await {
                Ok(found) => phrases.extend(found),
                Err(e) => {
                    let message = format!("Chunk {} of {}: {}", i + 1, total, e);
                    warn!("{}", message);
                    listener.warning(&message);
                    warnings.push(message);
                }
            }

            listener.chunk_completed(i + 1, total);

            if i + 1 < total && !self.settings.inter_chunk_delay.is_zero() {
                tokio::time::sleep(self.settings.inter_chunk_delay).await;
            }
        }
        info!("Collected {} candidate phrases", phrases.len());

        listener.stage(Stage::Highlighting);
        let report = Highlighter::new(self.settings.min_phrase_len).highlight(&document, &phrases)?;
        listener.stage(Stage::Done);

        Ok(PipelineOutput {
            pdf: report.pdf,
            characters,
            chunks: total,
            phrases,
            annotations: report.annotations.len(),
            unmatched: report.unmatched,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::test_support::build_pdf;
    use crate::phrases::{MockExtractor, PhraseError};
    use crate::utils::{ProgressEvent, RecordingProgress};

    fn settings() -> PipelineSettings {
        PipelineSettings {
            inter_chunk_delay: Duration::ZERO,
            ..PipelineSettings::default()
        }
    }

    fn pages(count: usize) -> Vec<u8> {
        let pages: Vec<_> = (0..count)
            .map(|i| vec![(72.0, 700.0, 12.0, if i % 2 == 0 { "Even page sentence." } else { "Odd page sentence." })])
            .collect();
        build_pdf(&pages)
    }

    #[tokio::test]
    async fn test_run_highlights_found_phrases() {
        let bytes = build_pdf(&[
            vec![(72.0, 700.0, 12.0, "Alpha point one.")],
            vec![(72.0, 700.0, 12.0, "Beta point two.")],
        ]);
        let mock = Arc::new(MockExtractor::new());
        mock.push_phrases(["Alpha point one.", "Nonexistent phrase"]);

        let output = Pipeline::new(settings(), mock.clone()).run(&bytes).await.unwrap();

        assert_eq!(output.characters, "Alpha point one.\n\nBeta point two.".chars().count());
        assert_eq!(output.chunks, 1);
        assert_eq!(output.annotations, 1);
        assert_eq!(output.unmatched, vec!["Nonexistent phrase".to_string()]);
        assert_eq!(mock.calls()[0].text, "Alpha point one.\n\nBeta point two.");
        assert!(output.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_empty_document_is_returned_unchanged() {
        let bytes = build_pdf(&[]);
        let mock = Arc::new(MockExtractor::new());

        let output = Pipeline::new(settings(), mock.clone()).run(&bytes).await.unwrap();

        assert_eq!(output.pdf, bytes);
        assert_eq!(output.chunks, 0);
        assert!(output.phrases.is_empty());
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_pdf_is_fatal() {
        let mock = Arc::new(MockExtractor::new());
        let result = Pipeline::new(settings(), mock).run(b"not a pdf").await;
        assert!(matches!(result, Err(PipelineError::InvalidPdf(_))));
    }

    #[tokio::test]
    async fn test_chunk_failure_becomes_warning() {
        let bytes = pages(3);
        let mock = Arc::new(MockExtractor::new());
        mock.push_error(PhraseError::Api {
            status: 500,
            body: "boom".to_string(),
        });
        mock.push_phrases(["Odd page sentence."]);
        let progress = Arc::new(RecordingProgress::new());

        let output = Pipeline::new(
            PipelineSettings {
                max_chunk_size: 10,
                ..settings()
            },
            mock.clone(),
        )
        .with_listener(progress.clone())
        .run(&bytes)
        .await
        .unwrap();

        assert_eq!(output.chunks, 3);
        assert_eq!(mock.call_count(), 3);
        assert_eq!(output.phrases, vec!["Odd page sentence.".to_string()]);
        assert_eq!(output.annotations, 1);
        assert_eq!(output.warnings.len(), 1);
        assert!(output.warnings[0].starts_with("Chunk 1 of 3"));
        assert_eq!(progress.warnings(), output.warnings);

        let completed: Vec<_> = progress
            .events()
            .into_iter()
            .filter(|e| matches!(e, ProgressEvent::ChunkCompleted(..)))
            .collect();
        assert_eq!(
            completed,
            vec![
                ProgressEvent::ChunkCompleted(1, 3),
                ProgressEvent::ChunkCompleted(2, 3),
                ProgressEvent::ChunkCompleted(3, 3),
            ]
        );
    }

    #[tokio::test]
    async fn test_large_document_warns() {
        let bytes = pages(6);
        let mock = Arc::new(MockExtractor::new());
        let progress = Arc::new(RecordingProgress::new());

        let output = Pipeline::new(
            PipelineSettings {
                max_chunk_size: 10,
                ..settings()
            },
            mock,
        )
        .with_listener(progress.clone())
        .run(&bytes)
        .await
        .unwrap();

        assert_eq!(output.chunks, 6);
        assert_eq!(output.warnings.len(), 1);
        assert!(output.warnings[0].starts_with("Large document with 6 chunks"));
        assert!(!progress
            .events()
            .contains(&ProgressEvent::Stage(Stage::AwaitingConfirmation)));
    }

    #[tokio::test]
    async fn test_large_run_waits_for_confirmation() {
        let bytes = pages(12);
        let mock = Arc::new(MockExtractor::new());
        let (gate, go) = ChannelGate::new();
        let pipeline = Arc::new(
            Pipeline::new(
                PipelineSettings {
                    max_chunk_size: 10,
                    ..settings()
                },
                mock.clone(),
            )
            .with_gate(Arc::new(gate)),
        );

        let handle = {
            let pipeline = pipeline.clone();
            tokio::spawn(async move { pipeline.run(&bytes).await })
        };

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!handle.is_finished());
        assert_eq!(mock.call_count(), 0);

        go.send(true).unwrap();
        let output = tokio::time::timeout(Duration::from_secs(10), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();

        assert_eq!(output.chunks, 12);
        assert_eq!(mock.call_count(), 12);
    }

    #[tokio::test]
    async fn test_declined_confirmation_aborts() {
        let bytes = pages(11);
        let mock = Arc::new(MockExtractor::new());
        let (gate, go) = ChannelGate::new();
        go.send(false).unwrap();

        let result = Pipeline::new(
            PipelineSettings {
                max_chunk_size: 10,
                ..settings()
            },
            mock.clone(),
        )
        .with_gate(Arc::new(gate))
        .run(&bytes)
        .await;

        assert!(matches!(result, Err(PipelineError::Declined { chunks: 11 })));
        assert_eq!(mock.call_count(), 0);
    }
}
