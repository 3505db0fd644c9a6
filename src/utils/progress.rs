//! Progress reporting for the highlighting pipeline.
//!
//! The pipeline reports through a [`ProgressListener`]; the CLI renders
//! it with a terminal progress bar, tests record it, and library users
//! can plug in a plain callback.
//!
//! ```
//! use pdf_highlighter::utils::{CallbackProgress, ProgressListener};
//!
//! let progress = CallbackProgress::new(|current, total| {
//!     println!("chunk {current}/{total}");
//! });
//! progress.chunk_completed(1, 3);
//! ```

use std::fmt;
use std::sync::{Arc, Mutex};

/// Coarse phases of a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extracting,
    Chunking,
    AwaitingConfirmation,
    ExtractingPhrases,
    Highlighting,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Extracting => "Extracting text",
            Stage::Chunking => "Splitting text into chunks",
            Stage::AwaitingConfirmation => "Waiting for confirmation",
            Stage::ExtractingPhrases => "Extracting key phrases",
            Stage::Highlighting => "Highlighting phrases",
            Stage::Done => "Done",
        };
        f.write_str(label)
    }
}

/// Receiver of pipeline progress; every method defaults to a no-op
pub trait ProgressListener: Send + Sync {
    fn stage(&self, _stage: Stage) {}

    /// A chunk is about to be sent (1-based `current`)
    fn chunk_started(&self, _current: usize, _total: usize) {}

    /// A chunk has been processed (1-based `current`)
    fn chunk_completed(&self, _current: usize, _total: usize) {}

    /// A non-fatal issue worth showing to the user
    fn warning(&self, _message: &str) {}
}

/// Listener that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressListener for NoopProgress {}

/// Listener forwarding chunk completion to a callback
#[derive(Clone)]
pub struct CallbackProgress {
    callback: Arc<dyn Fn(usize, usize) + Send + Sync>,
}

impl CallbackProgress {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(usize, usize) + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(callback),
        }
    }
}

impl fmt::Debug for CallbackProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackProgress")
            .field("callback", &"Fn(usize, usize)")
            .finish()
    }
}

impl ProgressListener for CallbackProgress {
    fn chunk_completed(&self, current: usize, total: usize) {
        (self.callback)(current, total);
    }
}

/// Event captured by [`RecordingProgress`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Stage(Stage),
    ChunkStarted(usize, usize),
    ChunkCompleted(usize, usize),
    Warning(String),
}

/// Listener that keeps every event in memory
#[derive(Debug, Clone, Default)]
pub struct RecordingProgress {
    events: Arc<Mutex<Vec<ProgressEvent>>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events received so far
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::Warning(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: ProgressEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl ProgressListener for RecordingProgress {
    fn stage(&self, stage: Stage) {
        self.push(ProgressEvent::Stage(stage));
    }

    fn chunk_started(&self, current: usize, total: usize) {
        self.push(ProgressEvent::ChunkStarted(current, total));
    }

    fn chunk_completed(&self, current: usize, total: usize) {
        self.push(ProgressEvent::ChunkCompleted(current, total));
    }

    fn warning(&self, message: &str) {
        self.push(ProgressEvent::Warning(message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_callback_progress() {
        let seen = Arc::new(AtomicUsize::new(0));
        let progress = {
            let seen = seen.clone();
            CallbackProgress::new(move |current, _total| {
                seen.store(current, Ordering::SeqCst);
            })
        };

        progress.chunk_started(2, 3);
        assert_eq!(seen.load(Ordering::SeqCst), 0);

        progress.chunk_completed(2, 3);
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_recording_progress() {
        let progress = RecordingProgress::new();
        progress.stage(Stage::Chunking);
        progress.chunk_completed(1, 2);
        progress.warning("slow");

        assert_eq!(
            progress.events(),
            vec![
                ProgressEvent::Stage(Stage::Chunking),
                ProgressEvent::ChunkCompleted(1, 2),
                ProgressEvent::Warning("slow".to_string()),
            ]
        );
        assert_eq!(progress.warnings(), vec!["slow".to_string()]);
    }

    #[test]
    fn test_stage_labels() {
        assert_eq!(Stage::ExtractingPhrases.to_string(), "Extracting key phrases");
    }
}
