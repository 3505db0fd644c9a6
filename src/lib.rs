//! # PDF Highlighter
//!
//! Highlights the key phrases of a PDF document. The text of the
//! document is split into paragraph-aligned chunks, each chunk is sent
//! to a language-model service that answers with verbatim key phrases,
//! and every occurrence of those phrases is marked with a yellow
//! highlight annotation on a new copy of the document.
//!
//! ## Architecture
//!
//! - [`pdf`]: text-layout index, text extraction and the highlighter
//! - [`text`]: paragraph-aligned chunking
//! - [`phrases`]: the phrase service trait, the Groq client and a mock
//! - [`pipeline`]: the orchestrator and its confirmation gate
//! - [`models`]: documents, chunks and annotations
//! - [`utils`]: HTTP client, retry policy and progress listeners
//! - [`config`]: configuration management
//! - [`ui`]: terminal rendering for the command-line tool
//!
//! ```no_run
//! use std::sync::Arc;
//! use pdf_highlighter::config::Config;
//! use pdf_highlighter::phrases::GroqClient;
//! use pdf_highlighter::pipeline::{Pipeline, PipelineSettings};
//!
//! # async fn run(bytes: Vec<u8>) -> anyhow::Result<()> {
//! let config = Config::default();
//! let client = GroqClient::new("api-key", config.service.clone(), config.retry.policy())?;
//! let pipeline = Pipeline::new(PipelineSettings::from(&config), Arc::new(client));
//! let output = pipeline.run(&bytes).await?;
//! println!("{} highlights", output.annotations);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod models;
pub mod pdf;
pub mod phrases;
pub mod pipeline;
pub mod text;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use models::{Document, HighlightAnnotation, TextChunk};
pub use phrases::{GroqClient, PhraseExtractor};
pub use pipeline::{Pipeline, PipelineError, PipelineOutput};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
