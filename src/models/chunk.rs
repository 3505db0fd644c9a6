//! Text chunk model.

use serde::{Deserialize, Serialize};

/// A bounded slice of extracted document text, submitted to the phrase
/// service as one unit.
///
/// The payload stays within the configured maximum size unless a single
/// paragraph is already longer than that bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    /// Position in the chunk sequence (0-based)
    pub index: usize,

    /// Chunk payload: one or more paragraphs joined by a blank line
    pub text: String,
}

impl TextChunk {
    /// Create a new chunk
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }

    /// Length of the payload in characters
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Whether the payload has no visible content
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}
