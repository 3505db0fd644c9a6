//! Core data models shared by the extraction, chunking and highlighting stages.

mod annotation;
mod chunk;
mod document;

pub use annotation::{Color, HighlightAnnotation, HighlightRegion, Rect};
pub use chunk::TextChunk;
pub use document::{Document, Page};
