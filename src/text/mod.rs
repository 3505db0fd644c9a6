//! Text preparation ahead of phrase extraction.

mod chunker;

pub use chunker::{chunk_text, DEFAULT_MAX_CHUNK_SIZE, PARAGRAPH_SEPARATOR};
