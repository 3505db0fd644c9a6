use crate::models::TextChunk;

/// Paragraph boundary in extracted text
pub const PARAGRAPH_SEPARATOR: &str = "\n\n";

/// Default upper bound on chunk length, in characters
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 3000;

const SEPARATOR_LEN: usize = PARAGRAPH_SEPARATOR.len();

/// Split `text` into ordered chunks along paragraph boundaries.
///
/// Paragraphs are accumulated greedily; a chunk is closed before the
/// paragraph that would push it past `max_chars`. A single paragraph
/// longer than `max_chars` becomes a chunk on its own and is never cut.
/// Joining the chunk texts with [`PARAGRAPH_SEPARATOR`] yields `text`
/// again, which means runs of blank lines can surface as blank chunks.
/// Empty input produces no chunks.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<TextChunk> {
    if text.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;
    let mut paragraphs = 0usize;

    for paragraph in text.split(PARAGRAPH_SEPARATOR) {
        let paragraph_len = paragraph.chars().count();

        if paragraphs > 0 && current_len + SEPARATOR_LEN + paragraph_len > max_chars {
            chunks.push(TextChunk::new(chunks.len(), std::mem::take(&mut current)));
            current_len = 0;
            paragraphs = 0;
        }
        if paragraphs > 0 {
            current.push_str(PARAGRAPH_SEPARATOR);
            current_len += SEPARATOR_LEN;
        }

        current.push_str(paragraph);
        current_len += paragraph_len;
        paragraphs += 1;
    }

    // Empty paragraphs still count, so blank chunks may appear.
    if paragraphs > 0 {
        chunks.push(TextChunk::new(chunks.len(), current));
    }

    tracing::debug!("Split {} characters into {} chunks", text.chars().count(), chunks.len());
    chunks
}
