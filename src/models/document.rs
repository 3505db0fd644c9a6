//! Loaded PDF document model.

use crate::pdf::PageLayout;

/// One page of a loaded document
#[derive(Debug, Clone)]
pub struct Page {
    /// Page index (0-based)
    pub index: usize,

    /// PDF object id of the page dictionary
    pub object_id: (u32, u16),

    /// Text-layout index for verbatim phrase search
    pub layout: PageLayout,
}

impl Page {
    /// Plain text recovered from the page, empty for image-only pages
    pub fn text(&self) -> &str {
        self.layout.text()
    }
}

/// A PDF document together with the text layout of each page.
///
/// The original bytes are never mutated; highlighting produces a new
/// serialized copy.
#[derive(Debug, Clone)]
pub struct Document {
    bytes: Vec<u8>,
    pages: Vec<Page>,
}

impl Document {
    pub fn new(bytes: Vec<u8>, pages: Vec<Page>) -> Self {
        Self { bytes, pages }
    }

    /// Original PDF bytes
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}
