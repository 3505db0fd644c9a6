//! PDF text-layout indexing, text extraction and highlighting.
//!
//! - [`load_document`] parses PDF bytes and builds a [`PageLayout`] per page
//! - [`extract_text`] joins page texts with a blank line
//! - [`Highlighter`] finds phrases in the layouts and writes `/Highlight`
//!   annotations to a new copy of the document

mod cmap;
mod content;
mod extract;
mod fonts;
mod highlight;
mod layout;
mod objects;
mod standard_fonts;

pub use content::{Matrix, PositionedGlyph};
pub use extract::{extract_text, load_document, PAGE_SEPARATOR};
pub use highlight::{HighlightError, HighlightReport, Highlighter, DEFAULT_MIN_PHRASE_LEN};
pub use layout::{LayoutError, PageLayout};

#[cfg(test)]
pub(crate) use extract::test_support;
