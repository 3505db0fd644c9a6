//! Page text-layout index.
//!
//! Rebuilds the plain text of a page from positioned glyphs and keeps,
//! for every character, the box it occupies on the page. Verbatim
//! phrase search runs over that text and maps each hit back to
//! geometry.

use lopdf::{Document as PdfDocument, ObjectId};
use thiserror::Error;

use super::content::{ContentInterpreter, PositionedGlyph};
use crate::models::{HighlightRegion, Rect};

/// Baseline shift, in font sizes, that starts a new line
const LINE_BREAK_SHIFT: f32 = 0.5;

/// Baseline shift, in font sizes, that starts a new paragraph
const PARAGRAPH_BREAK_SHIFT: f32 = 1.8;

/// Horizontal gap, in font sizes, rendered as a space
const WORD_GAP: f32 = 0.2;

/// Errors raised while building a page layout
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
}

#[derive(Debug, Clone, PartialEq)]
struct LayoutChar {
    /// Byte offset of the character in the page text
    byte: usize,

    /// Box on the page; `None` for separators inserted by reconstruction
    bbox: Option<Rect>,

    /// Line number within the page
    line: usize,
}

/// Searchable text of one page with per-character geometry
#[derive(Debug, Clone, Default)]
pub struct PageLayout {
    text: String,
    /// `text` with line breaks rendered as spaces, same byte layout
    search_text: String,
    chars: Vec<LayoutChar>,
}

impl PageLayout {
    /// Layout of a page with no recoverable text
    pub fn empty() -> Self {
        Self::default()
    }

    /// Interpret a page of a parsed PDF
    pub fn from_page(doc: &PdfDocument, page_id: ObjectId) -> Result<Self, LayoutError> {
        let glyphs = ContentInterpreter::new(doc).run_page(page_id)?;
        Ok(Self::from_glyphs(&glyphs))
    }

    /// Assemble text from glyphs given in content order
    pub fn from_glyphs(glyphs: &[PositionedGlyph]) -> Self {
        let mut layout = PageLayout::default();
        let mut line = 0;
        let mut prev: Option<&PositionedGlyph> = None;

        for glyph in glyphs {
            if let Some(p) = prev {
                let size = glyph.size.max(p.size);
                let shift = (glyph.origin.1 - p.origin.1).abs();
                if shift > LINE_BREAK_SHIFT * size {
                    line += 1;
                    let separator = if shift > PARAGRAPH_BREAK_SHIFT * size {
                        "\n\n"
                    } else {
                        "\n"
                    };
                    layout.push_separator(separator, line);
                } else {
                    let gap = glyph.origin.0 - p.end.0;
                    let spaced = layout.text.ends_with(char::is_whitespace)
                        || glyph.text.starts_with(char::is_whitespace);
                    if gap > WORD_GAP * size && !spaced {
                        layout.push_separator(" ", line);
                    }
                }
            }
            layout.push_glyph(glyph, line);
            prev = Some(glyph);
        }

        layout.search_text = layout.text.replace('\n', " ");
        layout
    }

    fn push_separator(&mut self, separator: &str, line: usize) {
        for c in separator.chars() {
            self.chars.push(LayoutChar {
                byte: self.text.len(),
                bbox: None,
                line,
            });
            self.text.push(c);
        }
    }

    fn push_glyph(&mut self, glyph: &PositionedGlyph, line: usize) {
        // Ligatures map several characters onto one glyph; split the box evenly.
        let count = glyph.text.chars().count().max(1) as f32;
        let step = glyph.bbox.width() / count;
        for (i, c) in glyph.text.chars().enumerate() {
            let x0 = glyph.bbox.x0 + step * i as f32;
            self.chars.push(LayoutChar {
                byte: self.text.len(),
                bbox: Some(Rect::new(x0, glyph.bbox.y0, x0 + step, glyph.bbox.y1)),
                line,
            });
            self.text.push(c);
        }
    }

    /// Reconstructed page text
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Find every verbatim occurrence of `phrase` on the page.
    ///
    /// Matching is case- and whitespace-sensitive; a line break in the
    /// layout matches a single space. Occurrences do not overlap and are
    /// returned in layout order, one region per occurrence.
    pub fn search(&self, phrase: &str) -> Vec<HighlightRegion> {
        if phrase.is_empty() {
            return Vec::new();
        }
        let needle = phrase.replace('\n', " ");

        self.search_text
            .match_indices(needle.as_str())
            .filter_map(|(start, hit)| self.region_for(start, start + hit.len()))
            .collect()
    }

    fn region_for(&self, start: usize, end: usize) -> Option<HighlightRegion> {
        let first = self.chars.partition_point(|c| c.byte < start);
        let last = self.chars.partition_point(|c| c.byte < end);

        let mut quads: Vec<(usize, Rect)> = Vec::new();
        for c in &self.chars[first..last] {
            let Some(bbox) = c.bbox else { continue };
            match quads.last_mut() {
                Some((line, quad)) if *line == c.line => *quad = quad.union(&bbox),
                _ => quads.push((c.line, bbox)),
            }
        }

        if quads.is_empty() {
            return None;
        }
        Some(HighlightRegion::new(
            quads.into_iter().map(|(_, quad)| quad).collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Lay out `text` left to right at a fixed pitch on baseline `y`
    fn run(text: &str, x: f32, y: f32, size: f32) -> Vec<PositionedGlyph> {
        let pitch = size * 0.5;
        text.chars()
            .enumerate()
            .map(|(i, c)| {
                let x0 = x + pitch * i as f32;
                PositionedGlyph {
                    text: c.to_string(),
                    bbox: Rect::new(x0, y - 0.2 * size, x0 + pitch, y + 0.8 * size),
                    origin: (x0, y),
                    end: (x0 + pitch, y),
                    size,
                }
            })
            .collect()
    }

    #[test]
    fn test_lines_and_paragraphs() {
        let mut glyphs = run("First line", 72.0, 700.0, 12.0);
        glyphs.extend(run("second line", 72.0, 686.0, 12.0));
        glyphs.extend(run("New paragraph", 72.0, 650.0, 12.0));

        let layout = PageLayout::from_glyphs(&glyphs);
        assert_eq!(layout.text(), "First line\nsecond line\n\nNew paragraph");
    }

    #[test]
    fn test_gap_inserts_space() {
        let mut glyphs = run("Hello", 72.0, 700.0, 10.0);
        glyphs.extend(run("world", 72.0 + 5.0 * 5.0 + 4.0, 700.0, 10.0));
        let layout = PageLayout::from_glyphs(&glyphs);
        assert_eq!(layout.text(), "Hello world");

        let mut tight = run("Hel", 72.0, 700.0, 10.0);
        tight.extend(run("lo", 72.0 + 15.0, 700.0, 10.0));
        assert_eq!(PageLayout::from_glyphs(&tight).text(), "Hello");
    }

    #[test]
    fn test_search_single_line() {
        let glyphs = run("the key phrase here", 100.0, 500.0, 10.0);
        let layout = PageLayout::from_glyphs(&glyphs);

        let regions = layout.search("key phrase");
        assert_eq!(regions.len(), 1);
        let bounds = regions[0].bounds().unwrap();
        assert_eq!(regions[0].quads.len(), 1);
        assert!((bounds.x0 - 120.0).abs() < 1e-3);
        assert!((bounds.x1 - 170.0).abs() < 1e-3);
    }

    #[test]
    fn test_search_is_case_sensitive_and_finds_every_occurrence() {
        let glyphs = run("Alpha alpha Alpha", 0.0, 100.0, 10.0);
        let layout = PageLayout::from_glyphs(&glyphs);

        assert_eq!(layout.search("Alpha").len(), 2);
        assert_eq!(layout.search("alpha").len(), 1);
        assert!(layout.search("ALPHA").is_empty());
        assert!(layout.search("").is_empty());
    }

    #[test]
    fn test_search_across_line_break_yields_one_quad_per_line() {
        let mut glyphs = run("ends with key", 72.0, 700.0, 12.0);
        glyphs.extend(run("phrase continues", 72.0, 686.0, 12.0));
        let layout = PageLayout::from_glyphs(&glyphs);

        let regions = layout.search("key phrase");
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].quads.len(), 2);
        assert!(regions[0].quads[0].y0 > regions[0].quads[1].y0);
    }

    #[test]
    fn test_whitespace_must_match() {
        let glyphs = run("two  spaces", 0.0, 100.0, 10.0);
        let layout = PageLayout::from_glyphs(&glyphs);
        assert!(layout.search("two spaces").is_empty());
        assert_eq!(layout.search("two  spaces").len(), 1);
    }

    #[test]
    fn test_empty_layout() {
        let layout = PageLayout::empty();
        assert!(layout.is_empty());
        assert!(layout.search("anything").is_empty());
    }
}
