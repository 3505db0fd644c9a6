//! Page geometry and highlight annotation models.
//!
//! Coordinates are PDF user-space points with the origin at the
//! bottom-left corner of the page.

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in page coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    /// Create a rectangle from two corners, in any order
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    /// Smallest rectangle covering a set of points
    pub fn from_points(points: &[(f32, f32)]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut rect = Self::new(first.0, first.1, first.0, first.1);
        for &(x, y) in rest {
            rect.x0 = rect.x0.min(x);
            rect.y0 = rect.y0.min(y);
            rect.x1 = rect.x1.max(x);
            rect.y1 = rect.y1.max(y);
        }
        Some(rect)
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// Smallest rectangle covering both
    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }
}

/// RGB color with components in `0.0..=1.0`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const YELLOW: Color = Color {
        r: 1.0,
        g: 1.0,
        b: 0.0,
    };

    pub fn components(&self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::YELLOW
    }
}

/// Region covered by one verbatim occurrence of a phrase.
///
/// An occurrence that wraps across lines has one quad per line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightRegion {
    pub quads: Vec<Rect>,
}

impl HighlightRegion {
    pub fn new(quads: Vec<Rect>) -> Self {
        Self { quads }
    }

    /// Union of all quads, `None` for an empty region
    pub fn bounds(&self) -> Option<Rect> {
        let (first, rest) = self.quads.split_first()?;
        Some(rest.iter().fold(*first, |acc, quad| acc.union(quad)))
    }
}

/// A highlight mark attached to one page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightAnnotation {
    /// Page index (0-based)
    pub page_index: usize,

    /// Area covered on the page
    pub region: HighlightRegion,

    /// Fill color
    pub color: Color,

    /// The phrase whose occurrence produced this mark
    pub phrase: String,
}
