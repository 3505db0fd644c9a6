//! Glyph widths of the standard base fonts.
//!
//! Simple fonts that name a standard font may omit `/Widths`. The tables
//! below hold the printable ASCII range (codes 32 to 126) in thousandths
//! of an em, taken from the Adobe font metrics. Italic and oblique faces
//! reuse the upright widths.

/// First code covered by the tables
pub const FIRST_CODE: u32 = 32;

const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // 32..47
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 48..63
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // 64..79
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 80..95
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // 96..111
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 112..126
];

const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // 32..47
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, // 48..63
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, // 64..79
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, // 80..95
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, // 96..111
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584, // 112..126
];

const TIMES_ROMAN: [u16; 95] = [
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278, // 32..47
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 278, 278, 564, 564, 564, 444, // 48..63
    921, 722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889, 722, 722, // 64..79
    556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611, 333, 278, 333, 469, 500, // 80..95
    333, 444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778, 500, 500, // 96..111
    500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444, 480, 200, 480, 541, // 112..126
];

const TIMES_BOLD: [u16; 95] = [
    250, 333, 555, 500, 500, 1000, 833, 278, 333, 333, 500, 570, 250, 333, 250, 278, // 32..47
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 333, 333, 570, 570, 570, 500, // 48..63
    930, 722, 667, 722, 722, 667, 611, 778, 778, 389, 500, 778, 667, 944, 722, 778, // 64..79
    611, 778, 722, 556, 667, 722, 722, 1000, 722, 722, 667, 333, 278, 333, 581, 500, // 80..95
    333, 500, 556, 444, 556, 444, 333, 500, 556, 278, 333, 556, 278, 833, 556, 500, // 96..111
    556, 556, 444, 389, 333, 556, 500, 722, 500, 500, 444, 394, 220, 394, 520, // 112..126
];

/// Widths and the width for codes outside the table
pub struct StandardMetrics {
    pub widths: Option<&'static [u16; 95]>,
    pub default_width: f32,
}

/// Metrics for a `/BaseFont` name, `None` when it is not a standard font
pub fn standard_metrics(base_font: &str) -> Option<StandardMetrics> {
    // Subset fonts carry a six-letter tag: `ABCDEF+Helvetica`.
    let name = base_font
        .split_once('+')
        .map_or(base_font, |(_, rest)| rest);
    let lower = name.to_ascii_lowercase();
    let bold = lower.contains("bold");

    let widths = if lower.starts_with("courier") {
        return Some(StandardMetrics {
            widths: None,
            default_width: 600.0,
        });
    } else if lower.starts_with("helvetica") || lower.starts_with("arial") {
        if bold {
            &HELVETICA_BOLD
        } else {
            &HELVETICA
        }
    } else if lower.starts_with("times") {
        if bold {
            &TIMES_BOLD
        } else {
            &TIMES_ROMAN
        }
    } else {
        return None;
    };

    Some(StandardMetrics {
        widths: Some(widths),
        default_width: 500.0,
    })
}
