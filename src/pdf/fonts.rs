//! Font decoding for text-layout reconstruction.
//!
//! A [`FontInfo`] turns the raw bytes of a text-showing operator into
//! glyphs carrying Unicode text and an advance width (in thousandths of
//! an em).

use lopdf::{Dictionary, Document as PdfDocument, Object};
use std::collections::HashMap;

use super::cmap::ToUnicodeMap;
use super::objects::{get, get_array, get_dict, get_name, get_number, number, resolve, stream_bytes};
use super::standard_fonts::{standard_metrics, FIRST_CODE};

/// Width used when a font carries no metrics for a code
const DEFAULT_SIMPLE_WIDTH: f32 = 500.0;
const DEFAULT_CID_WIDTH: f32 = 1000.0;

/// One decoded glyph
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedGlyph {
    /// Unicode text for the glyph, possibly several characters (ligatures)
    pub text: String,

    /// Horizontal advance in glyph space units (1/1000 em)
    pub width: f32,

    /// Single-byte code 32, which receives word spacing
    pub is_word_space: bool,
}

#[derive(Debug, Clone)]
enum Widths {
    Simple { first_char: u32, widths: Vec<f32> },
    Cid(HashMap<u32, f32>),
}

/// Decoding information for one font resource
#[derive(Debug, Clone)]
pub struct FontInfo {
    code_len: usize,
    to_unicode: Option<ToUnicodeMap>,
    differences: HashMap<u32, String>,
    widths: Widths,
    default_width: f32,
}

impl FontInfo {
    /// Font used when a `Tf` operand names no known resource
    pub fn fallback() -> Self {
        Self {
            code_len: 1,
            to_unicode: None,
            differences: HashMap::new(),
            widths: Widths::Simple {
                first_char: 0,
                widths: Vec::new(),
            },
            default_width: DEFAULT_SIMPLE_WIDTH,
        }
    }

    /// Read a font dictionary
    pub fn from_dict(doc: &PdfDocument, font: &Dictionary) -> Self {
        let composite = get_name(doc, font, b"Subtype") == Some(b"Type0".as_slice());

        let to_unicode = match get(doc, font, b"ToUnicode") {
            Some(Object::Stream(stream)) => {
                let cmap = ToUnicodeMap::parse(&stream_bytes(stream));
                (!cmap.is_empty()).then_some(cmap)
            }
            _ => None,
        };

        // Composite fonts default to the two-byte Identity-H/V encoding.
        let code_len = if composite {
            to_unicode
                .as_ref()
                .and_then(ToUnicodeMap::code_len)
                .filter(|len| (1..=4).contains(len))
                .unwrap_or(2)
        } else {
            1
        };

        let (widths, default_width) = if composite {
            read_cid_widths(doc, font)
        } else {
            read_simple_widths(doc, font)
        };

        Self {
            code_len,
            to_unicode,
            differences: read_differences(doc, font),
            widths,
            default_width,
        }
    }

    /// Split a string operand into glyphs
    pub fn decode(&self, bytes: &[u8]) -> Vec<DecodedGlyph> {
        bytes
            .chunks(self.code_len)
            .map(|chunk| {
                let code = chunk.iter().fold(0u32, |acc, b| (acc << 8) | u32::from(*b));
                DecodedGlyph {
                    text: self.unicode_for(code),
                    width: self.width_for(code),
                    is_word_space: self.code_len == 1 && code == 32,
                }
            })
            .collect()
    }

    fn unicode_for(&self, code: u32) -> String {
        if let Some(text) = self.to_unicode.as_ref().and_then(|m| m.get(code)) {
            return text.to_string();
        }
        if let Some(text) = self.differences.get(&code) {
            return text.clone();
        }
        if self.code_len == 1 {
            win_ansi_char(code as u8).to_string()
        } else {
            // Identity-encoded CID without a ToUnicode map: best guess.
            char::from_u32(code).map(String::from).unwrap_or_default()
        }
    }

    fn width_for(&self, code: u32) -> f32 {
        match &self.widths {
            Widths::Simple { first_char, widths } => code
                .checked_sub(*first_char)
                .and_then(|i| widths.get(i as usize))
                .copied()
                .unwrap_or(self.default_width),
            Widths::Cid(map) => map.get(&code).copied().unwrap_or(self.default_width),
        }
    }
}

fn read_simple_widths(doc: &PdfDocument, font: &Dictionary) -> (Widths, f32) {
    let first_char = get_number(doc, font, b"FirstChar").unwrap_or(0.0).max(0.0) as u32;
    let widths: Vec<f32> = get_array(doc, font, b"Widths")
        .map(|items| {
            items
                .iter()
                .map(|w| {
                    resolve(doc, w)
                        .and_then(number)
                        .unwrap_or(0.0)
                })
                .collect()
        })
        .unwrap_or_default();

    let missing = get_dict(doc, font, b"FontDescriptor")
        .and_then(|fd| get_number(doc, fd, b"MissingWidth"))
        .filter(|w| *w > 0.0);

    if widths.is_empty() {
        let standard = get_name(doc, font, b"BaseFont")
            .and_then(|name| standard_metrics(&String::from_utf8_lossy(name)));
        if let Some(metrics) = standard {
            let table = metrics
                .widths
                .map(|w| w.iter().map(|&v| f32::from(v)).collect())
                .unwrap_or_default();
            return (
                Widths::Simple {
                    first_char: FIRST_CODE,
                    widths: table,
                },
                missing.unwrap_or(metrics.default_width),
            );
        }
    }

    (
        Widths::Simple { first_char, widths },
        missing.unwrap_or(DEFAULT_SIMPLE_WIDTH),
    )
}

fn read_cid_widths(doc: &PdfDocument, font: &Dictionary) -> (Widths, f32) {
    let descendant = get_array(doc, font, b"DescendantFonts")
        .and_then(|fonts| fonts.first())
        .and_then(|f| resolve(doc, f))
        .and_then(|f| match f {
            Object::Dictionary(d) => Some(d),
            _ => None,
        });

    let Some(cid_font) = descendant else {
        return (Widths::Cid(HashMap::new()), DEFAULT_CID_WIDTH);
    };

    let default_width = get_number(doc, cid_font, b"DW").unwrap_or(DEFAULT_CID_WIDTH);
    let mut map = HashMap::new();

    // W entries come in two forms: `c [w1 w2 ...]` and `c_first c_last w`.
    if let Some(items) = get_array(doc, cid_font, b"W") {
        let resolved: Vec<&Object> = items
            .iter()
            .filter_map(|o| resolve(doc, o))
            .collect();
        let mut i = 0;
        while i < resolved.len() {
            let Some(start) = number(resolved[i]) else {
                break;
            };
            match resolved.get(i + 1) {
                Some(Object::Array(ws)) => {
                    for (offset, w) in ws.iter().enumerate() {
                        let code = u32::try_from(offset)
                            .ok()
                            .and_then(|offset| (start as u32).checked_add(offset));
                        if let (Some(code), Some(w)) = (code, resolve(doc, w).and_then(number)) {
                            map.insert(code, w);
                        }
                    }
                    i += 2;
                }
                Some(end) => {
                    let (Some(end), Some(w)) =
                        (number(end), resolved.get(i + 2).and_then(|o| number(o)))
                    else {
                        break;
                    };
                    let (start, end) = (start as u32, end as u32);
                    if end >= start && end - start < 0x1_0000 {
                        for code in start..=end {
                            map.insert(code, w);
                        }
                    }
                    i += 3;
                }
                None => break,
            }
        }
    }

    (Widths::Cid(map), default_width)
}

fn read_differences(doc: &PdfDocument, font: &Dictionary) -> HashMap<u32, String> {
    let mut differences = HashMap::new();
    let Some(encoding) = get_dict(doc, font, b"Encoding") else {
        return differences;
    };
    let Some(items) = get_array(doc, encoding, b"Differences") else {
        return differences;
    };

    // `None` once a run of names walks past the last code.
    let mut code = Some(0u32);
    for item in items {
        match resolve(doc, item) {
            Some(Object::Integer(n)) => code = u32::try_from(*n).ok(),
            Some(Object::Name(name)) => {
                if let Some(current) = code {
                    if let Some(text) = glyph_name_to_unicode(&String::from_utf8_lossy(name)) {
                        differences.insert(current, text);
                    }
                }
                code = code.and_then(|c| c.checked_add(1));
            }
            _ => {}
        }
    }
    differences
}

/// Map an Adobe glyph name to text, for the names common in Latin text
pub fn glyph_name_to_unicode(name: &str) -> Option<String> {
    if name.chars().count() == 1 && name.chars().all(|c| c.is_ascii_alphabetic()) {
        return Some(name.to_string());
    }
    if let Some(hex) = name.strip_prefix("uni").filter(|h| h.len() == 4) {
        return u32::from_str_radix(hex, 16)
            .ok()
            .and_then(char::from_u32)
            .map(String::from);
    }
    if let Some(hex) = name.strip_prefix('u').filter(|h| (4..=6).contains(&h.len())) {
        if let Some(c) = u32::from_str_radix(hex, 16).ok().and_then(char::from_u32) {
            return Some(c.to_string());
        }
    }

    let text = match name {
        "space" | "nbspace" => " ",
        "zero" => "0",
        "one" => "1",
        "two" => "2",
        "three" => "3",
        "four" => "4",
        "five" => "5",
        "six" => "6",
        "seven" => "7",
        "eight" => "8",
        "nine" => "9",
        "period" => ".",
        "comma" => ",",
        "colon" => ":",
        "semicolon" => ";",
        "hyphen" | "minus" => "-",
        "endash" => "\u{2013}",
        "emdash" => "\u{2014}",
        "exclam" => "!",
        "question" => "?",
        "quotesingle" => "'",
        "quotedbl" => "\"",
        "quoteleft" => "\u{2018}",
        "quoteright" => "\u{2019}",
        "quotedblleft" => "\u{201C}",
        "quotedblright" => "\u{201D}",
        "parenleft" => "(",
        "parenright" => ")",
        "bracketleft" => "[",
        "bracketright" => "]",
        "braceleft" => "{",
        "braceright" => "}",
        "slash" => "/",
        "backslash" => "\\",
        "ampersand" => "&",
        "percent" => "%",
        "dollar" => "$",
        "at" => "@",
        "numbersign" => "#",
        "asterisk" => "*",
        "plus" => "+",
        "equal" => "=",
        "less" => "<",
        "greater" => ">",
        "underscore" => "_",
        "bullet" => "\u{2022}",
        "ellipsis" => "\u{2026}",
        "fi" => "fi",
        "fl" => "fl",
        "ff" => "ff",
        "ffi" => "ffi",
        "ffl" => "ffl",
        _ => return None,
    };
    Some(text.to_string())
}

/// WinAnsiEncoding; codes outside the 0x80..=0x9F block match Latin-1
pub fn win_ansi_char(code: u8) -> char {
    match code {
        0x80 => '\u{20AC}',
        0x82 => '\u{201A}',
        0x83 => '\u{0192}',
        0x84 => '\u{201E}',
        0x85 => '\u{2026}',
        0x86 => '\u{2020}',
        0x87 => '\u{2021}',
        0x88 => '\u{02C6}',
        0x89 => '\u{2030}',
        0x8A => '\u{0160}',
        0x8B => '\u{2039}',
        0x8C => '\u{0152}',
        0x8E => '\u{017D}',
        0x91 => '\u{2018}',
        0x92 => '\u{2019}',
        0x93 => '\u{201C}',
        0x94 => '\u{201D}',
        0x95 => '\u{2022}',
        0x96 => '\u{2013}',
        0x97 => '\u{2014}',
        0x98 => '\u{02DC}',
        0x99 => '\u{2122}',
        0x9A => '\u{0161}',
        0x9B => '\u{203A}',
        0x9C => '\u{0153}',
        0x9E => '\u{017E}',
        0x9F => '\u{0178}',
        other => char::from(other),
    }
}
