//! ToUnicode CMap parsing.
//!
//! Only the parts needed to map character codes to Unicode text are
//! understood: `codespacerange`, `bfchar` and `bfrange` sections.

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Upper bound on codes expanded from a single `bfrange` entry
const MAX_RANGE_LEN: u32 = 0x1_0000;

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid CMap pattern {pattern:?}: {e}"))
}

fn section_regex(name: &str) -> Regex {
    compile(&format!(r"(?s)begin{name}(.*?)end{name}"))
}

fn codespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| section_regex("codespacerange"))
}

fn bfchar_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| section_regex("bfchar"))
}

fn bfrange_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| section_regex("bfrange"))
}

fn hex_pair_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| compile(r"<([0-9A-Fa-f]+)>\s*<([0-9A-Fa-f]*)>"))
}

fn range_entry_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        compile(r"<([0-9A-Fa-f]+)>\s*<([0-9A-Fa-f]+)>\s*(?:<([0-9A-Fa-f]*)>|\[([^\]]*)\])")
    })
}

fn hex_item_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| compile(r"<([0-9A-Fa-f]*)>"))
}

/// Code-to-Unicode mapping read from a font's `/ToUnicode` stream
#[derive(Debug, Clone, Default)]
pub struct ToUnicodeMap {
    map: HashMap<u32, String>,
    code_len: Option<usize>,
}

impl ToUnicodeMap {
    /// Parse a (decompressed) CMap program.
    ///
    /// Malformed entries are skipped; the result may be empty.
    pub fn parse(data: &[u8]) -> Self {
        let text = String::from_utf8_lossy(data);
        let mut cmap = ToUnicodeMap::default();

        for section in codespace_re().captures_iter(&text) {
            if let Some(m) = hex_pair_re().captures(&section[1]) {
                cmap.code_len = Some(m[1].len().div_ceil(2));
            }
        }

        for section in bfchar_re().captures_iter(&text) {
            for entry in hex_pair_re().captures_iter(&section[1]) {
                cmap.note_code_len(&entry[1]);
                if let Some(code) = parse_code(&entry[1]) {
                    cmap.map.insert(code, decode_utf16_hex(&entry[2]));
                }
            }
        }

        for section in bfrange_re().captures_iter(&text) {
            for entry in range_entry_re().captures_iter(&section[1]) {
                cmap.note_code_len(&entry[1]);
                let (Some(lo), Some(hi)) = (parse_code(&entry[1]), parse_code(&entry[2])) else {
                    continue;
                };
                if hi < lo || hi - lo >= MAX_RANGE_LEN {
                    continue;
                }

                if let Some(dst) = entry.get(3) {
                    let base = hex_to_units(dst.as_str());
                    for (offset, code) in (lo..=hi).enumerate() {
                        let mut units = base.clone();
                        if let Some(last) = units.last_mut() {
                            *last = last.wrapping_add(offset as u16);
                        }
                        cmap.map.insert(code, String::from_utf16_lossy(&units));
                    }
                } else if let Some(items) = entry.get(4) {
                    for (code, item) in (lo..=hi).zip(hex_item_re().captures_iter(items.as_str()))
                    {
                        cmap.map.insert(code, decode_utf16_hex(&item[1]));
                    }
                }
            }
        }

        cmap
    }

    fn note_code_len(&mut self, hex: &str) {
        if self.code_len.is_none() {
            self.code_len = Some(hex.len().div_ceil(2));
        }
    }

    /// Byte length of one character code, when the CMap declares it
    pub fn code_len(&self) -> Option<usize> {
        self.code_len
    }

    pub fn get(&self, code: u32) -> Option<&str> {
        self.map.get(&code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

fn parse_code(hex: &str) -> Option<u32> {
    if hex.is_empty() || hex.len() > 8 {
        return None;
    }
    u32::from_str_radix(hex, 16).ok()
}

fn hex_to_units(hex: &str) -> Vec<u16> {
    let digits: Vec<u8> = hex
        .bytes()
        .filter_map(|b| (b as char).to_digit(16).map(|d| d as u8))
        .collect();

    // Destination strings are UTF-16BE; a lone trailing byte is padded.
    let mut bytes: Vec<u8> = digits
        .chunks(2)
        .map(|pair| match pair {
            [hi, lo] => (hi << 4) | lo,
            [hi] => hi << 4,
            _ => 0,
        })
        .collect();
    if bytes.len() % 2 == 1 {
        bytes.insert(0, 0);
    }

    bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect()
}

fn decode_utf16_hex(hex: &str) -> String {
    String::from_utf16_lossy(&hex_to_units(hex))
}
