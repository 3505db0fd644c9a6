//! Phrase locating and highlight annotation writing.
//!
//! Phrases are located with each page's text-layout index. Every
//! verbatim occurrence becomes a PDF `/Highlight` annotation on a fresh
//! copy of the document; the input bytes are never modified.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document as PdfDocument, Object, ObjectId, Stream, StringFormat};
use std::collections::HashSet;
use thiserror::Error;

use crate::models::{Color, Document, HighlightAnnotation, HighlightRegion, Rect};

/// Phrases shorter than this (in characters) are never highlighted
pub const DEFAULT_MIN_PHRASE_LEN: usize = 6;

/// Annotation flag: print the annotation
const FLAG_PRINT: i64 = 4;

/// Errors raised while writing the highlighted document
#[derive(Debug, Error)]
pub enum HighlightError {
    #[error("Failed to reopen document: {0}")]
    Open(lopdf::Error),

    #[error("Failed to attach annotation to page {page}: {reason}")]
    Attach { page: usize, reason: String },

    #[error("Failed to serialize highlighted document: {0}")]
    Serialize(String),

    #[error("Highlighted document failed validation: {0}")]
    Validate(lopdf::Error),
}

/// Outcome of a highlighting pass
#[derive(Debug, Clone)]
pub struct HighlightReport {
    /// Serialized document; identical to the input when nothing matched
    pub pdf: Vec<u8>,

    /// Annotations attached, in creation order
    pub annotations: Vec<HighlightAnnotation>,

    /// Eligible phrases that matched on no page
    pub unmatched: Vec<String>,
}

impl HighlightReport {
    pub fn annotation_count(&self) -> usize {
        self.annotations.len()
    }
}

/// Locates phrases in a document and writes highlight annotations
#[derive(Debug, Clone)]
pub struct Highlighter {
    min_phrase_len: usize,
    color: Color,
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_PHRASE_LEN)
    }
}

impl Highlighter {
    pub fn new(min_phrase_len: usize) -> Self {
        Self {
            min_phrase_len,
            color: Color::YELLOW,
        }
    }

    pub fn min_phrase_len(&self) -> usize {
        self.min_phrase_len
    }

    /// Trimmed phrase, or `None` when it is too short to highlight
    fn eligible<'p>(&self, phrase: &'p str) -> Option<&'p str> {
        let trimmed = phrase.trim();
        (!trimmed.is_empty() && trimmed.chars().count() >= self.min_phrase_len).then_some(trimmed)
    }

    /// Find every occurrence of every phrase, page by page.
    ///
    /// Pure with respect to the document: running it twice yields the
    /// same annotations.
    pub fn locate(&self, document: &Document, phrases: &[String]) -> Vec<HighlightAnnotation> {
        let mut annotations = Vec::new();
        for page in document.pages() {
            for phrase in phrases {
                let Some(phrase) = self.eligible(phrase) else {
                    continue;
                };
                for region in page.layout.search(phrase) {
                    annotations.push(HighlightAnnotation {
                        page_index: page.index,
                        region,
                        color: self.color,
                        phrase: phrase.to_string(),
                    });
                }
            }
        }
        annotations
    }

    /// Locate all phrases and produce the highlighted document.
    ///
    /// Either every annotation is written and the whole document is
    /// re-serialized, or an error is returned and the caller keeps the
    /// original bytes.
    pub fn highlight(
        &self,
        document: &Document,
        phrases: &[String],
    ) -> Result<HighlightReport, HighlightError> {
        let annotations = self.locate(document, phrases);

        let matched: HashSet<&str> = annotations.iter().map(|a| a.phrase.as_str()).collect();
        let mut seen = HashSet::new();
        let unmatched: Vec<String> = phrases
            .iter()
            .filter_map(|p| self.eligible(p))
            .filter(|p| !matched.contains(p) && seen.insert(*p))
            .map(str::to_string)
            .collect();

        if annotations.is_empty() {
            tracing::info!("No phrase matched; returning the document unchanged");
            return Ok(HighlightReport {
                pdf: document.bytes().to_vec(),
                annotations,
                unmatched,
            });
        }

        let pdf = write_annotations(document, &annotations)?;
        tracing::info!(
            "Attached {} highlight annotations ({} phrases unmatched)",
            annotations.len(),
            unmatched.len()
        );

        Ok(HighlightReport {
            pdf,
            annotations,
            unmatched,
        })
    }
}

fn write_annotations(
    document: &Document,
    annotations: &[HighlightAnnotation],
) -> Result<Vec<u8>, HighlightError> {
    let mut pdf = PdfDocument::load_mem(document.bytes()).map_err(HighlightError::Open)?;

    for annotation in annotations {
        let page = document
            .pages()
            .get(annotation.page_index)
            .ok_or_else(|| HighlightError::Attach {
                page: annotation.page_index,
                reason: "page index out of range".to_string(),
            })?;
        let Some(bounds) = annotation.region.bounds() else {
            continue;
        };

        let appearance = pdf.add_object(appearance_stream(&annotation.region, bounds, annotation.color)?);
        let annot_id = pdf.add_object(annotation_dict(annotation, bounds, page.object_id, appearance));
        attach(&mut pdf, page.object_id, annot_id).map_err(|reason| HighlightError::Attach {
            page: annotation.page_index,
            reason,
        })?;
    }

    let mut out = Vec::new();
    pdf.save_to(&mut out)
        .map_err(|e| HighlightError::Serialize(e.to_string()))?;

    // Refuse to hand back anything that does not parse again.
    PdfDocument::load_mem(&out).map_err(HighlightError::Validate)?;
    Ok(out)
}

fn real(value: f32) -> Object {
    Object::Real(value.into())
}

fn rect_array(rect: &Rect) -> Vec<Object> {
    vec![real(rect.x0), real(rect.y0), real(rect.x1), real(rect.y1)]
}

/// Quad points run top-left, top-right, bottom-left, bottom-right
fn quad_points(region: &HighlightRegion) -> Vec<Object> {
    region
        .quads
        .iter()
        .flat_map(|q| [q.x0, q.y1, q.x1, q.y1, q.x0, q.y0, q.x1, q.y0])
        .map(real)
        .collect()
}

/// Text string object; non-ASCII text is written as UTF-16BE with a BOM
fn text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::string_literal(text);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

fn annotation_dict(
    annotation: &HighlightAnnotation,
    bounds: Rect,
    page_id: ObjectId,
    appearance: ObjectId,
) -> Dictionary {
    dictionary! {
        "Type" => "Annot",
        "Subtype" => "Highlight",
        "Rect" => rect_array(&bounds),
        "QuadPoints" => quad_points(&annotation.region),
        "C" => annotation.color.components().into_iter().map(real).collect::<Vec<_>>(),
        "F" => Object::Integer(FLAG_PRINT),
        "P" => page_id,
        "Contents" => text_string(&annotation.phrase),
        "AP" => dictionary! { "N" => appearance },
    }
}

/// Form XObject painting the quads with a multiply-blended fill
fn appearance_stream(
    region: &HighlightRegion,
    bounds: Rect,
    color: Color,
) -> Result<Stream, HighlightError> {
    let mut operations = vec![
        Operation::new("gs", vec![Object::Name(b"GS0".to_vec())]),
        Operation::new("rg", color.components().into_iter().map(real).collect()),
    ];
    for quad in &region.quads {
        operations.push(Operation::new(
            "re",
            vec![real(quad.x0), real(quad.y0), real(quad.width()), real(quad.height())],
        ));
    }
    operations.push(Operation::new("f", vec![]));

    let content = Content { operations }
        .encode()
        .map_err(|e| HighlightError::Serialize(e.to_string()))?;

    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Form",
        "BBox" => rect_array(&bounds),
        "Resources" => dictionary! {
            "ExtGState" => dictionary! {
                "GS0" => dictionary! {
                    "Type" => "ExtGState",
                    "BM" => "Multiply",
                },
            },
        },
    };
    Ok(Stream::new(dict, content))
}

/// Append an annotation reference to the page's `Annots` array
fn attach(pdf: &mut PdfDocument, page_id: ObjectId, annot_id: ObjectId) -> Result<(), String> {
    let page = pdf
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| e.to_string())?;

    let indirect = match page.get_mut(b"Annots") {
        Ok(Object::Array(items)) => {
            items.push(Object::Reference(annot_id));
            return Ok(());
        }
        Ok(Object::Reference(id)) => Some(*id),
        _ => None,
    };

    match indirect {
        Some(array_id) => {
            let items = pdf
                .get_object_mut(array_id)
                .and_then(Object::as_array_mut)
                .map_err(|e| e.to_string())?;
            items.push(Object::Reference(annot_id));
        }
        None => page.set("Annots", vec![Object::Reference(annot_id)]),
    }
    Ok(())
}
