//! Content-stream interpretation.
//!
//! Walks the text and graphics operators of a page and records where
//! every glyph lands in user space. Only state that affects glyph
//! placement is tracked; painting operators are ignored.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document as PdfDocument, Object, ObjectId};
use std::collections::HashMap;
use std::rc::Rc;

use super::fonts::FontInfo;
use super::layout::LayoutError;
use super::objects::{get, get_dict, get_name, number, stream_bytes};
use crate::models::Rect;

/// Nesting limit for Form XObjects
const MAX_FORM_DEPTH: usize = 8;

/// Form XObject invocations interpreted per page, across all nesting levels
const MAX_FORM_INVOCATIONS: usize = 1024;

/// Glyph extent below and above the baseline, in em
const DESCENT: f32 = 0.2;
const ASCENT: f32 = 0.8;

/// Affine transform `[a b c d e f]` using PDF's row-vector convention
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn translate(tx: f32, ty: f32) -> Self {
        Matrix {
            e: tx,
            f: ty,
            ..Self::IDENTITY
        }
    }

    fn from_operands(operands: &[Object]) -> Option<Self> {
        let v: Vec<f32> = operands.iter().filter_map(number).collect();
        match v.as_slice() {
            [a, b, c, d, e, f] => Some(Matrix {
                a: *a,
                b: *b,
                c: *c,
                d: *d,
                e: *e,
                f: *f,
            }),
            _ => None,
        }
    }

    /// `self × other`: apply `self` first, then `other`
    pub fn then(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// Length of the transformed unit y vector
    fn vertical_scale(&self) -> f32 {
        self.c.hypot(self.d)
    }
}

/// A glyph placed on the page
#[derive(Debug, Clone, PartialEq)]
pub struct PositionedGlyph {
    pub text: String,

    /// Glyph box in user space
    pub bbox: Rect,

    /// Baseline origin in user space
    pub origin: (f32, f32),

    /// Baseline end point (origin plus advance) in user space
    pub end: (f32, f32),

    /// Effective font size in user space
    pub size: f32,
}

#[derive(Debug, Clone)]
struct TextState {
    font: Rc<FontInfo>,
    size: f32,
    char_spacing: f32,
    word_spacing: f32,
    horizontal_scale: f32,
    leading: f32,
    rise: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font: Rc::new(FontInfo::fallback()),
            size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    text: TextState,
}

/// Interpreter collecting positioned glyphs from one page
pub struct ContentInterpreter<'a> {
    doc: &'a PdfDocument,
    fonts: HashMap<ObjectId, Rc<FontInfo>>,
    glyphs: Vec<PositionedGlyph>,
    forms_left: usize,
}

impl<'a> ContentInterpreter<'a> {
    pub fn new(doc: &'a PdfDocument) -> Self {
        Self {
            doc,
            fonts: HashMap::new(),
            glyphs: Vec::new(),
            forms_left: MAX_FORM_INVOCATIONS,
        }
    }

    /// Interpret a page and return its glyphs in content order
    pub fn run_page(mut self, page_id: ObjectId) -> Result<Vec<PositionedGlyph>, LayoutError> {
        let content = self.doc.get_page_content(page_id)?;
        let resources = page_resources(self.doc, page_id);
        self.run(&content, resources, Matrix::IDENTITY, 0)?;
        Ok(self.glyphs)
    }

    fn run(
        &mut self,
        content: &[u8],
        resources: Option<&'a Dictionary>,
        ctm: Matrix,
        depth: usize,
    ) -> Result<(), LayoutError> {
        let content = Content::decode(content)?;
        let mut stack: Vec<GraphicsState> = Vec::new();
        let mut gs = GraphicsState {
            ctm,
            text: TextState::default(),
        };
        let mut tm = Matrix::IDENTITY;
        let mut tlm = Matrix::IDENTITY;

        for Operation { operator, operands } in &content.operations {
            match operator.as_str() {
                "q" => stack.push(gs.clone()),
                "Q" => {
                    if let Some(saved) = stack.pop() {
                        gs = saved;
                    }
                }
                "cm" => {
                    if let Some(m) = Matrix::from_operands(operands) {
                        gs.ctm = m.then(&gs.ctm);
                    }
                }
                "BT" => {
                    tm = Matrix::IDENTITY;
                    tlm = Matrix::IDENTITY;
                }
                "Tf" => {
                    if let [Object::Name(name), size] = operands.as_slice() {
                        gs.text.font = self.font(resources, name);
                        gs.text.size = number(size).unwrap_or(0.0);
                    }
                }
                "Tc" => set_number(&mut gs.text.char_spacing, operands),
                "Tw" => set_number(&mut gs.text.word_spacing, operands),
                "TL" => set_number(&mut gs.text.leading, operands),
                "Ts" => set_number(&mut gs.text.rise, operands),
                "Tz" => {
                    if let Some(scale) = operands.first().and_then(number) {
                        gs.text.horizontal_scale = scale / 100.0;
                    }
                }
                "Td" | "TD" => {
                    if let [tx, ty] = operands.as_slice() {
                        let (tx, ty) = (number(tx).unwrap_or(0.0), number(ty).unwrap_or(0.0));
                        if operator == "TD" {
                            gs.text.leading = -ty;
                        }
                        tlm = Matrix::translate(tx, ty).then(&tlm);
                        tm = tlm;
                    }
                }
                "Tm" => {
                    if let Some(m) = Matrix::from_operands(operands) {
                        tlm = m;
                        tm = m;
                    }
                }
                "T*" => {
                    tlm = Matrix::translate(0.0, -gs.text.leading).then(&tlm);
                    tm = tlm;
                }
                "Tj" => {
                    if let Some(Object::String(bytes, _)) = operands.first() {
                        self.show(bytes, &gs, &mut tm);
                    }
                }
                "'" => {
                    tlm = Matrix::translate(0.0, -gs.text.leading).then(&tlm);
                    tm = tlm;
                    if let Some(Object::String(bytes, _)) = operands.first() {
                        self.show(bytes, &gs, &mut tm);
                    }
                }
                "\"" => {
                    if let [aw, ac, Object::String(bytes, _)] = operands.as_slice() {
                        gs.text.word_spacing = number(aw).unwrap_or(0.0);
                        gs.text.char_spacing = number(ac).unwrap_or(0.0);
                        tlm = Matrix::translate(0.0, -gs.text.leading).then(&tlm);
                        tm = tlm;
                        self.show(bytes, &gs, &mut tm);
                    }
                }
                "TJ" => {
                    if let Some(Object::Array(items)) = operands.first() {
                        for item in items {
                            match item {
                                Object::String(bytes, _) => self.show(bytes, &gs, &mut tm),
                                other => {
                                    if let Some(adjust) = number(other) {
                                        let tx = -adjust / 1000.0
                                            * gs.text.size
                                            * gs.text.horizontal_scale;
                                        tm = Matrix::translate(tx, 0.0).then(&tm);
                                    }
                                }
                            }
                        }
                    }
                }
                "Do" => {
                    if let Some(Object::Name(name)) = operands.first() {
                        self.run_form(resources, name, gs.ctm, depth)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn run_form(
        &mut self,
        resources: Option<&'a Dictionary>,
        name: &[u8],
        ctm: Matrix,
        depth: usize,
    ) -> Result<(), LayoutError> {
        if depth >= MAX_FORM_DEPTH {
            tracing::debug!("Form XObject nesting limit reached, skipping");
            return Ok(());
        }
        if self.forms_left == 0 {
            return Ok(());
        }
        let doc = self.doc;
        let Some(stream) = resources
            .and_then(|r| get_dict(doc, r, b"XObject"))
            .and_then(|xobjects| get(doc, xobjects, name))
            .and_then(|obj| match obj {
                Object::Stream(s) => Some(s),
                _ => None,
            })
        else {
            return Ok(());
        };
        if get_name(doc, &stream.dict, b"Subtype") != Some(b"Form".as_slice()) {
            return Ok(());
        }

        let matrix = match get(doc, &stream.dict, b"Matrix") {
            Some(Object::Array(items)) => Matrix::from_operands(items).unwrap_or(Matrix::IDENTITY),
            _ => Matrix::IDENTITY,
        };
        let form_resources = get_dict(doc, &stream.dict, b"Resources").or(resources);

        self.forms_left -= 1;
        if self.forms_left == 0 {
            tracing::debug!("Form XObject budget exhausted, skipping further forms");
        }

        self.run(
            &stream_bytes(stream),
            form_resources,
            matrix.then(&ctm),
            depth + 1,
        )
    }

    fn font(&mut self, resources: Option<&'a Dictionary>, name: &[u8]) -> Rc<FontInfo> {
        let doc = self.doc;
        let Some(fonts) = resources.and_then(|r| get_dict(doc, r, b"Font")) else {
            return Rc::new(FontInfo::fallback());
        };

        match fonts.get(name).ok() {
            Some(Object::Reference(id)) => {
                if let Some(font) = self.fonts.get(id) {
                    return Rc::clone(font);
                }
                let info = match doc.get_dictionary(*id) {
                    Ok(dict) => FontInfo::from_dict(doc, dict),
                    Err(_) => FontInfo::fallback(),
                };
                let info = Rc::new(info);
                self.fonts.insert(*id, Rc::clone(&info));
                info
            }
            Some(Object::Dictionary(dict)) => Rc::new(FontInfo::from_dict(doc, dict)),
            _ => Rc::new(FontInfo::fallback()),
        }
    }

    fn show(&mut self, bytes: &[u8], gs: &GraphicsState, tm: &mut Matrix) {
        let state = &gs.text;
        for glyph in state.font.decode(bytes) {
            let w0 = glyph.width / 1000.0;
            let advance = w0 * state.size * state.horizontal_scale;
            let trm = tm.then(&gs.ctm);

            let lo = state.rise - DESCENT * state.size;
            let hi = state.rise + ASCENT * state.size;
            let corners = [
                trm.apply(0.0, lo),
                trm.apply(advance, lo),
                trm.apply(0.0, hi),
                trm.apply(advance, hi),
            ];

            let text: String = glyph.text.chars().filter(|c| !c.is_control()).collect();
            let size = state.size * trm.vertical_scale();
            match Rect::from_points(&corners) {
                Some(bbox) if !text.is_empty() && size > 0.0 => {
                    self.glyphs.push(PositionedGlyph {
                        text,
                        bbox,
                        origin: trm.apply(0.0, state.rise),
                        end: trm.apply(advance, state.rise),
                        size,
                    });
                }
                _ => {}
            }

            let spacing = state.char_spacing
                + if glyph.is_word_space {
                    state.word_spacing
                } else {
                    0.0
                };
            let tx = (w0 * state.size + spacing) * state.horizontal_scale;
            *tm = Matrix::translate(tx, 0.0).then(tm);
        }
    }
}

fn set_number(target: &mut f32, operands: &[Object]) {
    if let Some(value) = operands.first().and_then(number) {
        *target = value;
    }
}

/// Resource dictionary of a page, following the inherited `Parent` chain
fn page_resources(doc: &PdfDocument, page_id: ObjectId) -> Option<&Dictionary> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..32 {
        if let Some(resources) = get_dict(doc, node, b"Resources") {
            return Some(resources);
        }
        node = match node.get(b"Parent").ok()? {
            Object::Reference(parent) => doc.get_dictionary(*parent).ok()?,
            _ => return None,
        };
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_then_applies_left_first() {
        let scale = Matrix {
            a: 2.0,
            d: 2.0,
            ..Matrix::IDENTITY
        };
        let shift = Matrix::translate(10.0, 5.0);

        assert_eq!(scale.then(&shift).apply(1.0, 1.0), (12.0, 7.0));
        assert_eq!(shift.then(&scale).apply(1.0, 1.0), (22.0, 12.0));
    }

    #[test]
    fn test_self_invoking_form_is_bounded() {
        use lopdf::{dictionary, Stream};

        let mut doc = PdfDocument::with_version("1.5");
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let form_id = doc.new_object_id();
        let body = format!("BT /F1 10 Tf 0 0 Td (x) Tj ET {}", "/Fm0 Do ".repeat(8));
        doc.objects.insert(
            form_id,
            Object::Stream(Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Form",
                    "BBox" => vec![0.into(), 0.into(), 100.into(), 100.into()],
                    "Resources" => dictionary! {
                        "Font" => dictionary! { "F1" => font_id },
                        "XObject" => dictionary! { "Fm0" => form_id },
                    },
                },
                body.into_bytes(),
            )),
        );
        let content_id = doc.add_object(Stream::new(dictionary! {}, b"/Fm0 Do".to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Fm0" => form_id },
            },
        });

        let glyphs = ContentInterpreter::new(&doc).run_page(page_id).unwrap();
        assert_eq!(glyphs.len(), MAX_FORM_INVOCATIONS);
    }

    #[test]
    fn test_vertical_scale() {
        let m = Matrix {
            d: 3.0,
            ..Matrix::IDENTITY
        };
        assert_eq!(m.vertical_scale(), 3.0);
    }
}
