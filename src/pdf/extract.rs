//! Text extraction.
//!
//! Loads a PDF from memory, builds the text layout of every page and
//! joins page texts into one string for chunking.

use lopdf::Document as PdfDocument;

use super::layout::{LayoutError, PageLayout};
use crate::models::{Document, Page};

/// Inserted between the texts of consecutive pages
pub const PAGE_SEPARATOR: &str = "\n\n";

/// Parse PDF bytes and index the text layout of every page.
///
/// Only an unreadable container is an error. A page whose content
/// cannot be interpreted gets an empty layout, the same as an
/// image-only page.
pub fn load_document(bytes: &[u8]) -> Result<Document, LayoutError> {
    let pdf = PdfDocument::load_mem(bytes)?;

    let pages = pdf
        .get_pages()
        .into_iter()
        .enumerate()
        .map(|(index, (number, page_id))| {
            let layout = PageLayout::from_page(&pdf, page_id).unwrap_or_else(|e| {
                tracing::warn!("No text recovered from page {}: {}", number, e);
                PageLayout::empty()
            });
            Page {
                index,
                object_id: page_id,
                layout,
            }
        })
        .collect();

    Ok(Document::new(bytes.to_vec(), pages))
}

/// Join the text of all pages, separated by a blank line
pub fn extract_text(document: &Document) -> String {
    document
        .pages()
        .iter()
        .map(Page::text)
        .collect::<Vec<_>>()
        .join(PAGE_SEPARATOR)
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Builders for small PDFs used across the crate's tests.

    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document as PdfDocument, Object, Stream};

    /// One line of text: `(x, y, font size, text)`
    pub type Line<'a> = (f32, f32, f32, &'a str);

    /// Build a PDF whose pages show the given lines in Courier
    pub fn build_pdf(pages: &[Vec<Line<'_>>]) -> Vec<u8> {
        let mut doc = PdfDocument::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
            "FirstChar" => Object::Integer(32),
            "Widths" => (32..127).map(|_| Object::Integer(600)).collect::<Vec<_>>(),
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids = Vec::new();
        for lines in pages {
            let mut operations = Vec::new();
            for (x, y, size, text) in lines {
                operations.push(Operation::new("BT", vec![]));
                operations.push(Operation::new(
                    "Tf",
                    vec![Object::Name(b"F1".to_vec()), Object::Real((*size).into())],
                ));
                operations.push(Operation::new(
                    "Td",
                    vec![Object::Real((*x).into()), Object::Real((*y).into())],
                ));
                operations.push(Operation::new("Tj", vec![Object::string_literal(*text)]));
                operations.push(Operation::new("ET", vec![]));
            }
            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(Object::Reference(page_id));
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => Object::Integer(count),
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }
}
