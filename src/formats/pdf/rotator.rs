//! Per-page PDF rotation
//!
//! Sets each page's `/Rotate` so viewers display it upright. Content streams,
//! resources and the document info dictionary are left as they are.

use mupdf::pdf::{PdfDocument, PdfPage};

use crate::formats::FormatError;
use crate::ocr::Rotation;

/// Open through MuPDF, which repairs broken xref tables and trailers the same
/// way the rasterizer does
fn load(data: &[u8]) -> Result<PdfDocument, FormatError> {
    PdfDocument::from_bytes(data)
        .map_err(|e| FormatError::Parse(format!("cannot open PDF: {}", e)))
}

fn load_page(doc: &PdfDocument, index: i32) -> Result<PdfPage, FormatError> {
    doc.load_page(index)
        .and_then(PdfPage::try_from)
        .map_err(|e| FormatError::Parse(format!("page {}: {}", index + 1, e)))
}

fn page_count(doc: &PdfDocument) -> Result<usize, FormatError> {
    let count = doc
        .page_count()
        .map_err(|e| FormatError::Parse(e.to_string()))?;
    if count <= 0 {
        return Err(FormatError::Parse("PDF has no pages".to_string()));
    }
    Ok(count as usize)
}

/// Current effective rotation of every page, in page order
pub fn page_rotations(data: &[u8]) -> Result<Vec<Rotation>, FormatError> {
    let doc = load(data)?;
    (0..page_count(&doc)?)
        .map(|index| {
            let page = load_page(&doc, index as i32)?;
            Ok(effective_rotation(&page))
        })
        .collect()
}

/// Apply one clockwise correction per page and serialize the result.
///
/// `rotations` must have exactly one entry per page.
pub fn apply_page_rotations(data: &[u8], rotations: &[Rotation]) -> Result<Vec<u8>, FormatError> {
    let doc = load(data)?;
    let pages = page_count(&doc)?;

    if pages != rotations.len() {
        return Err(FormatError::PageCount {
            expected: pages,
            actual: rotations.len(),
        });
    }

    for (index, correction) in rotations.iter().enumerate() {
        if correction.is_upright() {
            continue;
        }

        let mut page = load_page(&doc, index as i32)?;
        let current = effective_rotation(&page);
        let updated = current.then(*correction);

        page.set_rotation(i32::from(updated.degrees()))
            .map_err(|e| FormatError::Parse(format!("page {}: {}", index + 1, e)))?;

        tracing::debug!(
            page = index + 1,
            current = %current,
            correction = %correction,
            updated = %updated,
            "Rotated PDF page"
        );
    }

    let mut output = Vec::new();
    doc.write_to(&mut output)
        .map_err(|e| FormatError::Encode(format!("PDF: {}", e)))?;
    Ok(output)
}

/// `/Rotate` of a page, inherited from the nearest ancestor that sets it
fn effective_rotation(page: &PdfPage) -> Rotation {
    let degrees = page.rotation().unwrap_or(0);
    // /Rotate must be a multiple of 90; viewers ignore anything else
    Rotation::from_degrees(i64::from(degrees)).unwrap_or_default()
}
