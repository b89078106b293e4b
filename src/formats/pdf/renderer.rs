//! PDF page rasterizer
//!
//! Renders pages through MuPDF into PNG images for orientation detection.
//! MuPDF documents are not thread-safe, so each render opens a fresh document
//! from the shared bytes inside `spawn_blocking`.

use std::io::Cursor;

use axum::body::Bytes;
use image::{DynamicImage, RgbImage};
use mupdf::{Colorspace, Document, Matrix, Pixmap};

use crate::formats::FormatError;

/// PDF points per inch
const POINTS_PER_INCH: f32 = 72.0;

/// Rasterizer for one uploaded PDF
pub struct PdfRasterizer {
    data: Bytes,
    page_count: usize,
    scale: f32,
}

impl PdfRasterizer {
    /// Validate the document and count its pages.
    ///
    /// `dpi` is taken as configured; range checks happen at config load.
    pub async fn open(data: Bytes, dpi: u32) -> Result<Self, FormatError> {
        let probe = data.clone();
        let page_count = tokio::task::spawn_blocking(move || -> Result<usize, FormatError> {
            let doc = open_document(&probe)?;
            Ok(doc.page_count()?.max(0) as usize)
        })
        .await??;

        if page_count == 0 {
            return Err(FormatError::Render("PDF has no pages".to_string()));
        }

        Ok(Self {
            data,
            page_count,
            scale: dpi as f32 / POINTS_PER_INCH,
        })
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Render a page (0-indexed) to PNG, as a viewer would display it
    pub async fn render_page(&self, index: usize) -> Result<Vec<u8>, FormatError> {
        if index >= self.page_count {
            return Err(FormatError::Render(format!(
                "page index {} out of range (document has {} pages)",
                index, self.page_count
            )));
        }

        let data = self.data.clone();
        let scale = self.scale;

        tokio::task::spawn_blocking(move || -> Result<Vec<u8>, FormatError> {
            let doc = open_document(&data)?;
            let page = doc
                .load_page(index as i32)
                .map_err(|e| FormatError::Render(format!("page {}: {}", index + 1, e)))?;

            // Page /Rotate is applied by MuPDF as part of the page transform
            let matrix = Matrix::new_scale(scale, scale);
            let colorspace = Colorspace::device_rgb();
            let pixmap = page
                .to_pixmap(&matrix, &colorspace, false, false)
                .map_err(|e| FormatError::Render(format!("page {}: {}", index + 1, e)))?;

            encode_pixmap_png(&pixmap)
        })
        .await?
    }
}

fn open_document(data: &[u8]) -> Result<Document, FormatError> {
    Document::from_bytes(data, "application/pdf")
        .map_err(|e| FormatError::Render(format!("cannot open PDF: {}", e)))
}

/// Encode an RGB(A) pixmap to PNG, dropping any alpha channel
fn encode_pixmap_png(pixmap: &Pixmap) -> Result<Vec<u8>, FormatError> {
    let width = pixmap.width() as u32;
    let height = pixmap.height() as u32;
    let samples = pixmap.samples();
    let n = pixmap.n() as usize;

    if n < 3 {
        return Err(FormatError::Render(format!(
            "unexpected pixmap with {} components",
            n
        )));
    }

    let mut rgb_buffer = Vec::with_capacity((width * height * 3) as usize);
    for pixel in samples.chunks_exact(n).take((width * height) as usize) {
        rgb_buffer.extend_from_slice(&pixel[..3]);
    }

    let img = RgbImage::from_raw(width, height, rgb_buffer)
        .ok_or_else(|| FormatError::Render("pixmap smaller than its dimensions".to_string()))?;

    let mut output = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut output), image::ImageFormat::Png)
        .map_err(|e| FormatError::Encode(e.to_string()))?;

    Ok(output)
}
