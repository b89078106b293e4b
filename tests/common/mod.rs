//! Shared helpers for HTTP-level tests
#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, Response};
use axum::Router;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use lopdf::{dictionary, Document, Object, Stream};
use tower::ServiceExt;

use upright_server::config::Config;
use upright_server::ocr::{OcrError, OrientationDetector, OrientationResult, Rotation};
use upright_server::routes;
use upright_server::state::AppState;

const BOUNDARY: &str = "upright-test-boundary";

/// Stands in for the OCR engine by locating a dark marker.
///
/// Fixtures draw a marker in the top-left corner of upright content, so the
/// quadrant it lands in tells how the content was turned. No marker means no
/// readable text.
pub struct MarkerDetector;

#[async_trait]
impl OrientationDetector for MarkerDetector {
    fn name(&self) -> &'static str {
        "marker"
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn detect(&self, image_png: &[u8]) -> Result<OrientationResult, OcrError> {
        let img = image::load_from_memory(image_png)
            .map_err(|e| OcrError::InvalidImage(e.to_string()))?
            .to_luma8();

        let (mut sum_x, mut sum_y, mut count) = (0u64, 0u64, 0u64);
        for (x, y, pixel) in img.enumerate_pixels() {
            if pixel.0[0] < 128 {
                sum_x += u64::from(x);
                sum_y += u64::from(y);
                count += 1;
            }
        }

        if count == 0 {
            return Ok(OrientationResult::inconclusive());
        }

        let left = (sum_x / count) < u64::from(img.width() / 2);
        let top = (sum_y / count) < u64::from(img.height() / 2);

        // Marker position -> how the content is turned clockwise
        let turned = match (top, left) {
            (true, true) => Rotation::Upright,
            (true, false) => Rotation::Cw90,
            (false, false) => Rotation::Cw180,
            (false, true) => Rotation::Cw270,
        };

        Ok(OrientationResult::new(turned.inverse(), 10.0))
    }
}

pub fn test_config(max_upload_size: usize) -> Config {
    let mut config = Config::default();
    config.upload.max_upload_size = max_upload_size;
    config.raster.dpi = 72;
    config
}

pub fn marker_app(max_upload_size: usize) -> Router {
    let state = AppState::with_detector(test_config(max_upload_size), Arc::new(MarkerDetector));
    routes::app(state)
}

/// Upright content: white page with a dark block in the top-left corner
pub fn upright_image() -> DynamicImage {
    let mut img = RgbImage::from_pixel(120, 60, Rgb([255, 255, 255]));
    for x in 5..25 {
        for y in 5..15 {
            img.put_pixel(x, y, Rgb([0, 0, 0]));
        }
    }
    DynamicImage::ImageRgb8(img)
}

pub fn blank_image() -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(120, 60, Rgb([255, 255, 255])))
}

pub fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut out = Vec::new();
    image
        .write_to(&mut std::io::Cursor::new(&mut out), format)
        .unwrap();
    out
}

/// Content stream drawing the marker in the top-left of a letter page
pub const MARKER_TOP_LEFT: &str = "0 g 20 742 50 30 re f";
/// The same marker as it appears after the page content is turned 180°
pub const MARKER_BOTTOM_RIGHT: &str = "0 g 542 20 50 30 re f";

/// Build a letter-sized PDF with one page per content stream
pub fn build_pdf(contents: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::new();
    for content in contents {
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.as_bytes().to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    let pages = dictionary! {
        "Type" => "Pages",
        "Count" => kids.len() as i64,
        "Kids" => kids,
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

/// Point `startxref` past the end of the file; readers have to rebuild the xref
pub fn damage_xref(pdf: &[u8]) -> Vec<u8> {
    let marker = b"startxref";
    let at = pdf
        .windows(marker.len())
        .rposition(|window| window == marker)
        .unwrap();

    let mut out = pdf[..at].to_vec();
    out.extend_from_slice(b"startxref\n999999\n%%EOF\n");
    out
}

/// Effective /Rotate of each page, in page order
pub fn pdf_page_rotations(data: &[u8]) -> Vec<i64> {
    let doc = Document::load_mem(data).unwrap();
    doc.get_pages()
        .values()
        .map(|id| {
            doc.get_dictionary(*id)
                .unwrap()
                .get(b"Rotate")
                .and_then(Object::as_i64)
                .unwrap_or(0)
        })
        .collect()
}

/// Build a multipart POST with a single file part
pub fn multipart_request(
    uri: &str,
    field: &str,
    file_name: &str,
    content_type: Option<&str>,
    data: &[u8],
) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, file_name
        )
        .as_bytes(),
    );
    if let Some(content_type) = content_type {
        body.extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
    }
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

pub async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub fn header_str<'a>(response: &'a Response<Body>, name: &str) -> Option<&'a str> {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
}
