//! OCR Module
//!
//! Orientation and script detection for page images.
//!
//! The engine sits behind [`OrientationDetector`]; the production backend
//! shells out to the Tesseract CLI in OSD mode.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use upright_server::ocr::{OrientationDetector, TesseractOsd};
//!
//! let detector = TesseractOsd::new("tesseract", 1.0);
//! let result = detector.detect(&page_png).await?;
//! println!("rotate {}° clockwise", result.angle);
//! ```

mod provider;
mod types;

pub use provider::{parse_osd, OrientationDetector, TesseractOsd};
pub use types::{OcrError, OrientationResult, OsdReport, Rotation};

#[cfg(test)]
pub use provider::FixedDetector;
