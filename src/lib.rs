//! Upright Server Library
//!
//! Detects whether an uploaded image or PDF is rotated away from upright and
//! returns it corrected, in the same format.
//!
//! The main server binary is in main.rs.
//!
//! # Modules
//!
//! - `document`: Upload format detection (PDF or raster image)
//! - `formats`: Format-specific rasterization and rotation
//! - `ocr`: Orientation detection via the OCR engine
//! - `pipeline`: Per-upload detect-then-rotate orchestration
//! - `routes`: HTTP endpoints

pub mod config;
pub mod document;
pub mod error;
pub mod formats;
pub mod ocr;
pub mod pipeline;
pub mod routes;
pub mod state;
