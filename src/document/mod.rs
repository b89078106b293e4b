//! Upload abstraction
//!
//! Format detection for incoming files (PDF or raster image).

mod types;

pub use types::{ImageKind, Upload, UploadKind};
