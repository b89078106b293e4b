//! Format-specific implementations
//!
//! - `image`: raster decode, rotate, re-encode
//! - `pdf`: page rasterization and per-page rotation, both through MuPDF

pub mod image;
pub mod pdf;

use thiserror::Error;

/// Errors raised while decoding, rendering or re-encoding a document
#[derive(Debug, Error)]
pub enum FormatError {
    /// Input bytes could not be decoded as the expected image format
    #[error("Decode error: {0}")]
    Decode(String),

    /// Output could not be encoded
    #[error("Encode error: {0}")]
    Encode(String),

    /// A PDF page could not be rasterized
    #[error("Render error: {0}")]
    Render(String),

    /// PDF structure could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// Rotation list does not line up with the document's pages
    #[error("Expected {expected} page rotations, got {actual}")]
    PageCount { expected: usize, actual: usize },

    /// Blocking task failed to complete
    #[error("Task join error: {0}")]
    Task(String),
}

impl From<mupdf::Error> for FormatError {
    fn from(err: mupdf::Error) -> Self {
        FormatError::Render(err.to_string())
    }
}

impl From<tokio::task::JoinError> for FormatError {
    fn from(err: tokio::task::JoinError) -> Self {
        FormatError::Task(err.to_string())
    }
}
