//! Error types for the Upright server

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::formats::FormatError;
use crate::ocr::OcrError;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, RotationError>;

/// Application error type
#[derive(Error, Debug)]
pub enum RotationError {
    #[error("No file uploaded in field 'file'")]
    MissingFile,

    #[error("Uploaded file is empty")]
    EmptyFile,

    #[error("Failed to read upload: {0}")]
    Multipart(#[from] MultipartError),

    #[error("Uploaded file is too large: {size} bytes exceeds limit of {max}")]
    FileTooLarge { size: usize, max: usize },

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RotationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingFile | Self::EmptyFile => StatusCode::BAD_REQUEST,
            Self::Multipart(e) => e.status(),
            Self::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::InvalidDocument(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Ocr(e) => e.status_code(),
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            Self::MissingFile => "missing_file",
            Self::EmptyFile => "empty_file",
            Self::Multipart(_) => "bad_request",
            Self::FileTooLarge { .. } => "file_too_large",
            Self::UnsupportedMediaType(_) => "unsupported_media_type",
            Self::InvalidDocument(_) => "invalid_document",
            Self::Ocr(OcrError::EngineUnavailable(_)) => "ocr_unavailable",
            Self::Ocr(_) => "ocr_error",
            Self::Internal(_) => "internal_error",
        }
    }
}

impl From<FormatError> for RotationError {
    fn from(err: FormatError) -> Self {
        match err {
            FormatError::Decode(_) | FormatError::Render(_) | FormatError::Parse(_) => {
                Self::InvalidDocument(err.to_string())
            }
            FormatError::Encode(_) | FormatError::PageCount { .. } | FormatError::Task(_) => {
                Self::Internal(err.to_string())
            }
        }
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for RotationError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
            match &self {
                Self::Ocr(OcrError::EngineUnavailable(_)) => {
                    "OCR engine is unavailable".to_string()
                }
                Self::Ocr(_) => "OCR processing failed".to_string(),
                _ => "An internal error occurred".to_string(),
            }
        } else {
            tracing::debug!(error = %self, "Rejected upload");
            self.to_string()
        };

        let body = Json(ErrorResponse {
            error: self.error_type().to_string(),
            message,
            details: if cfg!(debug_assertions) {
                Some(self.to_string())
            } else {
                None
            },
        });

        (status, body).into_response()
    }
}
