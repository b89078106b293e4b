//! Rotation correction endpoint
//!
//! Endpoints:
//! - POST /fix_rotation - Upload an image or PDF, get it back upright
//! - POST /fix_rotation?debug=true - Per-page detection report as JSON

use axum::{
    body::{Body, Bytes},
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::document::{Upload, UploadKind};
use crate::error::{Result, RotationError};
use crate::pipeline::{CorrectedFile, PageDiagnostic};
use crate::state::AppState;

/// Header carrying the clockwise rotation applied to the file
pub const ROTATION_APPLIED_HEADER: &str = "x-rotation-applied";
/// Header carrying per-page rotations for PDFs
pub const ROTATION_PAGES_HEADER: &str = "x-rotation-pages";

/// Multipart field holding the document
const FILE_FIELD: &str = "file";

/// Room for multipart boundaries and part headers on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

// ============================================================================
// Router
// ============================================================================

/// Create the rotation router
pub fn router(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        .route("/fix_rotation", post(fix_rotation))
        .layer(DefaultBodyLimit::max(
            max_upload_size.saturating_add(MULTIPART_OVERHEAD),
        ))
}

/// Query parameters for /fix_rotation
#[derive(Debug, Default, Deserialize)]
pub struct FixRotationQuery {
    /// Return detection diagnostics instead of the corrected file
    #[serde(default)]
    pub debug: Option<String>,
}

impl FixRotationQuery {
    fn is_debug(&self) -> bool {
        matches!(
            self.debug.as_deref().map(str::trim),
            Some("1") | Some("true") | Some("yes") | Some("on")
        )
    }
}

#[derive(Serialize)]
struct DiagnosticsResponse {
    diagnostics: Vec<PageDiagnostic>,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /fix_rotation
///
/// Detects the orientation of each page and returns the file with the
/// rotation removed, in the same format it was uploaded in.
async fn fix_rotation(
    State(state): State<AppState>,
    Query(query): Query<FixRotationQuery>,
    multipart: Multipart,
) -> Result<Response> {
    let request_id = Uuid::new_v4();
    let max_size = state.config().upload.max_upload_size;

    let upload = read_upload(multipart, max_size).await?;

    tracing::info!(
        request_id = %request_id,
        file_name = ?upload.file_name,
        kind = %upload.kind,
        size = upload.data.len(),
        debug = query.is_debug(),
        "Upload validated"
    );

    if query.is_debug() {
        let diagnostics = state.pipeline().diagnose(&upload).await?;
        tracing::info!(
            request_id = %request_id,
            diagnostics = ?diagnostics,
            "Rotation diagnostics"
        );
        return Ok(Json(DiagnosticsResponse { diagnostics }).into_response());
    }

    let corrected = state.pipeline().correct(&upload).await?;

    tracing::info!(
        request_id = %request_id,
        applied = %corrected.applied(),
        pages = corrected.page_rotations.len(),
        changed = corrected.changed(),
        "Rotation corrected"
    );

    corrected_response(&upload, corrected)
}

// ============================================================================
// Helpers
// ============================================================================

/// Pull the `file` field out of the form, enforcing the size cap while streaming
async fn read_upload(mut multipart: Multipart, max_size: usize) -> Result<Upload> {
    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);

        let mut data = Vec::new();
        while let Some(chunk) = field.chunk().await? {
            let size = data.len() + chunk.len();
            if size > max_size {
                return Err(RotationError::FileTooLarge {
                    size,
                    max: max_size,
                });
            }
            data.extend_from_slice(&chunk);
        }

        if data.is_empty() {
            return Err(RotationError::EmptyFile);
        }

        let kind = UploadKind::resolve(content_type.as_deref(), file_name.as_deref(), &data)?;

        return Ok(Upload {
            file_name,
            kind,
            data: Bytes::from(data),
        });
    }

    Err(RotationError::MissingFile)
}

fn corrected_response(upload: &Upload, corrected: CorrectedFile) -> Result<Response> {
    let name = upload.display_name();
    let file_name = if corrected.changed() {
        format!("fixed_{}", name)
    } else {
        name
    };

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, corrected.kind.content_type())
        .header(ROTATION_APPLIED_HEADER, corrected.applied().to_string())
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition(&file_name)?,
        );

    if corrected.kind.is_pdf() {
        let pages = corrected
            .page_rotations
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        builder = builder.header(ROTATION_PAGES_HEADER, pages);
    }

    builder
        .body(Body::from(corrected.data))
        .map_err(|e| RotationError::Internal(format!("Failed to build response: {}", e)))
}

fn content_disposition(file_name: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(&format!("attachment; filename=\"{}\"", file_name))
        .map_err(|e| RotationError::Internal(format!("Invalid file name header: {}", e)))
}
