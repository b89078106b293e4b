//! Rotation correction pipeline
//!
//! Orchestrates rasterization, orientation detection and rotation for one
//! upload. Each call owns its buffers; nothing is shared between requests
//! beyond the detector handle.

use std::sync::Arc;

use axum::body::Bytes;
use serde::Serialize;

use crate::document::{ImageKind, Upload, UploadKind};
use crate::error::Result;
use crate::formats::{self, pdf::PdfRasterizer, FormatError};
use crate::ocr::{OrientationDetector, OrientationResult, Rotation};

/// Corrected output for one upload
#[derive(Debug, Clone)]
pub struct CorrectedFile {
    pub kind: UploadKind,
    pub data: Bytes,
    /// Clockwise correction applied to each page; a single entry for images
    pub page_rotations: Vec<Rotation>,
}

impl CorrectedFile {
    /// Whether any page was rotated
    pub fn changed(&self) -> bool {
        self.page_rotations.iter().any(|r| !r.is_upright())
    }

    /// Single rotation reported for the whole file.
    ///
    /// The most common non-zero page rotation; ties go to the earliest page.
    pub fn applied(&self) -> Rotation {
        summarize(&self.page_rotations)
    }
}

/// Per-page detection report for diagnostics mode
#[derive(Debug, Clone, Serialize)]
pub struct PageDiagnostic {
    /// 1-based page number
    pub page: usize,
    /// Orientation reported by the engine, even when it was not acted on
    pub detected_deg: u16,
    pub confidence: f32,
    /// Correction that would be applied
    pub rotate_clockwise: Rotation,
    pub needs_rotation: bool,
}

impl PageDiagnostic {
    fn new(page: usize, result: OrientationResult) -> Self {
        Self {
            page,
            detected_deg: result.detected_degrees(),
            confidence: result.confidence(),
            rotate_clockwise: result.angle,
            needs_rotation: !result.angle.is_upright(),
        }
    }
}

/// Detection and correction for a single upload at a time
#[derive(Clone)]
pub struct RotationPipeline {
    detector: Arc<dyn OrientationDetector>,
    raster_dpi: u32,
}

impl RotationPipeline {
    pub fn new(detector: Arc<dyn OrientationDetector>, raster_dpi: u32) -> Self {
        Self {
            detector,
            raster_dpi,
        }
    }

    pub fn detector(&self) -> &Arc<dyn OrientationDetector> {
        &self.detector
    }

    /// Detect and remove rotation, returning the file in its original format
    pub async fn correct(&self, upload: &Upload) -> Result<CorrectedFile> {
        let results = self.detect_pages(upload).await?;
        let page_rotations: Vec<Rotation> = results.iter().map(|r| r.angle).collect();

        if page_rotations.iter().all(|r| r.is_upright()) {
            return Ok(CorrectedFile {
                kind: upload.kind,
                data: upload.data.clone(),
                page_rotations,
            });
        }

        let data = upload.data.clone();
        let rotations = page_rotations.clone();
        let kind = upload.kind;

        let output = tokio::task::spawn_blocking(move || match kind {
            UploadKind::Pdf => formats::pdf::apply_page_rotations(&data, &rotations),
            UploadKind::Image(image) => {
                formats::image::rotate_encoded(image, &data, summarize(&rotations))
            }
        })
        .await
        .map_err(FormatError::from)??;

        Ok(CorrectedFile {
            kind: upload.kind,
            data: Bytes::from(output),
            page_rotations,
        })
    }

    /// Run detection only and report what would be done per page
    pub async fn diagnose(&self, upload: &Upload) -> Result<Vec<PageDiagnostic>> {
        let results = self.detect_pages(upload).await?;
        Ok(results
            .into_iter()
            .enumerate()
            .map(|(index, result)| PageDiagnostic::new(index + 1, result))
            .collect())
    }

    async fn detect_pages(&self, upload: &Upload) -> Result<Vec<OrientationResult>> {
        match upload.kind {
            UploadKind::Image(image) => {
                let result = self.detect_image(image, upload.data.clone()).await?;
                Ok(vec![result])
            }
            UploadKind::Pdf => self.detect_pdf(upload.data.clone()).await,
        }
    }

    async fn detect_image(&self, kind: ImageKind, data: Bytes) -> Result<OrientationResult> {
        let png = tokio::task::spawn_blocking(move || formats::image::detection_png(kind, &data))
            .await
            .map_err(FormatError::from)??;

        let result = self.detector.detect(&png).await?;

        tracing::debug!(
            format = %kind,
            angle = %result.angle,
            confidence = result.confidence(),
            "Detected image orientation"
        );

        Ok(result)
    }

    async fn detect_pdf(&self, data: Bytes) -> Result<Vec<OrientationResult>> {
        let rasterizer = PdfRasterizer::open(data, self.raster_dpi).await?;
        let mut results = Vec::with_capacity(rasterizer.page_count());

        // Any page failure fails the whole document
        for index in 0..rasterizer.page_count() {
            let png = rasterizer.render_page(index).await?;
            let result = self.detector.detect(&png).await?;

            tracing::debug!(
                page = index + 1,
                angle = %result.angle,
                confidence = result.confidence(),
                "Detected page orientation"
            );

            results.push(result);
        }

        Ok(results)
    }
}

fn summarize(rotations: &[Rotation]) -> Rotation {
    let mut counts: Vec<(Rotation, usize)> = Vec::new();
    for rotation in rotations.iter().filter(|r| !r.is_upright()) {
        match counts.iter_mut().find(|(r, _)| r == rotation) {
            Some((_, count)) => *count += 1,
            None => counts.push((*rotation, 1)),
        }
    }

    // max_by_key keeps the last maximum; iterate in reverse so ties favor the earliest
    counts
        .into_iter()
        .rev()
        .max_by_key(|(_, count)| *count)
        .map(|(rotation, _)| rotation)
        .unwrap_or_default()
}
