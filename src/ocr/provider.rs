//! Orientation Detectors
//!
//! Defines the detector trait and the Tesseract OSD implementation.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use super::types::{OcrError, OrientationResult, OsdReport, Rotation};

/// Orientation detector trait
#[async_trait]
pub trait OrientationDetector: Send + Sync {
    /// Short engine name for logs
    fn name(&self) -> &'static str;

    /// Check if the engine can be invoked
    async fn is_available(&self) -> bool;

    /// Detect the clockwise correction for a PNG-encoded page image.
    ///
    /// Too little text is not an error: implementations return
    /// [`OrientationResult::inconclusive`].
    async fn detect(&self, image_png: &[u8]) -> Result<OrientationResult, OcrError>;
}

/// Tesseract orientation and script detection (`--psm 0`)
pub struct TesseractOsd {
    command: String,
    min_confidence: f32,
}

impl TesseractOsd {
    pub fn new(command: &str, min_confidence: f32) -> Self {
        Self {
            command: command.to_string(),
            min_confidence,
        }
    }

    /// Turn a parsed reading into a decision, keeping the raw reading either way
    fn judge(&self, osd: OsdReport) -> OrientationResult {
        if osd.confidence < self.min_confidence {
            tracing::debug!(
                orientation = osd.orientation,
                confidence = osd.confidence,
                min_confidence = self.min_confidence,
                "OSD confidence below threshold, not rotating"
            );
            return OrientationResult::rejected(osd);
        }

        match Rotation::correcting(i64::from(osd.orientation)) {
            Some(angle) => OrientationResult::new(angle, osd.confidence),
            None => {
                tracing::warn!(
                    orientation = osd.orientation,
                    "Tesseract reported a non-cardinal orientation"
                );
                OrientationResult::rejected(osd)
            }
        }
    }
}

#[async_trait]
impl OrientationDetector for TesseractOsd {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    async fn is_available(&self) -> bool {
        Command::new(&self.command)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|status| status.success())
            .unwrap_or(false)
    }

    async fn detect(&self, image_png: &[u8]) -> Result<OrientationResult, OcrError> {
        if image_png.is_empty() {
            return Err(OcrError::InvalidImage("empty page image".to_string()));
        }

        // Dropped at the end of detection, taking the input file with it
        let temp_dir = tempfile::Builder::new().prefix("upright-osd").tempdir()?;
        let input_path = temp_dir.path().join("page.png");
        tokio::fs::write(&input_path, image_png).await?;

        let output = Command::new(&self.command)
            .arg(&input_path)
            .arg("stdout")
            .arg("--psm")
            .arg("0")
            .output()
            .await
            .map_err(|e| {
                OcrError::EngineUnavailable(format!("Failed to run {}: {}", self.command, e))
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            if is_insufficient_text(&stderr) {
                tracing::debug!("Tesseract found too little text for OSD");
                return Ok(OrientationResult::inconclusive());
            }
            return Err(OcrError::EngineFailed(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let Some(osd) = parse_osd(&stdout) else {
            tracing::debug!("Tesseract OSD output had no orientation line");
            return Ok(OrientationResult::inconclusive());
        };

        Ok(self.judge(osd))
    }
}

/// Parse the `key: value` report printed by `tesseract ... --psm 0`.
///
/// Returns `None` when the orientation line is absent.
pub fn parse_osd(output: &str) -> Option<OsdReport> {
    let mut orientation = None;
    let mut confidence = 0.0;

    for line in output.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        match key.trim() {
            "Orientation in degrees" => orientation = value.trim().parse::<u16>().ok(),
            "Orientation confidence" => confidence = value.trim().parse::<f32>().unwrap_or(0.0),
            _ => {}
        }
    }

    orientation.map(|orientation| OsdReport {
        orientation,
        confidence,
    })
}

fn is_insufficient_text(stderr: &str) -> bool {
    stderr.contains("Too few characters") || stderr.contains("Skipping this page")
}

/// Detector returning a fixed result, for tests
#[cfg(test)]
pub struct FixedDetector {
    pub result: OrientationResult,
}

#[cfg(test)]
#[async_trait]
impl OrientationDetector for FixedDetector {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn detect(&self, _image_png: &[u8]) -> Result<OrientationResult, OcrError> {
        Ok(self.result)
    }
}
