//! Application state management

use std::sync::Arc;

use crate::config::Config;
use crate::ocr::{OrientationDetector, TesseractOsd};
use crate::pipeline::RotationPipeline;

/// Shared application state
///
/// Immutable after startup; requests only read from it.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    pipeline: RotationPipeline,
}

impl AppState {
    /// Create application state backed by the Tesseract CLI
    pub fn new(config: Config) -> Self {
        let detector = Arc::new(TesseractOsd::new(
            &config.ocr.tesseract_cmd,
            config.ocr.min_confidence,
        ));
        Self::with_detector(config, detector)
    }

    /// Create application state with a specific orientation detector
    pub fn with_detector(config: Config, detector: Arc<dyn OrientationDetector>) -> Self {
        let pipeline = RotationPipeline::new(detector, config.raster.dpi);
        Self {
            inner: Arc::new(AppStateInner { config, pipeline }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the rotation pipeline
    pub fn pipeline(&self) -> &RotationPipeline {
        &self.inner.pipeline
    }
}
