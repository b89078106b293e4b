//! Orientation Types
//!
//! Defines the rotation model shared by detection and correction.

use std::fmt;

use serde::Serialize;

/// Clockwise rotation restricted to the four cardinal angles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(into = "u16")]
pub enum Rotation {
    #[default]
    Upright,
    Cw90,
    Cw180,
    Cw270,
}

impl Rotation {
    pub const ALL: [Rotation; 4] = [Self::Upright, Self::Cw90, Self::Cw180, Self::Cw270];

    /// Build from any multiple of 90 degrees, normalizing negatives and full turns
    pub fn from_degrees(degrees: i64) -> Option<Self> {
        match degrees.rem_euclid(360) {
            0 => Some(Self::Upright),
            90 => Some(Self::Cw90),
            180 => Some(Self::Cw180),
            270 => Some(Self::Cw270),
            _ => None,
        }
    }

    /// Clockwise correction for an OSD orientation reading.
    ///
    /// The engine reports how far the content is turned; undoing it takes the
    /// complementary clockwise turn.
    pub fn correcting(orientation_degrees: i64) -> Option<Self> {
        Self::from_degrees(orientation_degrees).map(Self::inverse)
    }

    pub fn degrees(self) -> u16 {
        match self {
            Self::Upright => 0,
            Self::Cw90 => 90,
            Self::Cw180 => 180,
            Self::Cw270 => 270,
        }
    }

    pub fn is_upright(self) -> bool {
        self == Self::Upright
    }

    /// The rotation that undoes this one
    pub fn inverse(self) -> Self {
        match self {
            Self::Upright => Self::Upright,
            Self::Cw90 => Self::Cw270,
            Self::Cw180 => Self::Cw180,
            Self::Cw270 => Self::Cw90,
        }
    }

    /// Apply `other` after `self`
    pub fn then(self, other: Rotation) -> Self {
        let total = i64::from(self.degrees()) + i64::from(other.degrees());
        // Sum of two cardinal angles is always cardinal
        Self::from_degrees(total).unwrap_or_default()
    }
}

impl From<Rotation> for u16 {
    fn from(rotation: Rotation) -> Self {
        rotation.degrees()
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.degrees())
    }
}

/// Raw orientation reading from the engine, before any threshold is applied
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OsdReport {
    /// Degrees the content is currently turned
    pub orientation: u16,
    pub confidence: f32,
}

/// Result of orientation detection on one page image
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OrientationResult {
    /// Clockwise correction needed to make the text upright
    pub angle: Rotation,
    /// What the engine reported, if it reported anything
    pub reading: Option<OsdReport>,
}

impl OrientationResult {
    /// Accepted reading: apply `angle`
    pub fn new(angle: Rotation, confidence: f32) -> Self {
        Self {
            angle,
            reading: Some(OsdReport {
                orientation: angle.inverse().degrees(),
                confidence,
            }),
        }
    }

    /// Not enough signal to decide: leave the page as it is
    pub fn inconclusive() -> Self {
        Self {
            angle: Rotation::Upright,
            reading: None,
        }
    }

    /// A reading that was not trusted; the page is left as it is
    pub fn rejected(reading: OsdReport) -> Self {
        Self {
            angle: Rotation::Upright,
            reading: Some(reading),
        }
    }

    /// Engine confidence; 0 when nothing was read
    pub fn confidence(&self) -> f32 {
        self.reading.map_or(0.0, |r| r.confidence)
    }

    /// Orientation the engine saw in degrees, whether or not it was acted on
    pub fn detected_degrees(&self) -> u16 {
        self.reading.map_or(0, |r| r.orientation)
    }
}

/// OCR error types
#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("OCR engine not available: {0}")]
    EngineUnavailable(String),

    #[error("OCR engine failed: {0}")]
    EngineFailed(String),

    #[error("Invalid image for OCR: {0}")]
    InvalidImage(String),

    #[error("OCR I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl OcrError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::EngineUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
