//! Configuration management for Upright Server

use std::env;
use std::str::FromStr;

use serde::Deserialize;

/// Default upload cap: 10 MiB
pub const DEFAULT_MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

/// Accepted range for `RASTER_DPI`
pub const MIN_RASTER_DPI: u32 = 36;
pub const MAX_RASTER_DPI: u32 = 600;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub upload: UploadConfig,
    pub ocr: OcrConfig,
    pub raster: RasterConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Upper bound on accepted upload size in bytes (inclusive)
    pub max_upload_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OcrConfig {
    /// Tesseract binary name or path
    pub tesseract_cmd: String,
    /// OSD results below this confidence are treated as inconclusive
    pub min_confidence: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RasterConfig {
    /// Resolution used when rasterizing PDF pages for detection
    pub dpi: u32,
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },

    #[error("{name} must be between {min} and {max}, got {value}")]
    OutOfRange {
        name: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
            upload: UploadConfig {
                max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
            },
            ocr: OcrConfig {
                tesseract_cmd: "tesseract".to_string(),
                min_confidence: 1.0,
            },
            raster: RasterConfig { dpi: 150 },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build a config from an arbitrary variable source.
    ///
    /// Missing variables take their defaults; present but unparsable ones are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        Ok(Config {
            server: ServerConfig {
                host: lookup("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parse_var(&lookup, "SERVER_PORT", defaults.server.port)?,
            },
            upload: UploadConfig {
                max_upload_size: parse_var(
                    &lookup,
                    "MAX_UPLOAD_SIZE",
                    defaults.upload.max_upload_size,
                )?,
            },
            ocr: OcrConfig {
                tesseract_cmd: lookup("TESSERACT_CMD")
                    .filter(|cmd| !cmd.trim().is_empty())
                    .unwrap_or(defaults.ocr.tesseract_cmd),
                min_confidence: parse_var(
                    &lookup,
                    "OSD_MIN_CONFIDENCE",
                    defaults.ocr.min_confidence,
                )?,
            },
            raster: RasterConfig {
                dpi: parse_dpi(&lookup, defaults.raster.dpi)?,
            },
        })
    }
}

fn parse_dpi<F>(lookup: &F, default: u32) -> Result<u32, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let dpi = parse_var(lookup, "RASTER_DPI", default)?;
    if !(MIN_RASTER_DPI..=MAX_RASTER_DPI).contains(&dpi) {
        return Err(ConfigError::OutOfRange {
            name: "RASTER_DPI",
            value: dpi,
            min: MIN_RASTER_DPI,
            max: MAX_RASTER_DPI,
        });
    }
    Ok(dpi)
}

fn parse_var<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value: raw }),
    }
}
