//! Upload types
//!
//! Resolves what kind of file was uploaded from its declared content type,
//! file name and magic bytes.

use std::fmt;

use axum::body::Bytes;
use serde::Serialize;

use crate::error::RotationError;

/// How far into a PDF the `%PDF-` header may appear
const PDF_HEADER_WINDOW: usize = 1024;

/// Raster formats accepted for correction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Png,
    Jpeg,
    Tiff,
    Bmp,
    WebP,
}

impl ImageKind {
    /// Canonical MIME type
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Tiff => "image/tiff",
            Self::Bmp => "image/bmp",
            Self::WebP => "image/webp",
        }
    }

    pub fn image_format(&self) -> image::ImageFormat {
        match self {
            Self::Png => image::ImageFormat::Png,
            Self::Jpeg => image::ImageFormat::Jpeg,
            Self::Tiff => image::ImageFormat::Tiff,
            Self::Bmp => image::ImageFormat::Bmp,
            Self::WebP => image::ImageFormat::WebP,
        }
    }

    pub fn from_image_format(format: image::ImageFormat) -> Option<Self> {
        match format {
            image::ImageFormat::Png => Some(Self::Png),
            image::ImageFormat::Jpeg => Some(Self::Jpeg),
            image::ImageFormat::Tiff => Some(Self::Tiff),
            image::ImageFormat::Bmp => Some(Self::Bmp),
            image::ImageFormat::WebP => Some(Self::WebP),
            _ => None,
        }
    }

    fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "image/png" | "image/x-png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(Self::Jpeg),
            "image/tiff" | "image/tif" => Some(Self::Tiff),
            "image/bmp" | "image/x-bmp" | "image/x-ms-bmp" => Some(Self::Bmp),
            "image/webp" => Some(Self::WebP),
            _ => None,
        }
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Tiff => "tiff",
            Self::Bmp => "bmp",
            Self::WebP => "webp",
        };
        f.write_str(name)
    }
}

/// Container format of an upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "format")]
pub enum UploadKind {
    Pdf,
    Image(ImageKind),
}

impl UploadKind {
    /// Detect format from MIME type, ignoring parameters and case
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            "application/pdf" | "application/x-pdf" => Some(Self::Pdf),
            other => ImageKind::from_mime(other).map(Self::Image),
        }
    }

    /// Detect format from file extension
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        mime_guess::from_path(file_name)
            .iter()
            .find_map(|mime| Self::from_mime(mime.essence_str()))
    }

    /// Detect format from magic bytes
    pub fn from_magic_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 4 {
            return None;
        }

        // PDF magic: %PDF-, tolerated after a short preamble
        let window = &bytes[..bytes.len().min(PDF_HEADER_WINDOW)];
        if window.windows(5).any(|w| w == b"%PDF-") {
            return Some(Self::Pdf);
        }

        image::guess_format(bytes)
            .ok()
            .and_then(ImageKind::from_image_format)
            .map(Self::Image)
    }

    /// Decide the kind of an upload.
    ///
    /// A specific declared content type wins; a missing or generic one falls back
    /// to the file extension, then to sniffing. The bytes must agree with the
    /// resolved kind.
    pub fn resolve(
        content_type: Option<&str>,
        file_name: Option<&str>,
        data: &[u8],
    ) -> Result<Self, RotationError> {
        let declared = content_type
            .map(str::trim)
            .filter(|ct| !ct.is_empty() && !is_generic_content_type(ct));

        let kind = match declared {
            Some(ct) => {
                Self::from_mime(ct).ok_or_else(|| RotationError::UnsupportedMediaType(ct.to_string()))?
            }
            None => file_name
                .and_then(Self::from_file_name)
                .or_else(|| Self::from_magic_bytes(data))
                .ok_or_else(|| {
                    RotationError::UnsupportedMediaType(
                        content_type.unwrap_or("unknown").to_string(),
                    )
                })?,
        };

        match Self::from_magic_bytes(data) {
            Some(sniffed) if sniffed == kind => Ok(kind),
            _ => Err(RotationError::InvalidDocument(format!(
                "content is not a valid {} file",
                kind
            ))),
        }
    }

    /// Canonical MIME type for responses
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Image(image) => image.content_type(),
        }
    }

    pub fn is_pdf(&self) -> bool {
        matches!(self, Self::Pdf)
    }
}

impl fmt::Display for UploadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pdf => f.write_str("pdf"),
            Self::Image(image) => write!(f, "{}", image),
        }
    }
}

fn is_generic_content_type(content_type: &str) -> bool {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    essence.eq_ignore_ascii_case("application/octet-stream")
        || essence.eq_ignore_ascii_case("binary/octet-stream")
}

/// A validated upload, alive for a single request
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: Option<String>,
    pub kind: UploadKind,
    pub data: Bytes,
}

impl Upload {
    /// File name for the response, without any path components
    pub fn display_name(&self) -> String {
        let fallback = match self.kind {
            UploadKind::Pdf => "document.pdf".to_string(),
            UploadKind::Image(image) => format!("image.{}", image),
        };

        self.file_name
            .as_deref()
            .and_then(|name| name.rsplit(['/', '\\']).next())
            .map(|name| {
                name.chars()
                    .map(|c| if c.is_ascii_graphic() || c == ' ' { c } else { '_' })
                    .filter(|c| *c != '"')
                    .collect::<String>()
            })
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    const PDF_MAGIC: &[u8] = b"%PDF-1.7\n%\xe2\xe3\xcf\xd3\n";

    #[test]
    fn test_from_mime_ignores_parameters_and_case() {
        assert_eq!(UploadKind::from_mime("application/pdf"), Some(UploadKind::Pdf));
        assert_eq!(
            UploadKind::from_mime("Image/JPEG; q=0.9"),
            Some(UploadKind::Image(ImageKind::Jpeg))
        );
        assert_eq!(
            UploadKind::from_mime("image/jpg"),
            Some(UploadKind::Image(ImageKind::Jpeg))
        );
        assert_eq!(UploadKind::from_mime("text/plain"), None);
        assert_eq!(UploadKind::from_mime("image/gif"), None);
    }

    #[test]
    fn test_from_file_name() {
        assert_eq!(UploadKind::from_file_name("scan.PDF"), Some(UploadKind::Pdf));
        assert_eq!(
            UploadKind::from_file_name("photo.tif"),
            Some(UploadKind::Image(ImageKind::Tiff))
        );
        assert_eq!(UploadKind::from_file_name("notes.txt"), None);
    }

    #[test]
    fn test_magic_bytes() {
        assert_eq!(UploadKind::from_magic_bytes(PDF_MAGIC), Some(UploadKind::Pdf));
        assert_eq!(
            UploadKind::from_magic_bytes(PNG_MAGIC),
            Some(UploadKind::Image(ImageKind::Png))
        );

        let mut preamble = b"garbage before header\n".to_vec();
        preamble.extend_from_slice(PDF_MAGIC);
        assert_eq!(UploadKind::from_magic_bytes(&preamble), Some(UploadKind::Pdf));

        assert_eq!(UploadKind::from_magic_bytes(b"%P"), None);
    }

    #[test]
    fn test_resolve_declared_type() {
        let kind = UploadKind::resolve(Some("application/pdf"), Some("x.bin"), PDF_MAGIC).unwrap();
        assert_eq!(kind, UploadKind::Pdf);
    }

    #[test]
    fn test_resolve_generic_type_uses_file_name() {
        let kind =
            UploadKind::resolve(Some("application/octet-stream"), Some("scan.png"), PNG_MAGIC)
                .unwrap();
        assert_eq!(kind, UploadKind::Image(ImageKind::Png));
    }

    #[test]
    fn test_resolve_sniffs_when_nothing_declared() {
        let kind = UploadKind::resolve(None, None, PDF_MAGIC).unwrap();
        assert_eq!(kind, UploadKind::Pdf);
    }

    #[test]
    fn test_resolve_rejects_unsupported_type() {
        let err = UploadKind::resolve(Some("text/plain"), Some("a.txt"), b"hello").unwrap_err();
        assert!(matches!(err, RotationError::UnsupportedMediaType(_)));
    }

    #[test]
    fn test_resolve_rejects_mismatched_content() {
        let err = UploadKind::resolve(Some("image/png"), None, PDF_MAGIC).unwrap_err();
        assert!(matches!(err, RotationError::InvalidDocument(_)));
    }

    #[test]
    fn test_display_name_strips_paths() {
        let upload = Upload {
            file_name: Some("C:\\scans\\inv\"oice.pdf".to_string()),
            kind: UploadKind::Pdf,
            data: Bytes::new(),
        };
        assert_eq!(upload.display_name(), "invoice.pdf");

        let unnamed = Upload {
            file_name: None,
            kind: UploadKind::Image(ImageKind::Png),
            data: Bytes::new(),
        };
        assert_eq!(unnamed.display_name(), "image.png");
    }
}
