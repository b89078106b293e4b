//! Raster image rotation
//!
//! Uses the `image` crate to decode uploads, turn them by a cardinal angle and
//! write them back in the format they arrived in.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, DynamicImage, ImageFormat};

use super::FormatError;
use crate::document::ImageKind;
use crate::ocr::Rotation;

/// Decode an upload in its declared format
pub fn decode(kind: ImageKind, data: &[u8]) -> Result<DynamicImage, FormatError> {
    image::load_from_memory_with_format(data, kind.image_format())
        .map_err(|e| FormatError::Decode(format!("{} image: {}", kind, e)))
}

/// Quality for re-encoded JPEGs; scans go through here on every correction
pub const JPEG_QUALITY: u8 = 95;

/// Encode an image in the given format
pub fn encode(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>, FormatError> {
    let mut output = Vec::new();

    let result = match format {
        ImageFormat::Jpeg => encode_jpeg(image, &mut output),
        _ => image.write_to(&mut Cursor::new(&mut output), format),
    };
    result.map_err(|e| FormatError::Encode(format!("{:?}: {}", format, e)))?;

    Ok(output)
}

fn encode_jpeg(image: &DynamicImage, output: &mut Vec<u8>) -> image::ImageResult<()> {
    let encoder = JpegEncoder::new_with_quality(output, JPEG_QUALITY);
    match image.color() {
        ColorType::L8 | ColorType::Rgb8 => image.write_with_encoder(encoder),
        // JPEG has no alpha or 16-bit channels
        _ => DynamicImage::ImageRgb8(image.to_rgb8()).write_with_encoder(encoder),
    }
}

/// PNG rendering of an upload for the orientation detector.
///
/// PNG uploads are passed through as-is.
pub fn detection_png(kind: ImageKind, data: &[u8]) -> Result<Vec<u8>, FormatError> {
    if kind == ImageKind::Png {
        return Ok(data.to_vec());
    }
    let image = decode(kind, data)?;
    encode(&image, ImageFormat::Png)
}

/// Turn a decoded image clockwise
pub fn rotate(image: &DynamicImage, rotation: Rotation) -> DynamicImage {
    match rotation {
        Rotation::Upright => image.clone(),
        Rotation::Cw90 => image.rotate90(),
        Rotation::Cw180 => image.rotate180(),
        Rotation::Cw270 => image.rotate270(),
    }
}

/// Rotate encoded image bytes, keeping the container format.
///
/// `Rotation::Upright` returns the input untouched, without a re-encode.
pub fn rotate_encoded(
    kind: ImageKind,
    data: &[u8],
    rotation: Rotation,
) -> Result<Vec<u8>, FormatError> {
    if rotation.is_upright() {
        return Ok(data.to_vec());
    }

    let image = decode(kind, data)?;
    let rotated = rotate(&image, rotation);

    tracing::debug!(
        format = %kind,
        rotation = %rotation,
        width = rotated.width(),
        height = rotated.height(),
        "Rotated image"
    );

    encode(&rotated, kind.image_format())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    /// 40x20 white canvas with a black block in the top-left corner
    fn marked_image() -> DynamicImage {
        let mut img = RgbImage::from_pixel(40, 20, Rgb([255, 255, 255]));
        for x in 0..4 {
            for y in 0..4 {
                img.put_pixel(x, y, Rgb([0, 0, 0]));
            }
        }
        DynamicImage::ImageRgb8(img)
    }

    fn is_black(image: &DynamicImage, x: u32, y: u32) -> bool {
        image.to_rgb8().get_pixel(x, y).0 == [0, 0, 0]
    }

    #[test]
    fn test_rotation_is_clockwise() {
        let img = marked_image();

        let cw90 = rotate(&img, Rotation::Cw90);
        assert_eq!((cw90.width(), cw90.height()), (20, 40));
        // Top-left corner moves to top-right under a clockwise quarter turn
        assert!(is_black(&cw90, 19, 0));

        let cw180 = rotate(&img, Rotation::Cw180);
        assert!(is_black(&cw180, 39, 19));

        let cw270 = rotate(&img, Rotation::Cw270);
        assert_eq!((cw270.width(), cw270.height()), (20, 40));
        assert!(is_black(&cw270, 0, 39));
    }

    #[test]
    fn test_rotate_encoded_keeps_format() {
        let png = encode(&marked_image(), ImageFormat::Png).unwrap();
        let rotated = rotate_encoded(ImageKind::Png, &png, Rotation::Cw90).unwrap();
        assert_eq!(image::guess_format(&rotated).unwrap(), ImageFormat::Png);

        let jpeg = encode(&marked_image(), ImageFormat::Jpeg).unwrap();
        let rotated = rotate_encoded(ImageKind::Jpeg, &jpeg, Rotation::Cw180).unwrap();
        assert_eq!(image::guess_format(&rotated).unwrap(), ImageFormat::Jpeg);

        let bmp = encode(&marked_image(), ImageFormat::Bmp).unwrap();
        let rotated = rotate_encoded(ImageKind::Bmp, &bmp, Rotation::Cw270).unwrap();
        let decoded = decode(ImageKind::Bmp, &rotated).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (20, 40));
    }

    #[test]
    fn test_jpeg_is_written_above_default_quality() {
        let mut img = RgbImage::new(64, 64);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            *pixel = Rgb([(x * 4) as u8, (y * 4) as u8, ((x ^ y) * 4) as u8]);
        }
        let img = DynamicImage::ImageRgb8(img);

        let mut default_quality = Vec::new();
        img.write_to(&mut Cursor::new(&mut default_quality), ImageFormat::Jpeg)
            .unwrap();

        let ours = encode(&img, ImageFormat::Jpeg).unwrap();
        assert_eq!(image::guess_format(&ours).unwrap(), ImageFormat::Jpeg);
        assert!(ours.len() > default_quality.len());
    }

    #[test]
    fn test_no_rotation_is_byte_identical() {
        let png = encode(&marked_image(), ImageFormat::Png).unwrap();
        let out = rotate_encoded(ImageKind::Png, &png, Rotation::Upright).unwrap();
        assert_eq!(out, png);
    }

    #[test]
    fn test_full_turn_restores_pixels() {
        let png = encode(&marked_image(), ImageFormat::Png).unwrap();
        let once = rotate_encoded(ImageKind::Png, &png, Rotation::Cw90).unwrap();
        let back = rotate_encoded(ImageKind::Png, &once, Rotation::Cw270).unwrap();
        let restored = decode(ImageKind::Png, &back).unwrap();
        assert_eq!(restored.to_rgb8(), marked_image().to_rgb8());
    }

    #[test]
    fn test_detection_png_converts_other_formats() {
        let bmp = encode(&marked_image(), ImageFormat::Bmp).unwrap();
        let png = detection_png(ImageKind::Bmp, &bmp).unwrap();
        assert_eq!(image::guess_format(&png).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn test_corrupt_image_is_decode_error() {
        let result = rotate_encoded(ImageKind::Png, b"\x89PNG\r\n\x1a\ngarbage", Rotation::Cw90);
        assert!(matches!(result, Err(FormatError::Decode(_))));
    }
}
