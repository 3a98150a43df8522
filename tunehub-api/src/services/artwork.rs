//! Artwork normalisation
//!
//! Every accepted image is stored the same way: RGB, exactly 500x500,
//! JPEG quality 85. Aspect ratio and alpha are discarded.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::error::{ImageError, ImageFormatHint, UnsupportedError, UnsupportedErrorKind};
use image::{ImageFormat, ImageReader, ImageResult};
use std::io::Cursor;

pub const ARTWORK_SIZE: u32 = 500;
pub const JPEG_QUALITY: u8 = 85;

/// Content formats accepted regardless of the uploaded file's extension
pub const ACCEPTED_FORMATS: &[ImageFormat] = &[
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::Gif,
    ImageFormat::WebP,
];

/// Decode a PNG, JPEG, GIF or WebP image and re-encode it as the stored JPEG
pub fn normalize_artwork(data: &[u8]) -> ImageResult<Vec<u8>> {
    let reader = ImageReader::new(Cursor::new(data)).with_guessed_format()?;
    match reader.format() {
        Some(format) if ACCEPTED_FORMATS.contains(&format) => {}
        other => {
            let hint = other.map_or(ImageFormatHint::Unknown, ImageFormatHint::Exact);
            return Err(ImageError::Unsupported(
                UnsupportedError::from_format_and_kind(
                    hint.clone(),
                    UnsupportedErrorKind::Format(hint),
                ),
            ));
        }
    }
    let img = reader.decode()?;

    let rgb = img
        .resize_exact(ARTWORK_SIZE, ARTWORK_SIZE, FilterType::Lanczos3)
        .to_rgb8();

    let mut jpeg_buf = Vec::new();
    let mut enc = JpegEncoder::new_with_quality(&mut jpeg_buf, JPEG_QUALITY);
    enc.encode_image(&rgb)?;

    Ok(jpeg_buf)
}
