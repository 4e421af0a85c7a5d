//! Pure Rust codec backend.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (PNG, JPEG, BMP) | `image::ImageReader` (format from extension) |
//! | Encode | `DynamicImage::write_to` with the format implied by the extension |
//!
//! Decoded images are always normalised to 8-bit RGB by
//! [`ImageBuffer::from_dynamic`]. Gray buffers are still written as
//! single-channel files.

use super::backend::{CodecError, ImageBackend};
use super::buffer::ImageBuffer;
use image::{ImageFormat, ImageReader};
use std::io::Cursor;
use std::path::Path;

/// Extensions the engine reads and writes, with the format each maps to.
const FORMATS: &[(&str, ImageFormat)] = &[
    ("png", ImageFormat::Png),
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("bmp", ImageFormat::Bmp),
];

/// Returns the file extensions (lowercase, no dot) the backend handles.
pub fn supported_extensions() -> impl Iterator<Item = &'static str> {
    FORMATS.iter().map(|(ext, _)| *ext)
}

/// Whether `path` has an extension the backend can decode.
pub fn is_supported_image(path: &Path) -> bool {
    format_for(path).is_some()
}

fn format_for(path: &Path) -> Option<ImageFormat> {
    let ext = path.extension()?.to_str()?;
    FORMATS
        .iter()
        .find(|(candidate, _)| candidate.eq_ignore_ascii_case(ext))
        .map(|(_, fmt)| *fmt)
}

/// Codec backend using the `image` crate.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageBackend for RustBackend {
    fn decode(&self, path: &Path) -> Result<ImageBuffer, CodecError> {
        let img = ImageReader::open(path)?
            .decode()
            .map_err(|e| CodecError::Decode {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        Ok(ImageBuffer::from_dynamic(img))
    }

    fn encode(&self, buffer: &ImageBuffer, path: &Path) -> Result<(), CodecError> {
        let format = format_for(path).ok_or_else(|| {
            CodecError::UnsupportedFormat(
                path.extension()
                    .map(|e| e.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            )
        })?;

        let mut bytes = Cursor::new(Vec::new());
        buffer
            .to_dynamic()
            .write_to(&mut bytes, format)
            .map_err(|e| CodecError::Encode {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        std::fs::write(path, bytes.into_inner())?;
        Ok(())
    }
}
