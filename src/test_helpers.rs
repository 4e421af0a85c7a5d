//! Shared test utilities for the retouch test suite.
//!
//! Synthetic buffers with predictable content, plus helpers that put real
//! encoded files on disk for tests that go through [`RustBackend`].
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = tempfile::TempDir::new().unwrap();
//! write_image(tmp.path(), "a.png", &gradient_rgb(16, 16));
//! write_corrupt(tmp.path(), "broken.jpg");
//! ```
//!
//! [`RustBackend`]: crate::imaging::RustBackend

use std::path::{Path, PathBuf};

use crate::imaging::{ImageBackend, ImageBuffer, RustBackend};

// =========================================================================
// Synthetic buffers
// =========================================================================

/// RGB buffer whose channels ramp independently along x, y and x+y.
///
/// Every pixel differs from its neighbours, so any transform that touches
/// pixels produces a visible change.
pub fn gradient_rgb(width: u32, height: u32) -> ImageBuffer {
    let mut data = Vec::with_capacity(width as usize * height as usize * 3);
    for y in 0..height {
        for x in 0..width {
            data.push(ramp(x, width));
            data.push(ramp(y, height));
            data.push(ramp(x + y, width + height));
        }
    }
    ImageBuffer::from_raw(width, height, 3, data).unwrap()
}

/// Grayscale buffer ramping along x and y.
pub fn gradient_gray(width: u32, height: u32) -> ImageBuffer {
    let mut data = Vec::with_capacity(width as usize * height as usize);
    for y in 0..height {
        for x in 0..width {
            data.push(ramp(x + y, width + height));
        }
    }
    ImageBuffer::from_raw(width, height, 1, data).unwrap()
}

/// RGB buffer filled with a single colour.
pub fn solid_rgb(width: u32, height: u32, rgb: [u8; 3]) -> ImageBuffer {
    let data = rgb
        .iter()
        .copied()
        .cycle()
        .take(width as usize * height as usize * 3)
        .collect();
    ImageBuffer::from_raw(width, height, 3, data).unwrap()
}

fn ramp(pos: u32, span: u32) -> u8 {
    if span <= 1 {
        return 0;
    }
    ((pos as u64 * 255) / (span as u64 - 1)).min(255) as u8
}

// =========================================================================
// Files on disk
// =========================================================================

/// Encode `buffer` into `dir/name` with the real backend. Returns the path.
pub fn write_image(dir: &Path, name: &str, buffer: &ImageBuffer) -> PathBuf {
    let path = dir.join(name);
    RustBackend::new().encode(buffer, &path).unwrap();
    path
}

/// Write bytes that carry an image extension but are not a decodable image.
pub fn write_corrupt(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"definitely not an image").unwrap();
    path
}

/// Names of regular files in `dir`, sorted.
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap())
        .filter(|e| e.path().is_file())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
