//! In-memory raster type shared by every stage of the engine.
//!
//! An [`ImageBuffer`] is a plain interleaved 8-bit pixel grid with either one
//! channel (grayscale) or three (RGB). It carries no metadata beyond its
//! shape. Transforms never mutate a buffer they were handed; they build a new
//! one, so the session's "current" and "original" slots stay independent.

use image::{DynamicImage, GrayImage, RgbImage};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum BufferError {
    #[error("Unsupported channel count: {0} (expected 1 or 3)")]
    ChannelCount(u8),
    #[error("Pixel data length mismatch: expected {expected} bytes, got {actual}")]
    DataLength { expected: usize, actual: usize },
}

/// Channel layout of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Channels {
    Gray,
    Rgb,
}

impl Channels {
    pub fn count(self) -> u8 {
        match self {
            Channels::Gray => 1,
            Channels::Rgb => 3,
        }
    }

    pub fn from_count(count: u8) -> Result<Self, BufferError> {
        match count {
            1 => Ok(Channels::Gray),
            3 => Ok(Channels::Rgb),
            other => Err(BufferError::ChannelCount(other)),
        }
    }
}

/// Decoded raster: width, height, channel layout and interleaved pixel data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBuffer {
    width: u32,
    height: u32,
    channels: Channels,
    data: Vec<u8>,
}

impl ImageBuffer {
    /// Build a buffer from raw interleaved bytes, validating the length.
    pub fn from_raw(
        width: u32,
        height: u32,
        channels: u8,
        data: Vec<u8>,
    ) -> Result<Self, BufferError> {
        let channels = Channels::from_count(channels)?;
        let expected = width as usize * height as usize * channels.count() as usize;
        if data.len() != expected {
            return Err(BufferError::DataLength {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// Assemble a buffer whose length is already known to match its shape.
    pub(crate) fn from_parts(width: u32, height: u32, channels: Channels, data: Vec<u8>) -> Self {
        debug_assert_eq!(
            data.len(),
            width as usize * height as usize * channels.count() as usize
        );
        Self {
            width,
            height,
            channels,
            data,
        }
    }

    /// Same shape as `self`, new samples.
    pub(crate) fn with_data(&self, data: Vec<u8>) -> Self {
        Self::from_parts(self.width, self.height, self.channels, data)
    }

    pub fn from_gray(img: GrayImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            channels: Channels::Gray,
            data: img.into_raw(),
        }
    }

    pub fn from_rgb(img: RgbImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            channels: Channels::Rgb,
            data: img.into_raw(),
        }
    }

    /// Normalise any decoded image to 8-bit [`Channels::Rgb`].
    ///
    /// Grayscale files are expanded to three equal channels, so every file on
    /// disk starts a session or a batch replay as a color buffer. Alpha is
    /// dropped.
    pub fn from_dynamic(img: DynamicImage) -> Self {
        Self::from_rgb(img.into_rgb8())
    }

    pub fn to_dynamic(&self) -> DynamicImage {
        match self.channels {
            Channels::Gray => DynamicImage::ImageLuma8(self.to_gray_image()),
            Channels::Rgb => DynamicImage::ImageRgb8(self.to_rgb_image()),
        }
    }

    /// Copy out as an `image` grayscale image. Only meaningful for gray buffers.
    pub(crate) fn to_gray_image(&self) -> GrayImage {
        debug_assert_eq!(self.channels, Channels::Gray);
        GrayImage::from_fn(self.width, self.height, |x, y| {
            image::Luma([self.data[self.index(x, y)]])
        })
    }

    /// Copy out as an `image` RGB image. Only meaningful for RGB buffers.
    pub(crate) fn to_rgb_image(&self) -> RgbImage {
        debug_assert_eq!(self.channels, Channels::Rgb);
        RgbImage::from_fn(self.width, self.height, |x, y| {
            let i = self.index(x, y);
            image::Rgb([self.data[i], self.data[i + 1], self.data[i + 2]])
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> Channels {
        self.channels
    }

    pub fn is_gray(&self) -> bool {
        self.channels == Channels::Gray
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// Number of pixels (not samples).
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Byte offset of the first sample of pixel `(x, y)`.
    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * self.channels.count() as usize
    }
}
