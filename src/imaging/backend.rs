//! Codec backend trait and shared error type.
//!
//! The [`ImageBackend`] trait defines the two operations the engine needs from
//! the outside world: decode a file into an [`ImageBuffer`] and encode a buffer
//! back to disk. The session and the batch replayer only ever talk to this
//! trait, so tests can substitute a mock that records what was asked of it.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image` crate.

use super::buffer::ImageBuffer;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode {path}: {message}")]
    Decode { path: PathBuf, message: String },
    #[error("Failed to encode {path}: {message}")]
    Encode { path: PathBuf, message: String },
    #[error("Unsupported output format: {0:?}")]
    UnsupportedFormat(String),
}

/// Trait for image codec backends.
///
/// `Sync` so one backend can be shared across rayon workers during a batch.
pub trait ImageBackend: Sync {
    /// Read and decode the file at `path`.
    fn decode(&self, path: &Path) -> Result<ImageBuffer, CodecError>;

    /// Encode `buffer` to `path`, choosing the format from the extension.
    fn encode(&self, buffer: &ImageBuffer, path: &Path) -> Result<(), CodecError>;
}
