//! Image processing in pure Rust, no system libraries.
//!
//! | Concern | Crate / function |
//! |---|---|
//! | **Decode / encode** | `image` crate (PNG, JPEG, BMP) |
//! | **Histogram equalisation** | `imageproc::contrast::equalize_histogram` |
//! | **Median blur** | `imageproc::filter::median_filter` |
//! | **L\*a\*b\*, CLAHE, dilation, domain transform** | in-crate ([`calculations`], [`operations`]) |
//!
//! The module is split into:
//! - **Buffer**: [`ImageBuffer`], the in-memory raster every stage passes around
//! - **Calculations**: pure pixel math (unit testable)
//! - **Parameters**: knobs for each tunable operation
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: the enhancement filters themselves

pub mod backend;
pub mod buffer;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{CodecError, ImageBackend};
pub use buffer::{BufferError, Channels, ImageBuffer};
pub use params::{ClaheParams, DetailParams, ExposureParams, ShadowParams, TransformParams};
pub use rust_backend::{RustBackend, is_supported_image, supported_extensions};
