//! Parameter types for the enhancement transforms.
//!
//! These structs describe *how strongly* each correction is applied. They are
//! filled from the `[exposure]`, `[color_balance]`, `[shadows]` and `[details]`
//! config sections and captured by the registry when it is built, so a
//! transform's behaviour is fixed for the lifetime of the registry.
//!
//! ## Types
//!
//! - [`ExposureParams`]: gain and offset of the affine intensity remap.
//! - [`ClaheParams`]: clip limit and tile grid for adaptive equalisation.
//! - [`ShadowParams`]: dilation kernel and median window for background estimation.
//! - [`DetailParams`]: spatial/range sigmas of the edge-preserving filter.
//! - [`TransformParams`]: all of the above, one per parameterised transform.

/// Affine remap `|alpha * v + beta|`, saturated to 0–255.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExposureParams {
    pub alpha: f32,
    pub beta: f32,
}

impl Default for ExposureParams {
    fn default() -> Self {
        Self {
            alpha: 1.2,
            beta: 20.0,
        }
    }
}

/// Contrast-limited adaptive histogram equalisation settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClaheParams {
    /// Histogram bins are clipped at `clip_limit * tile_area / 256`.
    pub clip_limit: f32,
    /// Tile grid as (columns, rows).
    pub tile_grid: (u32, u32),
}

impl Default for ClaheParams {
    fn default() -> Self {
        Self {
            clip_limit: 3.0,
            tile_grid: (8, 8),
        }
    }
}

/// Shadow removal settings. Both sizes are odd window widths in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShadowParams {
    pub dilate_size: u32,
    pub median_size: u32,
}

impl Default for ShadowParams {
    fn default() -> Self {
        Self {
            dilate_size: 7,
            median_size: 21,
        }
    }
}

/// Detail enhancement settings.
///
/// - `sigma_s`: spatial extent of the smoothing, in pixels
/// - `sigma_r`: range sensitivity on 0–1 normalised intensity (smaller keeps more edges)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetailParams {
    pub sigma_s: f32,
    pub sigma_r: f32,
}

impl Default for DetailParams {
    fn default() -> Self {
        Self {
            sigma_s: 10.0,
            sigma_r: 0.15,
        }
    }
}

/// Parameters for every tunable transform.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TransformParams {
    pub exposure: ExposureParams,
    pub clahe: ClaheParams,
    pub shadows: ShadowParams,
    pub details: DetailParams,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exposure_defaults() {
        let p = ExposureParams::default();
        assert_eq!(p.alpha, 1.2);
        assert_eq!(p.beta, 20.0);
    }

    #[test]
    fn clahe_defaults() {
        let p = ClaheParams::default();
        assert_eq!(p.clip_limit, 3.0);
        assert_eq!(p.tile_grid, (8, 8));
    }

    #[test]
    fn shadow_windows_are_odd() {
        let p = ShadowParams::default();
        assert_eq!(p.dilate_size % 2, 1);
        assert_eq!(p.median_size % 2, 1);
    }
}
