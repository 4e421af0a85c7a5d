//! Engine configuration module.
//!
//! Handles loading and validating an optional `retouch.toml`. Every value has
//! a default, so the file only needs the keys a user wants to change, and the
//! engine runs without any file at all. The engine never writes configuration.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [exposure]
//! alpha = 1.2               # Gain applied to every sample
//! beta = 20.0               # Offset added after the gain
//!
//! [color_balance]
//! clip_limit = 3.0          # CLAHE contrast limit
//! tile_grid = [8, 8]        # CLAHE tiles as [columns, rows]
//!
//! [shadows]
//! dilate_size = 7           # Dilation kernel side (odd, <= 511)
//! median_size = 21          # Median blur kernel side (odd, >= 3)
//!
//! [details]
//! sigma_s = 10.0            # Spatial extent of the smoothing
//! sigma_r = 0.15            # Edge sensitivity (0-1]
//!
//! [batch]
//! output_prefix = "processed_"  # Prepended to batch output file names
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::batch::BatchSettings;
use crate::imaging::{ClaheParams, DetailParams, ExposureParams, ShadowParams, TransformParams};
use crate::naming::DEFAULT_OUTPUT_PREFIX;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Engine configuration loaded from `retouch.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Gain and offset for `adjust-exposure`.
    pub exposure: ExposureConfig,
    /// CLAHE settings for `color-balance`.
    pub color_balance: ColorBalanceConfig,
    /// Kernel sizes for `remove-shadows`.
    pub shadows: ShadowsConfig,
    /// Smoothing settings for `enhance-details`.
    pub details: DetailsConfig,
    /// Output naming and parallelism for batch replay.
    pub batch: BatchConfig,
}

/// Largest dilation kernel side; the square mask radius must fit in a `u8`.
const MAX_DILATE_SIZE: u32 = 511;

impl EngineConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let shadows = &self.shadows;
        if shadows.dilate_size == 0 || shadows.dilate_size % 2 == 0 {
            return Err(ConfigError::Validation(
                "shadows.dilate_size must be an odd number >= 1".into(),
            ));
        }
        if shadows.dilate_size > MAX_DILATE_SIZE {
            return Err(ConfigError::Validation(format!(
                "shadows.dilate_size must be at most {MAX_DILATE_SIZE}"
            )));
        }
        if shadows.median_size < 3 || shadows.median_size % 2 == 0 {
            return Err(ConfigError::Validation(
                "shadows.median_size must be an odd number >= 3".into(),
            ));
        }
        if !is_positive(self.color_balance.clip_limit) {
            return Err(ConfigError::Validation(
                "color_balance.clip_limit must be positive".into(),
            ));
        }
        if self.color_balance.tile_grid.contains(&0) {
            return Err(ConfigError::Validation(
                "color_balance.tile_grid values must be non-zero".into(),
            ));
        }
        if !is_positive(self.details.sigma_s) {
            return Err(ConfigError::Validation(
                "details.sigma_s must be positive".into(),
            ));
        }
        if !is_positive(self.details.sigma_r) || self.details.sigma_r > 1.0 {
            return Err(ConfigError::Validation(
                "details.sigma_r must be in (0, 1]".into(),
            ));
        }
        if !self.exposure.alpha.is_finite() || !self.exposure.beta.is_finite() {
            return Err(ConfigError::Validation(
                "exposure.alpha and exposure.beta must be finite".into(),
            ));
        }
        let prefix = &self.batch.output_prefix;
        if prefix.is_empty() {
            return Err(ConfigError::Validation(
                "batch.output_prefix must not be empty".into(),
            ));
        }
        if prefix.contains(['/', '\\']) {
            return Err(ConfigError::Validation(
                "batch.output_prefix must not contain path separators".into(),
            ));
        }
        Ok(())
    }

    /// Parameters for building a [`TransformRegistry`](crate::transform::TransformRegistry).
    pub fn transform_params(&self) -> TransformParams {
        TransformParams {
            exposure: ExposureParams {
                alpha: self.exposure.alpha,
                beta: self.exposure.beta,
            },
            clahe: ClaheParams {
                clip_limit: self.color_balance.clip_limit,
                tile_grid: (
                    self.color_balance.tile_grid[0],
                    self.color_balance.tile_grid[1],
                ),
            },
            shadows: ShadowParams {
                dilate_size: self.shadows.dilate_size,
                median_size: self.shadows.median_size,
            },
            details: DetailParams {
                sigma_s: self.details.sigma_s,
                sigma_r: self.details.sigma_r,
            },
        }
    }

    pub fn batch_settings(&self) -> BatchSettings {
        BatchSettings {
            output_prefix: self.batch.output_prefix.clone(),
        }
    }
}

fn is_positive(v: f32) -> bool {
    v.is_finite() && v > 0.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExposureConfig {
    pub alpha: f32,
    pub beta: f32,
}

impl Default for ExposureConfig {
    fn default() -> Self {
        let params = ExposureParams::default();
        Self {
            alpha: params.alpha,
            beta: params.beta,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColorBalanceConfig {
    pub clip_limit: f32,
    /// Tile grid as `[columns, rows]`.
    pub tile_grid: [u32; 2],
}

impl Default for ColorBalanceConfig {
    fn default() -> Self {
        let params = ClaheParams::default();
        Self {
            clip_limit: params.clip_limit,
            tile_grid: [params.tile_grid.0, params.tile_grid.1],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShadowsConfig {
    pub dilate_size: u32,
    pub median_size: u32,
}

impl Default for ShadowsConfig {
    fn default() -> Self {
        let params = ShadowParams::default();
        Self {
            dilate_size: params.dilate_size,
            median_size: params.median_size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetailsConfig {
    pub sigma_s: f32,
    pub sigma_r: f32,
}

impl Default for DetailsConfig {
    fn default() -> Self {
        let params = DetailParams::default();
        Self {
            sigma_s: params.sigma_s,
            sigma_r: params.sigma_r,
        }
    }
}

/// Batch replay settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchConfig {
    /// Prepended to every output file name. Files already carrying it are
    /// skipped as prior outputs.
    pub output_prefix: String,
    /// Maximum number of parallel batch workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            output_prefix: DEFAULT_OUTPUT_PREFIX.to_string(),
            max_processes: None,
        }
    }
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &BatchConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading and validation
// =============================================================================

/// Parse and validate config from a TOML string.
pub fn parse_config(content: &str) -> Result<EngineConfig, ConfigError> {
    let config: EngineConfig = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, or stock defaults.
///
/// `None` or a path that does not exist both yield the defaults. A file that
/// exists but has invalid TOML, unknown keys or out-of-range values is an error.
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig, ConfigError> {
    let Some(path) = path.filter(|p| p.exists()) else {
        debug!("no config file, using defaults");
        return Ok(EngineConfig::default());
    };
    debug!(path = %path.display(), "loading config");
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Returns a fully-commented stock `retouch.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Retouch Configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Pass this file with `retouch --config retouch.toml ...`.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# adjust-exposure: out = |alpha * in + beta|, saturated to 0-255
# ---------------------------------------------------------------------------
[exposure]
alpha = 1.2
beta = 20.0

# ---------------------------------------------------------------------------
# color-balance: contrast-limited adaptive equalisation of lightness
# ---------------------------------------------------------------------------
[color_balance]
# Higher values allow more local contrast. Must be positive.
clip_limit = 3.0

# Number of tiles as [columns, rows]. Both must be non-zero.
tile_grid = [8, 8]

# ---------------------------------------------------------------------------
# remove-shadows: background estimate from dilation + median blur
# ---------------------------------------------------------------------------
[shadows]
# Dilation kernel side in pixels. Odd, between 1 and 511.
dilate_size = 7

# Median blur kernel side in pixels. Odd, >= 3.
median_size = 21

# ---------------------------------------------------------------------------
# enhance-details: edge-preserving smoothing, then detail boost
# ---------------------------------------------------------------------------
[details]
# Spatial extent of the smoothing. Must be positive.
sigma_s = 10.0

# Edge sensitivity. Smaller keeps more edges out of the smoothing. (0, 1].
sigma_r = 0.15

# ---------------------------------------------------------------------------
# Batch replay
# ---------------------------------------------------------------------------
[batch]
# Prepended to each output file name. Files that already start with it are
# treated as earlier outputs and skipped. No path separators.
output_prefix = "processed_"

# Maximum parallel workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_matches_operation_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.transform_params(), TransformParams::default());
        assert_eq!(config.batch.output_prefix, "processed_");
        assert_eq!(config.batch.max_processes, None);
    }

    #[test]
    fn stock_config_parses_to_defaults() {
        let config = parse_config(stock_config_toml()).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn parse_partial_config() {
        let config = parse_config(
            r#"
[exposure]
alpha = 1.5
"#,
        )
        .unwrap();
        assert_eq!(config.exposure.alpha, 1.5);
        assert_eq!(config.exposure.beta, 20.0);
        assert_eq!(config.shadows, ShadowsConfig::default());
    }

    #[test]
    fn parse_tile_grid_and_prefix() {
        let config = parse_config(
            r#"
[color_balance]
tile_grid = [4, 2]

[batch]
output_prefix = "fixed-"
max_processes = 2
"#,
        )
        .unwrap();
        assert_eq!(config.transform_params().clahe.tile_grid, (4, 2));
        assert_eq!(config.batch_settings().output_prefix, "fixed-");
        assert_eq!(config.batch.max_processes, Some(2));
    }

    // =========================================================================
    // Loading
    // =========================================================================

    #[test]
    fn load_config_without_path_returns_default() {
        assert_eq!(load_config(None).unwrap(), EngineConfig::default());
    }

    #[test]
    fn load_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(Some(&tmp.path().join("retouch.toml"))).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("retouch.toml");
        fs::write(
            &path,
            r#"
[details]
sigma_r = 0.4
"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.details.sigma_r, 0.4);
        assert_eq!(config.details.sigma_s, 10.0);
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("retouch.toml");
        fs::write(&path, "[exposure\nalpha = ").unwrap();

        assert!(matches!(
            load_config(Some(&path)),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("retouch.toml");
        fs::write(
            &path,
            r#"
[shadows]
median_size = 20
"#,
        )
        .unwrap();

        assert!(matches!(
            load_config(Some(&path)),
            Err(ConfigError::Validation(_))
        ));
    }

    // =========================================================================
    // Unknown key rejection
    // =========================================================================

    #[test]
    fn unknown_key_rejected() {
        let err = parse_config(
            r#"
[exposure]
alfa = 1.0
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown field"));
    }

    #[test]
    fn unknown_section_rejected() {
        assert!(parse_config("[sharpen]\namount = 1\n").is_err());
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn validate_default_config_passes() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_kernel_sizes_must_be_odd() {
        let mut config = EngineConfig::default();
        config.shadows.dilate_size = 4;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.shadows.dilate_size = 0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.shadows.dilate_size = 1;
        config.shadows.median_size = 3;
        assert!(config.validate().is_ok());

        let mut config = EngineConfig::default();
        config.shadows.dilate_size = 511;
        assert!(config.validate().is_ok());

        let mut config = EngineConfig::default();
        config.shadows.dilate_size = 513;
        assert!(config.validate().is_err());

        config.shadows.median_size = 1;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("median_size"));
    }

    #[test]
    fn validate_clahe_values() {
        let mut config = EngineConfig::default();
        config.color_balance.clip_limit = 0.0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.color_balance.tile_grid = [8, 0];
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_sigma_r_boundary() {
        let mut config = EngineConfig::default();
        config.details.sigma_r = 1.0;
        assert!(config.validate().is_ok());

        config.details.sigma_r = 1.01;
        assert!(config.validate().is_err());

        config.details.sigma_r = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_sigma_s_positive() {
        let mut config = EngineConfig::default();
        config.details.sigma_s = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_output_prefix() {
        let mut config = EngineConfig::default();
        config.batch.output_prefix = String::new();
        assert!(config.validate().is_err());

        config.batch.output_prefix = "out/".into();
        assert!(config.validate().is_err());

        config.batch.output_prefix = "out\\".into();
        assert!(config.validate().is_err());

        config.batch.output_prefix = "out_".into();
        assert!(config.validate().is_ok());
    }

    // =========================================================================
    // Thread count
    // =========================================================================

    fn cores() -> usize {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }

    #[test]
    fn effective_threads_auto() {
        assert_eq!(effective_threads(&BatchConfig::default()), cores());
    }

    #[test]
    fn effective_threads_clamped_to_cores() {
        let config = BatchConfig {
            max_processes: Some(99999),
            ..BatchConfig::default()
        };
        assert_eq!(effective_threads(&config), cores());
    }

    #[test]
    fn effective_threads_user_constrains_down() {
        let config = BatchConfig {
            max_processes: Some(1),
            ..BatchConfig::default()
        };
        assert_eq!(effective_threads(&config), 1);
    }

    #[test]
    fn effective_threads_zero_means_one() {
        let config = BatchConfig {
            max_processes: Some(0),
            ..BatchConfig::default()
        };
        assert_eq!(effective_threads(&config), 1);
    }
}
