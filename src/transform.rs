//! Named transforms and the registry that applies them.
//!
//! Every enhancement the engine offers is a [`TransformName`] backed by one
//! [`Transform`] implementation. A transform is a pure function from buffer to
//! buffer plus a shape check: if the check fails the registry reports
//! [`TransformOutcome::Skipped`] with a [`SkipReason`] instead of pretending
//! the buffer changed.
//!
//! The registry is built once from [`TransformParams`] and shared (`Arc`)
//! between the interactive [`ImageSession`](crate::session::ImageSession) and
//! the [`BatchReplayer`](crate::batch::BatchReplayer), so both paths run
//! exactly the same code with exactly the same parameters.
//!
//! | Name | Accepts | Effect |
//! |---|---|---|
//! | `grayscale` | color | RGB → BT.601 luma |
//! | `equalize-histogram` | gray | global histogram equalisation |
//! | `color-balance` | color | CLAHE on L\*a\*b\* lightness |
//! | `adjust-exposure` | any | `|alpha * v + beta|`, saturated |
//! | `enhance-contrast` | color | equalisation of L\*a\*b\* lightness |
//! | `remove-shadows` | color | dilate + median background, inverted difference |
//! | `enhance-details` | color | edge-preserving smoothing, detail boost |

use crate::imaging::operations;
use crate::imaging::{
    ClaheParams, DetailParams, ExposureParams, ImageBuffer, ShadowParams, TransformParams,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// The closed set of transforms the engine knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransformName {
    Grayscale,
    EqualizeHistogram,
    ColorBalance,
    AdjustExposure,
    EnhanceContrast,
    RemoveShadows,
    EnhanceDetails,
}

impl TransformName {
    pub const ALL: [TransformName; 7] = [
        TransformName::Grayscale,
        TransformName::EqualizeHistogram,
        TransformName::ColorBalance,
        TransformName::AdjustExposure,
        TransformName::EnhanceContrast,
        TransformName::RemoveShadows,
        TransformName::EnhanceDetails,
    ];

    /// Stable kebab-case identifier used on the command line and in reports.
    pub fn as_str(self) -> &'static str {
        match self {
            TransformName::Grayscale => "grayscale",
            TransformName::EqualizeHistogram => "equalize-histogram",
            TransformName::ColorBalance => "color-balance",
            TransformName::AdjustExposure => "adjust-exposure",
            TransformName::EnhanceContrast => "enhance-contrast",
            TransformName::RemoveShadows => "remove-shadows",
            TransformName::EnhanceDetails => "enhance-details",
        }
    }

    /// Position in [`TransformName::ALL`], used as the registry slot.
    fn slot(self) -> usize {
        self as usize
    }
}

impl fmt::Display for TransformName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown transform {0:?} (expected one of: {list})", list = known_names())]
pub struct UnknownTransform(pub String);

fn known_names() -> String {
    TransformName::ALL
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl FromStr for TransformName {
    type Err = UnknownTransform;

    /// Accepts the kebab-case identifier, case-insensitively, with `_` as an
    /// alternative separator.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        TransformName::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| UnknownTransform(s.to_string()))
    }
}

/// Why a transform left a buffer untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    /// Grayscale conversion of a buffer that is already single-channel.
    AlreadyGrayscale,
    /// The transform only works on single-channel buffers.
    RequiresGrayscale,
    /// The transform only works on three-channel buffers.
    RequiresColor,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SkipReason::AlreadyGrayscale => "image is already grayscale",
            SkipReason::RequiresGrayscale => "requires a grayscale image",
            SkipReason::RequiresColor => "requires a color image",
        })
    }
}

/// Result of running a transform through the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformOutcome {
    Applied(ImageBuffer),
    Skipped(SkipReason),
}

/// A single named enhancement.
pub trait Transform: Send + Sync {
    fn name(&self) -> TransformName;

    /// Shape check. `Err` means the transform would not change `input`.
    fn check(&self, input: &ImageBuffer) -> Result<(), SkipReason>;

    /// Produce the transformed buffer. Only called after `check` passed.
    fn apply(&self, input: &ImageBuffer) -> ImageBuffer;
}

fn require_color(input: &ImageBuffer) -> Result<(), SkipReason> {
    if input.is_gray() {
        Err(SkipReason::RequiresColor)
    } else {
        Ok(())
    }
}

struct Grayscale;

impl Transform for Grayscale {
    fn name(&self) -> TransformName {
        TransformName::Grayscale
    }

    fn check(&self, input: &ImageBuffer) -> Result<(), SkipReason> {
        if input.is_gray() {
            Err(SkipReason::AlreadyGrayscale)
        } else {
            Ok(())
        }
    }

    fn apply(&self, input: &ImageBuffer) -> ImageBuffer {
        operations::to_grayscale(input)
    }
}

struct EqualizeHistogram;

impl Transform for EqualizeHistogram {
    fn name(&self) -> TransformName {
        TransformName::EqualizeHistogram
    }

    fn check(&self, input: &ImageBuffer) -> Result<(), SkipReason> {
        if input.is_gray() {
            Ok(())
        } else {
            Err(SkipReason::RequiresGrayscale)
        }
    }

    fn apply(&self, input: &ImageBuffer) -> ImageBuffer {
        operations::equalize_histogram(input)
    }
}

struct ColorBalance(ClaheParams);

impl Transform for ColorBalance {
    fn name(&self) -> TransformName {
        TransformName::ColorBalance
    }

    fn check(&self, input: &ImageBuffer) -> Result<(), SkipReason> {
        require_color(input)
    }

    fn apply(&self, input: &ImageBuffer) -> ImageBuffer {
        operations::color_balance(input, &self.0)
    }
}

struct AdjustExposure(ExposureParams);

impl Transform for AdjustExposure {
    fn name(&self) -> TransformName {
        TransformName::AdjustExposure
    }

    fn check(&self, _input: &ImageBuffer) -> Result<(), SkipReason> {
        Ok(())
    }

    fn apply(&self, input: &ImageBuffer) -> ImageBuffer {
        operations::adjust_exposure(input, &self.0)
    }
}

struct EnhanceContrast;

impl Transform for EnhanceContrast {
    fn name(&self) -> TransformName {
        TransformName::EnhanceContrast
    }

    fn check(&self, input: &ImageBuffer) -> Result<(), SkipReason> {
        require_color(input)
    }

    fn apply(&self, input: &ImageBuffer) -> ImageBuffer {
        operations::enhance_contrast(input)
    }
}

struct RemoveShadows(ShadowParams);

impl Transform for RemoveShadows {
    fn name(&self) -> TransformName {
        TransformName::RemoveShadows
    }

    fn check(&self, input: &ImageBuffer) -> Result<(), SkipReason> {
        require_color(input)
    }

    fn apply(&self, input: &ImageBuffer) -> ImageBuffer {
        operations::remove_shadows(input, &self.0)
    }
}

struct EnhanceDetails(DetailParams);

impl Transform for EnhanceDetails {
    fn name(&self) -> TransformName {
        TransformName::EnhanceDetails
    }

    fn check(&self, input: &ImageBuffer) -> Result<(), SkipReason> {
        require_color(input)
    }

    fn apply(&self, input: &ImageBuffer) -> ImageBuffer {
        operations::enhance_details(input, &self.0)
    }
}

/// Every transform, ready to apply.
pub struct TransformRegistry {
    /// Indexed by [`TransformName::slot`].
    entries: Vec<Box<dyn Transform>>,
}

impl TransformRegistry {
    pub fn new(params: TransformParams) -> Self {
        let entries: Vec<Box<dyn Transform>> = vec![
            Box::new(Grayscale),
            Box::new(EqualizeHistogram),
            Box::new(ColorBalance(params.clahe)),
            Box::new(AdjustExposure(params.exposure)),
            Box::new(EnhanceContrast),
            Box::new(RemoveShadows(params.shadows)),
            Box::new(EnhanceDetails(params.details)),
        ];
        debug_assert!(
            entries
                .iter()
                .zip(TransformName::ALL)
                .all(|(entry, name)| entry.name() == name)
        );
        Self { entries }
    }

    pub fn get(&self, name: TransformName) -> &dyn Transform {
        self.entries[name.slot()].as_ref()
    }

    /// Check and run `name` against `input`.
    pub fn apply(&self, name: TransformName, input: &ImageBuffer) -> TransformOutcome {
        let transform = self.get(name);
        match transform.check(input) {
            Ok(()) => {
                debug!(transform = %name, width = input.width(), height = input.height(), "applying");
                TransformOutcome::Applied(transform.apply(input))
            }
            Err(reason) => {
                debug!(transform = %name, %reason, "skipped");
                TransformOutcome::Skipped(reason)
            }
        }
    }
}

impl Default for TransformRegistry {
    fn default() -> Self {
        Self::new(TransformParams::default())
    }
}
