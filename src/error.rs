//! Error types for the comparison core
//!
//! Structural failures (mismatched grids, empty volumes, bad configuration)
//! are errors. A statistic exceeding its ceiling is not: it is reported
//! through [`crate::pipeline::Verdict`].

use crate::volume::Extent;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Which input a volume played in a comparison, used to name the offending
/// pair in a [`CompareError::GeometryMismatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum InputRole {
    ImageA,
    ImageB,
    /// A single image passed through the masking engine
    Image,
    Mask,
}

impl fmt::Display for InputRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputRole::ImageA => write!(f, "image A"),
            InputRole::ImageB => write!(f, "image B"),
            InputRole::Image => write!(f, "image"),
            InputRole::Mask => write!(f, "mask"),
        }
    }
}

/// Comparison core error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompareError {
    /// Two inputs that must share an extent do not
    #[error("geometry mismatch: {left} is {left_extent} but {right} is {right_extent}")]
    GeometryMismatch {
        left: InputRole,
        left_extent: Extent,
        right: InputRole,
        right_extent: Extent,
    },

    /// Statistics requested over a volume with no voxels
    #[error("cannot summarize an empty volume (extent {extent})")]
    EmptyVolume { extent: Extent },

    /// Options that cannot describe a valid run
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Sample buffer length disagrees with the requested extent
    #[error("sample buffer of length {len} does not fill extent {extent}")]
    ShapeMismatch { extent: Extent, len: usize },
}

/// Result type alias for the comparison core
pub type Result<T> = std::result::Result<T, CompareError>;
