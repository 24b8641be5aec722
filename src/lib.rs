//! Voxel-wise comparison of two 3-D image volumes.
//!
//! Checks that two volumes share a grid, optionally masks both with a label
//! volume, takes the absolute difference, summarizes it, and holds the
//! summary against per-statistic ceilings.

pub mod algorithms;
pub mod batch;
pub mod config;
pub mod data;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod report;
pub mod volume;

pub use error::{CompareError, InputRole, Result};
pub use pipeline::{
    run, ComparisonInputs, ComparisonOutcome, ComparisonPipeline, MaskMode, MaskSpec,
    StatisticsSummary, ToleranceSpec, Verdict, Violation,
};
pub use volume::{Extent, LabelVolume, ScalarVolume, Volume};
