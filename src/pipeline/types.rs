use crate::volume::{LabelVolume, ScalarVolume};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Which side of the target label survives masking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaskMode {
    /// Keep voxels labelled with the target, fill the rest
    #[default]
    Inclusive,
    /// Fill voxels labelled with the target, keep the rest
    Exclusive,
}

impl fmt::Display for MaskMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaskMode::Inclusive => write!(f, "inclusive"),
            MaskMode::Exclusive => write!(f, "exclusive"),
        }
    }
}

/// Label mask applied identically to both compared images
#[derive(Debug, Clone)]
pub struct MaskSpec {
    pub labels: LabelVolume,
    pub target_label: u16,
    pub fill_value: f32,
    pub mode: MaskMode,
}

impl MaskSpec {
    pub fn new(labels: LabelVolume, target_label: u16) -> Self {
        Self {
            labels,
            target_label,
            fill_value: 0.0,
            mode: MaskMode::Inclusive,
        }
    }

    pub fn with_fill_value(mut self, fill_value: f32) -> Self {
        self.fill_value = fill_value;
        self
    }

    pub fn with_mode(mut self, mode: MaskMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Raw inputs of one comparison run
#[derive(Debug, Clone)]
pub struct ComparisonInputs {
    pub image_a: ScalarVolume,
    pub image_b: ScalarVolume,
    pub mask: Option<MaskSpec>,
}

/// The pair of images that feeds the difference engine
#[derive(Debug, Clone)]
pub struct MaskedPair {
    pub image_a: ScalarVolume,
    pub image_b: ScalarVolume,
    /// False when no mask was supplied and the originals pass through
    pub masked: bool,
}

/// Statistics over every sample of a volume
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatisticsSummary {
    pub mean: f64,
    pub minimum: f64,
    pub maximum: f64,
    /// Population standard deviation
    pub sigma: f64,
    /// Population variance
    pub variance: f64,
    pub sum: f64,
    pub count: usize,
}

/// Upper bounds each statistic must not exceed
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToleranceSpec {
    pub max_ceiling: f64,
    pub min_ceiling: f64,
    pub mean_ceiling: f64,
    pub sigma_ceiling: f64,
}

impl ToleranceSpec {
    /// Same ceiling for all four statistics
    pub fn uniform(ceiling: f64) -> Self {
        Self {
            max_ceiling: ceiling,
            min_ceiling: ceiling,
            mean_ceiling: ceiling,
            sigma_ceiling: ceiling,
        }
    }

    pub fn with_max(mut self, ceiling: f64) -> Self {
        self.max_ceiling = ceiling;
        self
    }

    pub fn with_min(mut self, ceiling: f64) -> Self {
        self.min_ceiling = ceiling;
        self
    }

    pub fn with_mean(mut self, ceiling: f64) -> Self {
        self.mean_ceiling = ceiling;
        self
    }

    pub fn with_sigma(mut self, ceiling: f64) -> Self {
        self.sigma_ceiling = ceiling;
        self
    }
}

/// One of the four statistics held against a ceiling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Statistic {
    Mean,
    Maximum,
    Minimum,
    Sigma,
}

impl Statistic {
    /// Evaluation and reporting order
    pub const ALL: [Statistic; 4] = [
        Statistic::Mean,
        Statistic::Maximum,
        Statistic::Minimum,
        Statistic::Sigma,
    ];

    pub fn observed(&self, summary: &StatisticsSummary) -> f64 {
        match self {
            Statistic::Mean => summary.mean,
            Statistic::Maximum => summary.maximum,
            Statistic::Minimum => summary.minimum,
            Statistic::Sigma => summary.sigma,
        }
    }

    pub fn ceiling(&self, spec: &ToleranceSpec) -> f64 {
        match self {
            Statistic::Mean => spec.mean_ceiling,
            Statistic::Maximum => spec.max_ceiling,
            Statistic::Minimum => spec.min_ceiling,
            Statistic::Sigma => spec.sigma_ceiling,
        }
    }

    /// Label used in console output
    pub fn label(&self) -> &'static str {
        match self {
            Statistic::Mean => "Mean",
            Statistic::Maximum => "Max.",
            Statistic::Minimum => "Min.",
            Statistic::Sigma => "Sigma",
        }
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statistic::Mean => write!(f, "mean"),
            Statistic::Maximum => write!(f, "max"),
            Statistic::Minimum => write!(f, "min"),
            Statistic::Sigma => write!(f, "sigma"),
        }
    }
}

/// A statistic that exceeded its ceiling
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub statistic: Statistic,
    pub observed: f64,
    pub ceiling: f64,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} difference {} exceeds tolerance {}",
            self.statistic.label(),
            self.observed,
            self.ceiling
        )
    }
}

/// Pass/fail outcome plus the statistics it was decided on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub passed: bool,
    pub summary: StatisticsSummary,
    pub violations: Vec<Violation>,
}

impl Verdict {
    pub fn violation_for(&self, statistic: Statistic) -> Option<&Violation> {
        self.violations.iter().find(|v| v.statistic == statistic)
    }
}

/// Derived volumes a caller may want to persist
#[derive(Debug, Clone)]
pub struct ComparisonArtifacts {
    pub masked_a: Option<ScalarVolume>,
    pub masked_b: Option<ScalarVolume>,
    pub difference: ScalarVolume,
}

/// Everything one pipeline run produces
#[derive(Debug, Clone)]
pub struct ComparisonOutcome {
    pub verdict: Verdict,
    pub artifacts: ComparisonArtifacts,
    pub stage_timings: Vec<StageTime>,
    pub correlation_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageTime {
    pub stage_name: String,
    pub duration_ms: f64,
}

/// Progress of a single run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Start,
    GeometryChecked,
    Masked,
    Unmasked,
    Differenced,
    Summarized,
    Evaluated,
    Done,
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Start => "start",
            PipelineState::GeometryChecked => "geometry_checked",
            PipelineState::Masked => "masked",
            PipelineState::Unmasked => "unmasked",
            PipelineState::Differenced => "differenced",
            PipelineState::Summarized => "summarized",
            PipelineState::Evaluated => "evaluated",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}
