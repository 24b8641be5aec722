use crate::algorithms::{difference, evaluate, mask_pair, summarize, validate_geometry};
use crate::pipeline::types::{ComparisonInputs, MaskedPair, StatisticsSummary, ToleranceSpec, Verdict};
use crate::pipeline::PipelineStage;
use crate::volume::{Extent, ScalarVolume};
use crate::Result;

/// Stage that rejects inputs whose extents disagree
pub struct GeometryStage;

impl PipelineStage for GeometryStage {
    type Input = ComparisonInputs;
    type Output = ComparisonInputs;

    fn execute(&self, input: Self::Input) -> Result<Self::Output> {
        validate_geometry(
            &input.image_a,
            &input.image_b,
            input.mask.as_ref().map(|m| &m.labels),
        )?;
        Ok(input)
    }

    fn stage_name(&self) -> &str {
        "GeometryValidation"
    }

    fn input_extent(&self, input: &Self::Input) -> Option<Extent> {
        Some(input.image_a.extent())
    }
}

/// Stage that masks both images, or passes them through untouched
pub struct MaskingStage;

impl PipelineStage for MaskingStage {
    type Input = ComparisonInputs;
    type Output = MaskedPair;

    fn execute(&self, input: Self::Input) -> Result<Self::Output> {
        match input.mask {
            Some(spec) => {
                let (image_a, image_b) = mask_pair(&input.image_a, &input.image_b, &spec)?;
                Ok(MaskedPair {
                    image_a,
                    image_b,
                    masked: true,
                })
            }
            None => Ok(MaskedPair {
                image_a: input.image_a,
                image_b: input.image_b,
                masked: false,
            }),
        }
    }

    fn can_parallelize(&self) -> bool {
        true
    }

    fn stage_name(&self) -> &str {
        "Masking"
    }

    fn input_extent(&self, input: &Self::Input) -> Option<Extent> {
        Some(input.image_a.extent())
    }
}

/// Stage that computes the absolute difference image
pub struct DifferenceStage;

impl PipelineStage for DifferenceStage {
    type Input = MaskedPair;
    type Output = ScalarVolume;

    fn execute(&self, input: Self::Input) -> Result<Self::Output> {
        difference(&input.image_a, &input.image_b)
    }

    fn can_parallelize(&self) -> bool {
        true
    }

    fn stage_name(&self) -> &str {
        "Difference"
    }

    fn input_extent(&self, input: &Self::Input) -> Option<Extent> {
        Some(input.image_a.extent())
    }
}

/// Stage that summarizes the difference image
pub struct StatisticsStage;

impl PipelineStage for StatisticsStage {
    type Input = ScalarVolume;
    type Output = StatisticsSummary;

    fn execute(&self, input: Self::Input) -> Result<Self::Output> {
        summarize(&input)
    }

    fn can_parallelize(&self) -> bool {
        true
    }

    fn stage_name(&self) -> &str {
        "Statistics"
    }

    fn input_extent(&self, input: &Self::Input) -> Option<Extent> {
        Some(input.extent())
    }
}

/// Stage that turns a summary into a verdict
pub struct ToleranceStage {
    tolerance: ToleranceSpec,
}

impl ToleranceStage {
    pub fn new(tolerance: ToleranceSpec) -> Self {
        Self { tolerance }
    }
}

impl PipelineStage for ToleranceStage {
    type Input = StatisticsSummary;
    type Output = Verdict;

    fn execute(&self, input: Self::Input) -> Result<Self::Output> {
        Ok(evaluate(&input, &self.tolerance))
    }

    fn stage_name(&self) -> &str {
        "ToleranceEvaluation"
    }
}
