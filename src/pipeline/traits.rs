use crate::volume::Extent;
use crate::Result;

/// One step of the comparison pipeline.
///
/// Stages own no mutable state: `execute` is a function from its input to a
/// fresh output, so one stage value can serve concurrent runs.
pub trait PipelineStage: Send + Sync {
    type Input;
    type Output;

    /// Execute this stage of the pipeline
    fn execute(&self, input: Self::Input) -> Result<Self::Output>;

    /// Check if this stage spreads its work over the rayon pool
    fn can_parallelize(&self) -> bool {
        false
    }

    /// Get the name of this stage for logging/debugging
    fn stage_name(&self) -> &str;

    /// Extent of the input, recorded on the stage span
    fn input_extent(&self, _input: &Self::Input) -> Option<Extent> {
        None
    }
}
