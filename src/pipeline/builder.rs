use crate::logging::{get_correlation_id, new_correlation_id, PipelineSpan};
use crate::pipeline::stage::{DifferenceStage, GeometryStage, MaskingStage, StatisticsStage, ToleranceStage};
use crate::pipeline::types::{
    ComparisonArtifacts, ComparisonInputs, ComparisonOutcome, MaskSpec, PipelineState, StageTime,
    ToleranceSpec, Verdict,
};
use crate::pipeline::PipelineStage;
use crate::volume::ScalarVolume;
use crate::Result;
use std::time::Instant;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Builder for a [`ComparisonPipeline`]
pub struct ComparisonPipelineBuilder {
    name: String,
    tolerance: ToleranceSpec,
}

impl ComparisonPipelineBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tolerance: ToleranceSpec::default(),
        }
    }

    pub fn tolerance(mut self, tolerance: ToleranceSpec) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn build(self) -> ComparisonPipeline {
        ComparisonPipeline {
            name: self.name,
            tolerance: self.tolerance,
        }
    }
}

/// Geometry check, optional masking, difference, statistics, tolerance.
///
/// Holds configuration only. Each [`run`](ComparisonPipeline::run) is an
/// independent transaction, and any stage error ends it with no verdict.
#[derive(Debug, Clone)]
pub struct ComparisonPipeline {
    name: String,
    tolerance: ToleranceSpec,
}

impl ComparisonPipeline {
    pub fn builder(name: impl Into<String>) -> ComparisonPipelineBuilder {
        ComparisonPipelineBuilder::new(name)
    }

    pub fn new(tolerance: ToleranceSpec) -> Self {
        Self::builder("comparison").tolerance(tolerance).build()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tolerance(&self) -> &ToleranceSpec {
        &self.tolerance
    }

    /// Run every stage over `inputs`.
    pub fn run(&self, inputs: ComparisonInputs) -> Result<ComparisonOutcome> {
        let correlation_id = get_correlation_id().unwrap_or_else(new_correlation_id);

        info!(
            pipeline = %self.name,
            correlation_id = %correlation_id,
            extent = %inputs.image_a.extent(),
            masked = inputs.mask.is_some(),
            "Starting comparison"
        );

        let mut stage_timings = Vec::new();
        let mut state = PipelineState::Start;

        match self.run_stages(inputs, correlation_id, &mut stage_timings, &mut state) {
            Ok((verdict, artifacts)) => {
                advance(&mut state, PipelineState::Done);
                info!(
                    pipeline = %self.name,
                    correlation_id = %correlation_id,
                    passed = verdict.passed,
                    violations = verdict.violations.len(),
                    total_duration_ms = stage_timings.iter().map(|t| t.duration_ms).sum::<f64>(),
                    "Comparison completed"
                );
                Ok(ComparisonOutcome {
                    verdict,
                    artifacts,
                    stage_timings,
                    correlation_id,
                })
            }
            Err(e) => {
                let failed_after = state;
                advance(&mut state, PipelineState::Failed);
                error!(
                    pipeline = %self.name,
                    correlation_id = %correlation_id,
                    failed_after = %failed_after,
                    error = %e,
                    "Comparison aborted"
                );
                Err(e)
            }
        }
    }

    fn run_stages(
        &self,
        inputs: ComparisonInputs,
        correlation_id: Uuid,
        timings: &mut Vec<StageTime>,
        state: &mut PipelineState,
    ) -> Result<(Verdict, ComparisonArtifacts)> {
        let inputs = run_stage(&GeometryStage, inputs, correlation_id, timings)?;
        advance(state, PipelineState::GeometryChecked);

        let pair = run_stage(&MaskingStage, inputs, correlation_id, timings)?;
        advance(
            state,
            if pair.masked {
                PipelineState::Masked
            } else {
                PipelineState::Unmasked
            },
        );

        let difference = run_stage(&DifferenceStage, pair.clone(), correlation_id, timings)?;
        advance(state, PipelineState::Differenced);

        let summary = run_stage(&StatisticsStage, difference.clone(), correlation_id, timings)?;
        advance(state, PipelineState::Summarized);

        let verdict = run_stage(
            &ToleranceStage::new(self.tolerance),
            summary,
            correlation_id,
            timings,
        )?;
        advance(state, PipelineState::Evaluated);

        let (masked_a, masked_b) = if pair.masked {
            (Some(pair.image_a), Some(pair.image_b))
        } else {
            (None, None)
        };

        Ok((
            verdict,
            ComparisonArtifacts {
                masked_a,
                masked_b,
                difference,
            },
        ))
    }
}

fn advance(state: &mut PipelineState, next: PipelineState) {
    debug!(from = %state, to = %next, "Pipeline state transition");
    *state = next;
}

fn run_stage<S: PipelineStage>(
    stage: &S,
    input: S::Input,
    correlation_id: Uuid,
    timings: &mut Vec<StageTime>,
) -> Result<S::Output> {
    let stage_name = stage.stage_name().to_string();
    let span = PipelineSpan::new(&stage_name, Some(correlation_id));
    let _span_guard = span.enter();

    span.record_input(stage.input_extent(&input));
    debug!(
        stage = %stage_name,
        parallel = stage.can_parallelize(),
        "Executing pipeline stage"
    );

    let start = Instant::now();
    match stage.execute(input) {
        Ok(output) => {
            let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
            timings.push(StageTime {
                stage_name,
                duration_ms,
            });
            span.record_completion(true);
            Ok(output)
        }
        Err(e) => {
            span.record_completion(false);
            error!(stage = %stage_name, error = %e, "Pipeline stage failed");
            Err(e)
        }
    }
}

/// Compare two images and return only the verdict.
///
/// `mask`, when given, is applied to both images before differencing;
/// without it the originals are compared as-is.
pub fn run(
    image_a: &ScalarVolume,
    image_b: &ScalarVolume,
    mask: Option<&MaskSpec>,
    tolerance: &ToleranceSpec,
) -> Result<Verdict> {
    let inputs = ComparisonInputs {
        image_a: image_a.clone(),
        image_b: image_b.clone(),
        mask: mask.cloned(),
    };
    ComparisonPipeline::new(*tolerance)
        .run(inputs)
        .map(|outcome| outcome.verdict)
}
