//! Structured spans for pipeline stages and batch sessions

use crate::volume::Extent;
use std::time::Instant;
use tracing::field::Empty;
use tracing::{span, Level, Span};
use uuid::Uuid;

/// Span for pipeline stage execution
pub struct PipelineSpan {
    span: Span,
    start_time: Instant,
    stage_name: String,
}

impl PipelineSpan {
    /// Create a new pipeline stage span
    pub fn new(stage_name: &str, correlation_id: Option<Uuid>) -> Self {
        let span = if let Some(corr_id) = correlation_id {
            span!(
                Level::INFO,
                "pipeline_stage",
                stage = stage_name,
                correlation_id = %corr_id,
                input_extent = Empty,
                success = Empty,
                execution_time_ms = Empty
            )
        } else {
            span!(
                Level::INFO,
                "pipeline_stage",
                stage = stage_name,
                input_extent = Empty,
                success = Empty,
                execution_time_ms = Empty
            )
        };

        Self {
            span,
            start_time: Instant::now(),
            stage_name: stage_name.to_string(),
        }
    }

    /// Record stage input metadata
    pub fn record_input(&self, input_extent: Option<Extent>) {
        if let Some(extent) = input_extent {
            self.span.record("input_extent", tracing::field::display(extent));
        }
        tracing::trace!(
            parent: &self.span,
            stage = %self.stage_name,
            input_extent = ?input_extent,
            "Pipeline stage input recorded"
        );
    }

    /// Record stage completion
    pub fn record_completion(&self, success: bool) {
        let duration = self.start_time.elapsed();
        self.span.record("success", success);
        self.span.record("execution_time_ms", duration.as_secs_f64() * 1000.0);

        tracing::debug!(
            parent: &self.span,
            stage = %self.stage_name,
            success = success,
            execution_time_ms = duration.as_secs_f64() * 1000.0,
            "Pipeline stage completed"
        );
    }

    pub fn stage_name(&self) -> &str {
        &self.stage_name
    }

    /// Get the underlying span
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Enter the span context
    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}

/// Span covering one batch manifest run
pub struct BatchSpan {
    span: Span,
    start_time: Instant,
    session_id: Uuid,
}

impl BatchSpan {
    pub fn new(manifest: &str, session_id: Uuid) -> Self {
        let span = span!(
            Level::INFO,
            "batch_session",
            manifest = manifest,
            session_id = %session_id,
            total_cases = Empty,
            passed_cases = Empty
        );

        Self {
            span,
            start_time: Instant::now(),
            session_id,
        }
    }

    /// Record one finished case
    pub fn record_case(&self, name: &str, correlation_id: Uuid, passed: bool) {
        tracing::debug!(
            parent: &self.span,
            case = name,
            correlation_id = %correlation_id,
            passed = passed,
            "Batch case completed"
        );
    }

    /// Record session completion
    pub fn record_completion(&self, total_cases: usize, passed_cases: usize) {
        let duration = self.start_time.elapsed();
        self.span.record("total_cases", total_cases);
        self.span.record("passed_cases", passed_cases);

        tracing::info!(
            parent: &self.span,
            total_cases = total_cases,
            passed_cases = passed_cases,
            session_duration_ms = duration.as_millis() as u64,
            "Batch session completed"
        );
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[traced_test]
    #[test]
    fn test_pipeline_span() {
        let correlation_id = Uuid::new_v4();
        let span = PipelineSpan::new("Difference", Some(correlation_id));

        let _enter = span.enter();
        span.record_input(Some(Extent::new(4, 4, 4)));
        span.record_completion(true);

        assert_eq!(span.stage_name(), "Difference");
        assert!(logs_contain("Pipeline stage completed"));
    }

    #[traced_test]
    #[test]
    fn test_batch_span() {
        let session_id = Uuid::new_v4();
        let span = BatchSpan::new("regression.toml", session_id);

        let _enter = span.enter();
        span.record_case("brain_t1", Uuid::new_v4(), true);
        span.record_case("brain_t2", Uuid::new_v4(), false);
        span.record_completion(2, 1);

        assert_eq!(span.session_id(), session_id);
        assert!(logs_contain("Batch session completed"));
    }
}
