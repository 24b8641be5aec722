//! Batch regression runs driven by a TOML manifest
//!
//! ```toml
//! [tolerance]
//! mean_ceiling = 0.01
//!
//! [[case]]
//! name = "t1_brain"
//! image_a = "baseline/t1.vol"
//! image_b = "current/t1.vol"
//! mask = "labels/brain.vol"
//! mask_label = 1
//! ```
//!
//! Relative paths resolve against the manifest's directory. Cases run
//! concurrently and are reported in manifest order.

use crate::config::{CompareOptions, Config, OutputLocators};
use crate::data::{write_artifacts, VolumeLoader, VolumeWriter};
use crate::logging::{
    clear_correlation_id, new_correlation_id, BatchSpan, MetricsCollector, PerformanceStats, Timer,
};
use crate::pipeline::{ComparisonOutcome, ComparisonPipeline, ToleranceSpec, Verdict};
use anyhow::{bail, Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchManifest {
    /// Ceilings for cases that do not carry their own
    pub tolerance: Option<ToleranceSpec>,
    #[serde(rename = "case", default)]
    pub cases: Vec<BatchCase>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchCase {
    pub name: String,
    pub image_a: PathBuf,
    pub image_b: PathBuf,
    pub mask: Option<PathBuf>,
    #[serde(default)]
    pub mask_outside: bool,
    pub mask_label: Option<u16>,
    pub mask_value: Option<f32>,
    pub tolerance: Option<ToleranceSpec>,
    /// Where to write the difference volume
    pub difference: Option<PathBuf>,
}

impl BatchManifest {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read manifest {}", path.display()))?;
        let manifest: BatchManifest = toml::from_str(&content)
            .with_context(|| format!("invalid manifest {}", path.display()))?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cases.is_empty() {
            bail!("manifest contains no [[case]] entries");
        }
        let mut seen = HashSet::new();
        for case in &self.cases {
            if !seen.insert(case.name.as_str()) {
                bail!("duplicate case name '{}'", case.name);
            }
        }
        Ok(())
    }
}

impl BatchCase {
    /// Resolve this case into comparison options.
    ///
    /// Precedence for ceilings is case, then manifest, then config file.
    pub fn to_options(
        &self,
        base_dir: &Path,
        defaults: &Config,
        manifest_tolerance: Option<ToleranceSpec>,
    ) -> CompareOptions {
        let resolve = |p: &Path| base_dir.join(p);

        CompareOptions {
            image_a: resolve(&self.image_a),
            image_b: resolve(&self.image_b),
            mask: self.mask.as_deref().map(resolve),
            mask_outside: self.mask_outside,
            mask_label: self.mask_label.unwrap_or(defaults.masking.label),
            mask_value: self.mask_value.unwrap_or(defaults.masking.fill_value),
            tolerance: self
                .tolerance
                .or(manifest_tolerance)
                .unwrap_or(defaults.tolerance),
            outputs: OutputLocators {
                difference: self.difference.as_deref().map(resolve),
                ..OutputLocators::default()
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseResult {
    pub name: String,
    pub correlation_id: Uuid,
    pub duration_ms: f64,
    pub verdict: Option<Verdict>,
    /// Set when the case could not produce a verdict
    pub error: Option<String>,
}

impl CaseResult {
    pub fn passed(&self) -> bool {
        self.error.is_none() && self.verdict.as_ref().is_some_and(|v| v.passed)
    }
}

impl fmt::Display for CaseResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.verdict, &self.error) {
            (_, Some(error)) => write!(f, "ERROR {}: {}", self.name, error),
            (Some(verdict), None) if verdict.passed => write!(f, "PASS  {}", self.name),
            (Some(verdict), None) => {
                let failed: Vec<String> = verdict
                    .violations
                    .iter()
                    .map(|v| v.statistic.to_string())
                    .collect();
                write!(f, "FAIL  {} ({})", self.name, failed.join(", "))
            }
            (None, None) => write!(f, "ERROR {}: no verdict", self.name),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub session_id: Uuid,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub cases: Vec<CaseResult>,
    pub stage_stats: Vec<PerformanceStats>,
}

impl BatchOutcome {
    pub fn passed_count(&self) -> usize {
        self.cases.iter().filter(|c| c.passed()).count()
    }

    pub fn all_passed(&self) -> bool {
        self.passed_count() == self.cases.len()
    }
}

/// Runs every case of a manifest through its own pipeline.
pub struct BatchRunner<'a> {
    loader: &'a dyn VolumeLoader,
    writer: &'a dyn VolumeWriter,
    defaults: &'a Config,
    metrics: Arc<MetricsCollector>,
}

impl<'a> BatchRunner<'a> {
    pub fn new(
        loader: &'a dyn VolumeLoader,
        writer: &'a dyn VolumeWriter,
        defaults: &'a Config,
    ) -> Self {
        Self {
            loader,
            writer,
            defaults,
            metrics: Arc::new(MetricsCollector::new(true)),
        }
    }

    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }

    pub fn run(&self, manifest: &BatchManifest, manifest_path: &Path) -> BatchOutcome {
        let base_dir = manifest_path.parent().unwrap_or_else(|| Path::new(""));
        let session = BatchSpan::new(&manifest_path.display().to_string(), Uuid::new_v4());
        let _guard = session.enter();

        info!(
            session_id = %session.session_id(),
            cases = manifest.cases.len(),
            "Starting batch"
        );

        let cases: Vec<CaseResult> = manifest
            .cases
            .par_iter()
            .map(|case| {
                let options = case.to_options(base_dir, self.defaults, manifest.tolerance);
                self.run_case(&case.name, &options)
            })
            .collect();

        for case in &cases {
            session.record_case(&case.name, case.correlation_id, case.passed());
        }

        let outcome = BatchOutcome {
            session_id: session.session_id(),
            timestamp: chrono::Utc::now(),
            stage_stats: self.metrics.all_stats(),
            cases,
        };
        for stats in &outcome.stage_stats {
            info!(
                operation = %stats.operation,
                count = stats.count,
                mean_ms = stats.mean_ms,
                p95_ms = stats.p95_ms,
                max_ms = stats.max_ms,
                "Stage timing summary"
            );
        }
        session.record_completion(outcome.cases.len(), outcome.passed_count());
        outcome
    }

    fn run_case(&self, name: &str, options: &CompareOptions) -> CaseResult {
        // Rayon reuses worker threads, so every case needs a fresh id
        let correlation_id = new_correlation_id();
        let timer = Timer::start_with_collector("case_total", Some(correlation_id), self.metrics.clone());

        let result = self.execute(options);
        let duration_ms = timer.stop().as_secs_f64() * 1000.0;
        clear_correlation_id();

        match result {
            Ok(outcome) => {
                self.metrics
                    .record_stage_timings(&outcome.stage_timings, correlation_id);
                CaseResult {
                    name: name.to_string(),
                    correlation_id,
                    duration_ms,
                    verdict: Some(outcome.verdict),
                    error: None,
                }
            }
            Err(e) => {
                warn!(case = name, correlation_id = %correlation_id, error = %e, "Case failed to run");
                CaseResult {
                    name: name.to_string(),
                    correlation_id,
                    duration_ms,
                    verdict: None,
                    error: Some(format!("{:#}", e)),
                }
            }
        }
    }

    fn execute(&self, options: &CompareOptions) -> Result<ComparisonOutcome> {
        options.validate()?;
        let inputs = options.load_inputs(self.loader)?;
        let outcome = ComparisonPipeline::builder("batch")
            .tolerance(options.tolerance)
            .build()
            .run(inputs)?;
        write_artifacts(self.writer, &outcome.artifacts, &options.outputs)?;
        Ok(outcome)
    }
}
