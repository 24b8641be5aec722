//! Console and JSON reporting of comparison results

use crate::config::CompareOptions;
use crate::data::{write_artifacts, VolumeLoader, VolumeWriter};
use crate::pipeline::{ComparisonOutcome, ComparisonPipeline, StageTime, StatisticsSummary, Verdict};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::path::Path;
use uuid::Uuid;

pub const FAILURE_BANNER: &str = "One or more of the measured statistics are higher than tolerance values";

/// Write the four statistics, one per line.
pub fn write_statistics<W: Write>(mut out: W, summary: &StatisticsSummary) -> io::Result<()> {
    writeln!(out, "Mean difference: {}", summary.mean)?;
    writeln!(out, "Max. difference: {}", summary.maximum)?;
    writeln!(out, "Min. difference: {}", summary.minimum)?;
    writeln!(out, "Sigma difference: {}", summary.sigma)?;
    Ok(())
}

/// Write one line per violation followed by the failure banner. Writes
/// nothing for a passing verdict.
pub fn write_violations<W: Write>(mut out: W, verdict: &Verdict) -> io::Result<()> {
    if verdict.passed {
        return Ok(());
    }
    for violation in &verdict.violations {
        writeln!(out, "{}", violation)?;
    }
    writeln!(out, "{}", FAILURE_BANNER)?;
    Ok(())
}

/// Run one comparison, print its result, then persist the artifacts.
///
/// Statistics go to `out` and violations to `err` before any artifact is
/// written, so they are reported even when a write fails.
pub fn compare_and_report<O: Write, E: Write>(
    options: &CompareOptions,
    loader: &dyn VolumeLoader,
    writer: &dyn VolumeWriter,
    out: O,
    err: E,
) -> anyhow::Result<ComparisonOutcome> {
    options.validate()?;
    let inputs = options.load_inputs(loader)?;

    let outcome = ComparisonPipeline::builder("compare")
        .tolerance(options.tolerance)
        .build()
        .run(inputs)?;

    write_statistics(out, &outcome.verdict.summary).context("cannot write results")?;
    write_violations(err, &outcome.verdict).context("cannot write results")?;
    write_artifacts(writer, &outcome.artifacts, &options.outputs)?;
    Ok(outcome)
}

/// Machine-readable record of a single comparison
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub correlation_id: Uuid,
    pub options: CompareOptions,
    pub verdict: Verdict,
    pub stage_timings: Vec<StageTime>,
}

impl ComparisonReport {
    pub fn new(options: &CompareOptions, outcome: &ComparisonOutcome) -> Self {
        Self {
            timestamp: chrono::Utc::now(),
            correlation_id: outcome.correlation_id,
            options: options.clone(),
            verdict: outcome.verdict.clone(),
            stage_timings: outcome.stage_timings.clone(),
        }
    }

    pub fn total_duration_ms(&self) -> f64 {
        self.stage_timings.iter().map(|t| t.duration_ms).sum()
    }
}

/// Serialize any report as pretty JSON to `path`.
pub fn write_report<T: Serialize>(report: &T, path: &Path) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)
        .with_context(|| format!("cannot write report {}", path.display()))?;
    tracing::info!(path = %path.display(), "Report saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Statistic, Violation};
    use crate::volume::{Extent, LabelVolume, ScalarVolume};
    use std::path::Path;

    struct MemoryLoader;

    impl VolumeLoader for MemoryLoader {
        fn load_scalar(&self, path: &Path) -> anyhow::Result<ScalarVolume> {
            let value = if path.ends_with("a.vol") { 5.0 } else { 7.0 };
            Ok(ScalarVolume::filled(Extent::new(2, 2, 2), value))
        }

        fn load_labels(&self, _path: &Path) -> anyhow::Result<LabelVolume> {
            Ok(LabelVolume::filled(Extent::new(2, 2, 2), 0))
        }
    }

    struct FailingWriter;

    impl VolumeWriter for FailingWriter {
        fn write_scalar(&self, _volume: &ScalarVolume, path: &Path) -> anyhow::Result<()> {
            anyhow::bail!("disk full writing {}", path.display())
        }
    }

    fn summary() -> StatisticsSummary {
        StatisticsSummary {
            mean: 0.5,
            minimum: 0.0,
            maximum: 2.0,
            sigma: 0.25,
            variance: 0.0625,
            sum: 4.0,
            count: 8,
        }
    }

    #[test]
    fn test_statistics_lines() {
        let mut out = Vec::new();
        write_statistics(&mut out, &summary()).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "Mean difference: 0.5\nMax. difference: 2\nMin. difference: 0\nSigma difference: 0.25\n"
        );
    }

    #[test]
    fn test_violations_then_banner() {
        let verdict = Verdict {
            passed: false,
            summary: summary(),
            violations: vec![
                Violation {
                    statistic: Statistic::Mean,
                    observed: 0.5,
                    ceiling: 0.1,
                },
                Violation {
                    statistic: Statistic::Maximum,
                    observed: 2.0,
                    ceiling: 1.0,
                },
            ],
        };
        let mut out = Vec::new();
        write_violations(&mut out, &verdict).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Mean difference 0.5"));
        assert!(lines[1].starts_with("Max. difference 2"));
        assert_eq!(lines[2], FAILURE_BANNER);
    }

    #[test]
    fn test_passing_verdict_writes_nothing() {
        let verdict = Verdict {
            passed: true,
            summary: summary(),
            violations: Vec::new(),
        };
        let mut out = Vec::new();
        write_violations(&mut out, &verdict).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_statistics_printed_before_failed_artifact_write() {
        let mut options = CompareOptions::new("a.vol", "b.vol");
        options.outputs.difference = Some("diff.vol".into());

        let mut out = Vec::new();
        let mut err = Vec::new();
        let result = compare_and_report(&options, &MemoryLoader, &FailingWriter, &mut out, &mut err);

        assert!(result.unwrap_err().to_string().contains("disk full"));
        let stdout = String::from_utf8(out).unwrap();
        assert!(stdout.starts_with("Mean difference: 2\n"));
        assert!(stdout.contains("Sigma difference: 0"));
        let stderr = String::from_utf8(err).unwrap();
        assert!(stderr.ends_with(&format!("{}\n", FAILURE_BANNER)));
    }
}
