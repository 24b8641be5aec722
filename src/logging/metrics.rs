//! Stage timing metrics
//!
//! Collects per-stage durations across many comparison runs (a batch
//! manifest, a benchmark loop) and summarizes them per stage.

use crate::pipeline::StageTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use uuid::Uuid;

const MAX_MEASUREMENTS: usize = 10_000;

/// Individual performance measurement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMeasurement {
    pub operation: String,
    pub duration_ms: f64,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub correlation_id: Option<Uuid>,
}

/// Statistical summary of performance measurements
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceStats {
    pub operation: String,
    pub count: usize,
    pub mean_ms: f64,
    pub median_ms: f64,
    pub std_dev_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
}

/// Thread-safe metrics collector
pub struct MetricsCollector {
    measurements: Arc<Mutex<Vec<PerformanceMeasurement>>>,
    enabled: bool,
}

impl MetricsCollector {
    /// Create a new metrics collector
    pub fn new(enabled: bool) -> Self {
        Self {
            measurements: Arc::new(Mutex::new(Vec::new())),
            enabled,
        }
    }

    /// Record a performance measurement
    pub fn record(&self, operation: &str, duration: Duration, correlation_id: Option<Uuid>) {
        self.record_ms(operation, duration.as_secs_f64() * 1000.0, correlation_id);
    }

    /// Record every stage timing of one pipeline run
    pub fn record_stage_timings(&self, timings: &[StageTime], correlation_id: Uuid) {
        for timing in timings {
            self.record_ms(&timing.stage_name, timing.duration_ms, Some(correlation_id));
        }
    }

    fn record_ms(&self, operation: &str, duration_ms: f64, correlation_id: Option<Uuid>) {
        if !self.enabled {
            return;
        }

        let measurement = PerformanceMeasurement {
            operation: operation.to_string(),
            duration_ms,
            timestamp: chrono::Utc::now(),
            correlation_id,
        };

        if let Ok(mut measurements) = self.measurements.lock() {
            measurements.push(measurement);

            // Prevent unbounded growth
            if measurements.len() > MAX_MEASUREMENTS {
                measurements.drain(0..MAX_MEASUREMENTS / 2);
            }
        }
    }

    /// Get all measurements for a specific operation
    pub fn get_measurements(&self, operation: &str) -> Vec<PerformanceMeasurement> {
        if let Ok(measurements) = self.measurements.lock() {
            measurements
                .iter()
                .filter(|m| m.operation == operation)
                .cloned()
                .collect()
        } else {
            Vec::new()
        }
    }

    /// Get measurements by correlation ID
    pub fn get_measurements_by_correlation(&self, correlation_id: Uuid) -> Vec<PerformanceMeasurement> {
        if let Ok(measurements) = self.measurements.lock() {
            measurements
                .iter()
                .filter(|m| m.correlation_id == Some(correlation_id))
                .cloned()
                .collect()
        } else {
            Vec::new()
        }
    }

    /// Names of every recorded operation, sorted
    pub fn operations(&self) -> Vec<String> {
        if let Ok(measurements) = self.measurements.lock() {
            measurements
                .iter()
                .map(|m| m.operation.clone())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        } else {
            Vec::new()
        }
    }

    /// Calculate performance statistics for an operation
    pub fn calculate_stats(&self, operation: &str) -> Option<PerformanceStats> {
        let measurements = self.get_measurements(operation);
        if measurements.is_empty() {
            return None;
        }

        let mut durations: Vec<f64> = measurements.iter().map(|m| m.duration_ms).collect();
        durations.sort_by(|a, b| a.total_cmp(b));

        let count = durations.len();
        let mean = durations.iter().sum::<f64>() / count as f64;
        let variance = durations
            .iter()
            .map(|d| {
                let diff = d - mean;
                diff * diff
            })
            .sum::<f64>()
            / count as f64;

        let median = if count % 2 == 0 {
            (durations[count / 2 - 1] + durations[count / 2]) / 2.0
        } else {
            durations[count / 2]
        };

        let p95_index = ((count as f64) * 0.95) as usize;
        let p99_index = ((count as f64) * 0.99) as usize;

        Some(PerformanceStats {
            operation: operation.to_string(),
            count,
            mean_ms: mean,
            median_ms: median,
            std_dev_ms: variance.sqrt(),
            min_ms: durations[0],
            max_ms: durations[count - 1],
            p95_ms: durations[p95_index.min(count - 1)],
            p99_ms: durations[p99_index.min(count - 1)],
        })
    }

    /// Statistics for every recorded operation
    pub fn all_stats(&self) -> Vec<PerformanceStats> {
        self.operations()
            .iter()
            .filter_map(|op| self.calculate_stats(op))
            .collect()
    }

    /// Clear all measurements
    pub fn clear(&self) {
        if let Ok(mut measurements) = self.measurements.lock() {
            measurements.clear();
        }
    }

    /// Get total number of measurements
    pub fn measurement_count(&self) -> usize {
        if let Ok(measurements) = self.measurements.lock() {
            measurements.len()
        } else {
            0
        }
    }

    /// Export measurements to JSON
    pub fn export_to_json(&self) -> Result<String, serde_json::Error> {
        if let Ok(measurements) = self.measurements.lock() {
            serde_json::to_string_pretty(&*measurements)
        } else {
            Ok("[]".to_string())
        }
    }
}

/// Wall-clock timer that reports into a collector when stopped
pub struct Timer {
    start: Instant,
    operation: String,
    correlation_id: Option<Uuid>,
    collector: Option<Arc<MetricsCollector>>,
}

impl Timer {
    /// Start a new timer
    pub fn start(operation: &str, correlation_id: Option<Uuid>) -> Self {
        Self {
            start: Instant::now(),
            operation: operation.to_string(),
            correlation_id,
            collector: None,
        }
    }

    /// Start a timer with metrics collection
    pub fn start_with_collector(
        operation: &str,
        correlation_id: Option<Uuid>,
        collector: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            collector: Some(collector),
            ..Self::start(operation, correlation_id)
        }
    }

    /// Stop the timer and record the measurement
    pub fn stop(self) -> Duration {
        let duration = self.start.elapsed();

        if let Some(collector) = &self.collector {
            collector.record(&self.operation, duration, self.correlation_id);
        }

        tracing::trace!(
            operation = %self.operation,
            duration_ms = duration.as_secs_f64() * 1000.0,
            correlation_id = ?self.correlation_id,
            "Timer completed"
        );

        duration
    }
}
