//! Single-pass statistics over a scalar volume.
//!
//! The volume is tiled into slabs along its first axis. Each slab is reduced
//! on the rayon pool with Welford's update, and the partials are merged in
//! slab order with the pairwise combine of Chan et al. Because the tiling and
//! the merge order depend only on the extent, the result is the same for any
//! number of worker threads.

use crate::error::{CompareError, Result};
use crate::pipeline::types::StatisticsSummary;
use crate::volume::ScalarVolume;
use ndarray::Axis;
use rayon::prelude::*;

/// Mergeable running accumulator for count, mean, M2, sum, min and max.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunningStatistics {
    count: usize,
    mean: f64,
    m2: f64,
    sum: f64,
    minimum: f64,
    maximum: f64,
}

impl Default for RunningStatistics {
    fn default() -> Self {
        Self {
            count: 0,
            mean: 0.0,
            m2: 0.0,
            sum: 0.0,
            minimum: f64::INFINITY,
            maximum: f64::NEG_INFINITY,
        }
    }
}

impl RunningStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_samples<I>(samples: I) -> Self
    where
        I: IntoIterator<Item = f32>,
    {
        let mut stats = Self::new();
        for sample in samples {
            stats.push(f64::from(sample));
        }
        stats
    }

    pub fn push(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.minimum = self.minimum.min(value);
        self.maximum = self.maximum.max(value);

        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    /// Combine two partials as if their samples had been pushed into one.
    pub fn merge(self, other: Self) -> Self {
        if other.count == 0 {
            return self;
        }
        if self.count == 0 {
            return other;
        }

        let count = self.count + other.count;
        let (n_a, n_b, n) = (self.count as f64, other.count as f64, count as f64);
        let delta = other.mean - self.mean;

        Self {
            count,
            mean: self.mean + delta * n_b / n,
            m2: self.m2 + other.m2 + delta * delta * n_a * n_b / n,
            sum: self.sum + other.sum,
            minimum: self.minimum.min(other.minimum),
            maximum: self.maximum.max(other.maximum),
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// `None` when no samples were pushed.
    pub fn finish(&self) -> Option<StatisticsSummary> {
        if self.count == 0 {
            return None;
        }
        // Rounding can leave m2 slightly negative; NaN must survive
        let variance = self.m2 / self.count as f64;
        let variance = if variance < 0.0 { 0.0 } else { variance };
        Some(StatisticsSummary {
            mean: self.mean,
            minimum: self.minimum,
            maximum: self.maximum,
            sigma: variance.sqrt(),
            variance,
            sum: self.sum,
            count: self.count,
        })
    }
}

/// Mean, min, max and population sigma over every voxel.
///
/// # Errors
///
/// [`CompareError::EmptyVolume`] if any axis of the extent is zero.
pub fn summarize(volume: &ScalarVolume) -> Result<StatisticsSummary> {
    let extent = volume.extent();
    if extent.is_empty() {
        return Err(CompareError::EmptyVolume { extent });
    }

    let view = volume.view();
    let partials: Vec<RunningStatistics> = (0..extent.dims()[0])
        .into_par_iter()
        .map(|slab| RunningStatistics::from_samples(view.index_axis(Axis(0), slab).iter().copied()))
        .collect();

    partials
        .into_iter()
        .fold(RunningStatistics::new(), RunningStatistics::merge)
        .finish()
        .ok_or(CompareError::EmptyVolume { extent })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::Extent;

    #[test]
    fn test_known_values() {
        let volume =
            ScalarVolume::from_vec(Extent::new(2, 2, 2), vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0])
                .unwrap();
        let summary = summarize(&volume).unwrap();
        assert_eq!(summary.count, 8);
        assert_eq!(summary.sum, 40.0);
        assert!((summary.mean - 5.0).abs() < 1e-12);
        assert!((summary.sigma - 2.0).abs() < 1e-12);
        assert!((summary.variance - 4.0).abs() < 1e-12);
        assert_eq!(summary.minimum, 2.0);
        assert_eq!(summary.maximum, 9.0);
    }

    #[test]
    fn test_merge_matches_sequential() {
        let samples: Vec<f32> = (0..100).map(|i| ((i * 37) % 23) as f32 * 0.25).collect();
        let whole = RunningStatistics::from_samples(samples.iter().copied());
        let left = RunningStatistics::from_samples(samples[..41].iter().copied());
        let right = RunningStatistics::from_samples(samples[41..].iter().copied());
        let merged = left.merge(right);

        let a = whole.finish().unwrap();
        let b = merged.finish().unwrap();
        assert_eq!(a.count, b.count);
        assert!((a.mean - b.mean).abs() < 1e-12);
        assert!((a.sigma - b.sigma).abs() < 1e-12);
        assert_eq!(a.minimum, b.minimum);
        assert_eq!(a.maximum, b.maximum);
    }

    #[test]
    fn test_merge_with_empty_is_identity() {
        let stats = RunningStatistics::from_samples([1.0, 2.0, 3.0]);
        assert_eq!(stats.merge(RunningStatistics::new()), stats);
        assert_eq!(RunningStatistics::new().merge(stats), stats);
        assert!(RunningStatistics::new().finish().is_none());
    }

    #[test]
    fn test_empty_volume_rejected() {
        let volume = ScalarVolume::filled(Extent::new(0, 10, 10), 0.0);
        assert_eq!(
            summarize(&volume),
            Err(CompareError::EmptyVolume {
                extent: Extent::new(0, 10, 10)
            })
        );
    }

    #[test]
    fn test_large_offset_is_stable() {
        // E[x^2] - E[x]^2 loses everything here in f32/f64; Welford does not
        let samples: Vec<f32> = (0..1000)
            .map(|i| 1.0e6 + if i % 2 == 0 { 0.5 } else { -0.5 })
            .collect();
        let volume = ScalarVolume::from_vec(Extent::new(10, 10, 10), samples).unwrap();
        let summary = summarize(&volume).unwrap();
        assert!((summary.sigma - 0.5).abs() < 1e-6);
    }
}
