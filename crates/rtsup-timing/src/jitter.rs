//! Release jitter statistics.
//!
//! Jitter here is signed: `(actual inter-release gap) - (nominal period)`, in
//! microseconds. A positive value is a late release, a negative value means the
//! previous release was itself late and this one caught up.

use std::vec::Vec;

/// Release jitter collection and analysis.
///
/// Tracks:
/// - Total and late releases
/// - Maximum absolute jitter
/// - Running mean square for RMS jitter
/// - Percentiles over a bounded window of recent samples
///
/// # RT-Safety
///
/// - `record` is O(1) amortized
/// - Keeps at most `max_samples` samples, overwriting the oldest
/// - Percentile queries select in place on a reused buffer
#[derive(Debug, Clone)]
pub struct JitterMetrics {
    /// Total number of releases recorded
    pub total_releases: u64,

    /// Releases whose jitter exceeded the late threshold
    pub late_releases: u64,

    /// Maximum observed absolute jitter in microseconds
    pub max_abs_jitter_us: u64,

    /// Last observed jitter sample in microseconds
    pub last_jitter_us: i64,

    /// Running sum of squared jitter for RMS calculation
    jitter_sum_squared: f64,

    /// Jitter above this value counts as a late release
    late_threshold_us: i64,

    /// Recent jitter samples (ring buffer)
    recent_samples: Vec<i64>,

    /// Maximum samples to keep
    max_samples: usize,

    /// Next slot to overwrite once the buffer is full
    write_cursor: usize,

    /// Reused scratch storage for percentile selection
    sorted_scratch: Vec<u64>,
}

impl Default for JitterMetrics {
    fn default() -> Self {
        const DEFAULT_MAX_SAMPLES: usize = 1_024;
        Self::with_capacity(DEFAULT_MAX_SAMPLES)
    }
}

impl JitterMetrics {
    /// Create jitter metrics with the default window.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create jitter metrics with a custom sample window.
    pub fn with_capacity(max_samples: usize) -> Self {
        Self {
            total_releases: 0,
            late_releases: 0,
            max_abs_jitter_us: 0,
            last_jitter_us: 0,
            jitter_sum_squared: 0.0,
            late_threshold_us: crate::LATE_RELEASE_THRESHOLD_US,
            recent_samples: Vec::with_capacity(max_samples),
            max_samples,
            write_cursor: 0,
            sorted_scratch: Vec::with_capacity(max_samples),
        }
    }

    /// Override the late-release threshold.
    #[must_use]
    pub fn with_late_threshold_us(mut self, threshold_us: i64) -> Self {
        self.late_threshold_us = threshold_us;
        self
    }

    /// Record one release's jitter in microseconds.
    pub fn record(&mut self, jitter_us: i64) {
        self.total_releases = self.total_releases.saturating_add(1);

        if jitter_us > self.late_threshold_us {
            self.late_releases = self.late_releases.saturating_add(1);
        }

        self.max_abs_jitter_us = self.max_abs_jitter_us.max(jitter_us.unsigned_abs());
        self.jitter_sum_squared += (jitter_us as f64).powi(2);
        self.last_jitter_us = jitter_us;

        if self.max_samples == 0 {
            return;
        }

        if self.recent_samples.len() < self.max_samples {
            self.recent_samples.push(jitter_us);
            if self.recent_samples.len() == self.max_samples {
                self.write_cursor = 0;
            }
        } else if let Some(slot) = self.recent_samples.get_mut(self.write_cursor) {
            *slot = jitter_us;
            self.write_cursor = (self.write_cursor + 1) % self.max_samples;
        }
    }

    /// Percentile of absolute jitter over the sample window (0.0 to 1.0).
    ///
    /// Returns 0 when no samples have been recorded.
    pub fn percentile_abs_jitter_us(&mut self, percentile: f64) -> u64 {
        if self.recent_samples.is_empty() {
            return 0;
        }

        let percentile = percentile.clamp(0.0, 1.0);

        self.sorted_scratch.clear();
        self.sorted_scratch
            .extend(self.recent_samples.iter().map(|s| s.unsigned_abs()));

        let len = self.sorted_scratch.len();
        let index = ((len as f64 * percentile) as usize).min(len.saturating_sub(1));
        let (_, value, _) = self.sorted_scratch.select_nth_unstable(index);
        *value
    }

    /// p99 absolute jitter in microseconds.
    pub fn p99_abs_jitter_us(&mut self) -> u64 {
        self.percentile_abs_jitter_us(0.99)
    }

    /// p50 absolute jitter in microseconds.
    pub fn p50_abs_jitter_us(&mut self) -> u64 {
        self.percentile_abs_jitter_us(0.50)
    }

    /// Root-mean-square jitter in microseconds.
    pub fn rms_jitter_us(&self) -> f64 {
        if self.total_releases == 0 {
            return 0.0;
        }
        (self.jitter_sum_squared / self.total_releases as f64).sqrt()
    }

    /// Fraction of late releases (0.0 to 1.0).
    pub fn late_release_rate(&self) -> f64 {
        if self.total_releases == 0 {
            0.0
        } else {
            self.late_releases as f64 / self.total_releases as f64
        }
    }

    /// Number of samples currently in the window.
    pub fn sample_count(&self) -> usize {
        self.recent_samples.len()
    }

    /// Reset all metrics.
    pub fn reset(&mut self) {
        self.total_releases = 0;
        self.late_releases = 0;
        self.max_abs_jitter_us = 0;
        self.last_jitter_us = 0;
        self.jitter_sum_squared = 0.0;
        self.recent_samples.clear();
        self.write_cursor = 0;
        self.sorted_scratch.clear();
    }
}
