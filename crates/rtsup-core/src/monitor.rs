//! Load monitor action and status reporting.
//!
//! The monitor never takes the distance lock: it reads the lock-free mirror
//! through [`SharedDistance::peek`] and the per-job atomics through
//! [`JobMetrics::snapshot`].

use crate::indicators::{Indicator, IndicatorSink};
use crate::job::{JobDescriptor, JobMetrics, JobSnapshot};
use crate::mode::ModeCell;
use crate::policy::SchedulingMode;
use crate::runner::JobAction;
use crate::shared::{INVALID_READING_MM, SharedDistance};
use parking_lot::RwLock;
use rtsup_timing::TICK_US;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Estimated CPU utilization in percent.
///
/// `sum(exec_time_us / (period_ms * 1000)) * 100` over the jobs that count
/// toward utilization.
pub fn cpu_utilization_pct<J: JobDescriptor>(jobs: &[J]) -> f64 {
    let fraction: f64 = jobs
        .iter()
        .filter(|job| job.counts_toward_utilization() && job.period() > 0)
        .map(|job| job.exec_time_us() as f64 / (job.period().saturating_mul(TICK_US)) as f64)
        .sum();
    fraction * 100.0
}

/// One status snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusReport {
    /// Active mode when the report was taken.
    pub mode: SchedulingMode,
    /// Latest raw reading, `None` when invalid.
    pub raw_mm: Option<i32>,
    /// Smoothed estimate.
    pub filtered_mm: i32,
    /// Estimated utilization in percent.
    pub utilization_pct: f64,
    /// Whether utilization exceeded the overload threshold.
    pub overloaded: bool,
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | raw {} mm | filtered {} mm | cpu {:.1}% | {}",
            self.mode,
            self.raw_mm.unwrap_or(INVALID_READING_MM),
            self.filtered_mm,
            self.utilization_pct,
            if self.overloaded { "OVERLOAD" } else { "ok" }
        )
    }
}

/// Holds the most recent [`StatusReport`].
#[derive(Debug, Default)]
pub struct StatusBoard {
    latest: RwLock<Option<StatusReport>>,
    published: AtomicU64,
}

impl StatusBoard {
    /// Empty board.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the latest report.
    pub fn publish(&self, report: StatusReport) {
        *self.latest.write() = Some(report);
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    /// Latest report, if any has been published.
    pub fn latest(&self) -> Option<StatusReport> {
        *self.latest.read()
    }

    /// Number of reports published.
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}

/// Periodic load monitor.
pub struct LoadMonitor {
    jobs: Vec<Arc<JobMetrics>>,
    shared: Arc<SharedDistance>,
    mode: Arc<ModeCell>,
    indicators: Arc<dyn IndicatorSink>,
    board: Arc<StatusBoard>,
    threshold_pct: f64,
}

impl LoadMonitor {
    /// Create a monitor over `jobs` with the reference 60 % threshold.
    pub fn new(
        jobs: Vec<Arc<JobMetrics>>,
        shared: Arc<SharedDistance>,
        mode: Arc<ModeCell>,
        indicators: Arc<dyn IndicatorSink>,
        board: Arc<StatusBoard>,
    ) -> Self {
        Self {
            jobs,
            shared,
            mode,
            indicators,
            board,
            threshold_pct: 60.0,
        }
    }

    /// Set the overload threshold in percent.
    #[must_use]
    pub fn with_threshold_pct(mut self, threshold_pct: f64) -> Self {
        self.threshold_pct = threshold_pct;
        self
    }

    /// Compute a report without side effects.
    pub fn evaluate(&self) -> StatusReport {
        let snapshots: Vec<JobSnapshot> = self.jobs.iter().map(|job| job.snapshot()).collect();
        let utilization_pct = cpu_utilization_pct(&snapshots);
        let distance = self.shared.peek();
        StatusReport {
            mode: self.mode.load(),
            raw_mm: distance.raw_mm,
            filtered_mm: distance.filtered_mm,
            utilization_pct,
            overloaded: utilization_pct > self.threshold_pct,
        }
    }

    /// Evaluate, drive the overload indicator, log and publish the report.
    pub fn report(&self) -> StatusReport {
        let report = self.evaluate();
        self.indicators.set(Indicator::OverloadAlert, report.overloaded);
        tracing::info!(
            mode = report.mode.short_name(),
            raw_mm = report.raw_mm.unwrap_or(INVALID_READING_MM),
            filtered_mm = report.filtered_mm,
            utilization_pct = report.utilization_pct,
            overloaded = report.overloaded,
            "{report}"
        );
        self.board.publish(report);
        report
    }
}

impl JobAction for LoadMonitor {
    fn execute(&mut self) {
        self.report();
    }
}

impl fmt::Debug for LoadMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadMonitor")
            .field("jobs", &self.jobs.len())
            .field("threshold_pct", &self.threshold_pct)
            .finish_non_exhaustive()
    }
}
