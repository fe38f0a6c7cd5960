//! Generic periodic job runner.
//!
//! One runner per periodic job. Each cycle:
//!
//! 1. wait for `last_release + period` (drift-free, see [`PeriodicRelease`])
//! 2. measure jitter against the previous release time
//! 3. publish the new release instant into the job's [`JobMetrics`]
//! 4. run the domain action
//! 5. publish the measured execution time

use crate::error::SupervisorResult;
use crate::job::{JobDescriptor, JobMetrics};
use rtsup_timing::{JitterMetrics, PeriodicRelease, TICK_US, Tick, Timebase};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Domain work performed once per release.
pub trait JobAction: Send {
    /// Run one cycle of work. Must not block indefinitely.
    fn execute(&mut self);
}

impl<F: FnMut() + Send> JobAction for F {
    fn execute(&mut self) {
        self()
    }
}

/// Outcome of one runner cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    /// Tick the cycle was released at.
    pub release_tick: Tick,
    /// Deviation of the actual inter-release interval from the period.
    pub jitter_us: i64,
    /// Duration of the domain action in microseconds.
    pub exec_time_us: u64,
    /// Whether the release instant had already passed when the cycle started.
    pub overrun: bool,
}

/// Drives one periodic job.
pub struct PeriodicRunner<A> {
    metrics: Arc<JobMetrics>,
    action: A,
    clock: Arc<dyn Timebase>,
    release: PeriodicRelease,
    jitter: JitterMetrics,
    report_jitter: bool,
}

impl<A: JobAction> PeriodicRunner<A> {
    /// Create a runner whose first release is one period after the job's
    /// recorded release instant.
    ///
    /// # Errors
    ///
    /// Returns `SupervisorError::Timing` if the job period is zero.
    pub fn new(
        metrics: Arc<JobMetrics>,
        action: A,
        clock: Arc<dyn Timebase>,
    ) -> SupervisorResult<Self> {
        let release = PeriodicRelease::new(metrics.period(), metrics.last_release_instant())?;
        Ok(Self {
            metrics,
            action,
            clock,
            release,
            jitter: JitterMetrics::new(),
            report_jitter: true,
        })
    }

    /// Enable or disable per-cycle jitter logging. Jitter is still recorded.
    #[must_use]
    pub fn with_jitter_reporting(mut self, enabled: bool) -> Self {
        self.report_jitter = enabled;
        self
    }

    /// Wait for the next release and run one cycle.
    pub fn run_cycle(&mut self) -> CycleReport {
        let overruns_before = self.release.overruns();
        let release_tick = self.release.wait_next(self.clock.as_ref());
        let now_us = self.clock.now_us();

        let period_us =
            i64::try_from(self.release.period().saturating_mul(TICK_US)).unwrap_or(i64::MAX);
        let jitter_us = now_us
            .saturating_sub(self.metrics.last_release_time_us())
            .saturating_sub(period_us);
        self.jitter.record(jitter_us);
        if self.report_jitter {
            tracing::debug!(job = self.metrics.name(), jitter_us, "released");
        }

        self.metrics.record_release(release_tick, now_us);

        let start_us = self.clock.now_us();
        self.action.execute();
        let exec_time_us =
            u64::try_from(self.clock.now_us().saturating_sub(start_us)).unwrap_or(0);
        self.metrics.record_execution(exec_time_us);

        CycleReport {
            release_tick,
            jitter_us,
            exec_time_us,
            overrun: self.release.overruns() != overruns_before,
        }
    }

    /// Run cycles until `stop` is set. The flag is checked once per release.
    pub fn run(&mut self, stop: &AtomicBool) {
        tracing::info!(
            job = self.metrics.name(),
            period_ms = self.release.period(),
            "periodic job started"
        );
        while !stop.load(Ordering::Acquire) {
            self.run_cycle();
        }
        tracing::info!(
            job = self.metrics.name(),
            releases = self.release.releases(),
            overruns = self.release.overruns(),
            p99_jitter_us = self.jitter.p99_abs_jitter_us(),
            "periodic job stopped"
        );
    }

    /// The job's metrics record.
    pub fn metrics(&self) -> &Arc<JobMetrics> {
        &self.metrics
    }

    /// The domain action.
    pub fn action(&self) -> &A {
        &self.action
    }

    /// Jitter statistics collected so far.
    pub fn jitter(&self) -> &JitterMetrics {
        &self.jitter
    }

    /// Mutable jitter statistics, for percentile queries.
    pub fn jitter_mut(&mut self) -> &mut JitterMetrics {
        &mut self.jitter
    }

    /// Release bookkeeping.
    pub fn release(&self) -> &PeriodicRelease {
        &self.release
    }
}

impl<A> fmt::Debug for PeriodicRunner<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeriodicRunner")
            .field("job", &self.metrics.name())
            .field("release", &self.release)
            .field("report_jitter", &self.report_jitter)
            .finish_non_exhaustive()
    }
}
