//! Scheduling supervisor.
//!
//! Runs at the highest priority with a short period. Each cycle it reads the
//! mode once, computes the assignment with [`policy::assign`], writes every
//! level through the [`PriorityControl`] port and drives the mode indicators.

use crate::error::SupervisorResult;
use crate::indicators::{Indicator, IndicatorSink};
use crate::job::{JobMetrics, JobSnapshot};
use crate::mode::ModeCell;
use crate::policy::{self, Assignment, PriorityBand, SchedulingMode};
use crate::priority::PriorityControl;
use rtsup_timing::{PeriodicRelease, Tick, Timebase};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Periodic priority reassignment.
pub struct Supervisor {
    jobs: Vec<Arc<JobMetrics>>,
    mode: Arc<ModeCell>,
    priorities: Arc<dyn PriorityControl>,
    indicators: Arc<dyn IndicatorSink>,
    clock: Arc<dyn Timebase>,
    band: PriorityBand,
    release: PeriodicRelease,
    applied_mode: Option<SchedulingMode>,
}

impl Supervisor {
    /// Create a supervisor over `jobs`, in configuration order.
    ///
    /// # Errors
    ///
    /// Returns `SupervisorError::Timing` if `period` is zero.
    pub fn new(
        jobs: Vec<Arc<JobMetrics>>,
        mode: Arc<ModeCell>,
        priorities: Arc<dyn PriorityControl>,
        indicators: Arc<dyn IndicatorSink>,
        clock: Arc<dyn Timebase>,
        band: PriorityBand,
        period: Tick,
    ) -> SupervisorResult<Self> {
        let release = PeriodicRelease::new(period, clock.now_ticks())?;
        Ok(Self {
            jobs,
            mode,
            priorities,
            indicators,
            clock,
            band,
            release,
            applied_mode: None,
        })
    }

    /// Reassign priorities for the current tick.
    pub fn reassign(&mut self) -> Vec<Assignment> {
        let now = self.clock.now_ticks();
        self.apply_at(now)
    }

    /// Reassign priorities as of tick `now`.
    pub fn apply_at(&mut self, now: Tick) -> Vec<Assignment> {
        let mode = self.mode.load();
        let snapshots: Vec<JobSnapshot> = self.jobs.iter().map(|job| job.snapshot()).collect();
        let assignments = policy::assign(mode, &snapshots, now, self.band);

        for assignment in &assignments {
            self.priorities.set_priority(assignment.job, assignment.priority);
        }

        let edf = mode == SchedulingMode::EarliestDeadlineFirst;
        self.indicators.set(Indicator::ModeRm, !edf);
        self.indicators.set(Indicator::ModeEdf, edf);

        if self.applied_mode != Some(mode) {
            tracing::info!(mode = %mode, "scheduling mode applied");
            self.applied_mode = Some(mode);
        }
        tracing::trace!(now, ?assignments, "priorities assigned");
        assignments
    }

    /// Wait for the next release and reassign.
    pub fn run_cycle(&mut self) -> Vec<Assignment> {
        self.release.wait_next(self.clock.as_ref());
        self.reassign()
    }

    /// Run cycles until `stop` is set.
    pub fn run(&mut self, stop: &AtomicBool) {
        tracing::info!(period_ms = self.release.period(), "supervisor started");
        while !stop.load(Ordering::Acquire) {
            self.run_cycle();
        }
        tracing::info!(
            cycles = self.release.releases(),
            overruns = self.release.overruns(),
            "supervisor stopped"
        );
    }

    /// Mode applied by the most recent cycle.
    pub fn applied_mode(&self) -> Option<SchedulingMode> {
        self.applied_mode
    }
}

impl fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Supervisor")
            .field("jobs", &self.jobs.len())
            .field("band", &self.band)
            .field("release", &self.release)
            .field("applied_mode", &self.applied_mode)
            .finish_non_exhaustive()
    }
}
