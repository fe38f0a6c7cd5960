//! Per-job metrics records.
//!
//! Each periodic job owns one [`JobMetrics`]. Its dynamic fields are written once
//! per cycle by the job's own runner and read by the supervisor and the load
//! monitor, which tolerate values up to one period stale. Every field is an
//! independent relaxed atomic: readers never see a torn value, but may see fields
//! from two adjacent cycles.

use crate::config::JobConfig;
use crate::policy::Priority;
use rtsup_timing::{Tick, tick_delta};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Stable small identifier of a job, used for indexing and EDF tie-breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub u8);

impl JobId {
    /// Reserved identifier of the aperiodic job in the priority table.
    pub const APERIODIC: JobId = JobId(0xFE);

    /// Reserved identifier of the supervisor itself in the priority table.
    pub const SUPERVISOR: JobId = JobId(0xFF);

    /// Whether this id is reserved for a non-periodic task.
    #[must_use]
    pub fn is_reserved(self) -> bool {
        self == Self::APERIODIC || self == Self::SUPERVISOR
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Read-only view of a periodic job used by the scheduling policies.
///
/// Periods and deadlines are in scheduler ticks (milliseconds).
pub trait JobDescriptor {
    /// Job identifier.
    fn id(&self) -> JobId;

    /// Nominal period in ticks.
    fn period(&self) -> Tick;

    /// Relative deadline in ticks; implicit deadlines equal the period.
    fn relative_deadline(&self) -> Tick {
        self.period()
    }

    /// Rate Monotonic priority.
    fn static_priority(&self) -> Priority;

    /// Tick of the most recent release.
    fn last_release_instant(&self) -> Tick;

    /// Duration of the most recently completed execution, in microseconds.
    fn exec_time_us(&self) -> u64;

    /// Whether this job contributes to the CPU utilization estimate.
    fn counts_toward_utilization(&self) -> bool;

    /// Absolute deadline of the current release.
    fn absolute_deadline(&self) -> Tick {
        self.last_release_instant()
            .wrapping_add(self.relative_deadline())
    }

    /// Signed ticks from `now` to the current absolute deadline.
    ///
    /// Negative once the deadline has passed; never clamped.
    fn deadline_remaining(&self, now: Tick) -> i64 {
        tick_delta(self.absolute_deadline(), now)
    }
}

impl<T: JobDescriptor + ?Sized> JobDescriptor for Arc<T> {
    fn id(&self) -> JobId {
        (**self).id()
    }

    fn period(&self) -> Tick {
        (**self).period()
    }

    fn relative_deadline(&self) -> Tick {
        (**self).relative_deadline()
    }

    fn static_priority(&self) -> Priority {
        (**self).static_priority()
    }

    fn last_release_instant(&self) -> Tick {
        (**self).last_release_instant()
    }

    fn exec_time_us(&self) -> u64 {
        (**self).exec_time_us()
    }

    fn counts_toward_utilization(&self) -> bool {
        (**self).counts_toward_utilization()
    }
}

/// Metrics record for one periodic job.
///
/// # RT Safety
///
/// `record_release` and `record_execution` are single relaxed atomic stores.
#[derive(Debug)]
pub struct JobMetrics {
    id: JobId,
    name: String,
    period: Tick,
    static_priority: Priority,
    counts_toward_utilization: bool,
    last_release_instant: AtomicU64,
    last_release_time_us: AtomicI64,
    exec_time_us: AtomicU64,
    cycles: AtomicU64,
}

impl JobMetrics {
    /// Create the record for a configured job.
    #[must_use]
    pub fn new(config: &JobConfig) -> Self {
        Self::from_parts(
            config.id,
            config.name.clone(),
            config.period_ms,
            config.static_priority,
        )
        .with_utilization(config.counts_toward_utilization)
    }

    /// Create a record from its immutable parts. Counts toward utilization by default.
    #[must_use]
    pub fn from_parts(
        id: JobId,
        name: impl Into<String>,
        period: Tick,
        static_priority: Priority,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            period,
            static_priority,
            counts_toward_utilization: true,
            last_release_instant: AtomicU64::new(0),
            last_release_time_us: AtomicI64::new(0),
            exec_time_us: AtomicU64::new(0),
            cycles: AtomicU64::new(0),
        }
    }

    /// Set whether the job contributes to the utilization estimate.
    #[must_use]
    pub fn with_utilization(mut self, counts: bool) -> Self {
        self.counts_toward_utilization = counts;
        self
    }

    /// Human-readable job name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Microsecond timestamp of the most recent release (jitter input).
    pub fn last_release_time_us(&self) -> i64 {
        self.last_release_time_us.load(Ordering::Relaxed)
    }

    /// Number of completed cycles.
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    /// Record a release. Called only by the job's own runner.
    pub fn record_release(&self, tick: Tick, time_us: i64) {
        self.last_release_instant.store(tick, Ordering::Relaxed);
        self.last_release_time_us.store(time_us, Ordering::Relaxed);
    }

    /// Record a completed execution. Called only by the job's own runner.
    pub fn record_execution(&self, exec_time_us: u64) {
        self.exec_time_us.store(exec_time_us, Ordering::Relaxed);
        self.cycles.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current values into a plain snapshot.
    #[must_use]
    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            id: self.id,
            period: self.period,
            static_priority: self.static_priority,
            counts_toward_utilization: self.counts_toward_utilization,
            last_release_instant: self.last_release_instant(),
            exec_time_us: self.exec_time_us(),
        }
    }
}

impl JobDescriptor for JobMetrics {
    fn id(&self) -> JobId {
        self.id
    }

    fn period(&self) -> Tick {
        self.period
    }

    fn static_priority(&self) -> Priority {
        self.static_priority
    }

    fn last_release_instant(&self) -> Tick {
        self.last_release_instant.load(Ordering::Relaxed)
    }

    fn exec_time_us(&self) -> u64 {
        self.exec_time_us.load(Ordering::Relaxed)
    }

    fn counts_toward_utilization(&self) -> bool {
        self.counts_toward_utilization
    }
}

/// Plain copy of a job's scheduling-relevant state at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobSnapshot {
    /// Job identifier.
    pub id: JobId,
    /// Period in ticks.
    pub period: Tick,
    /// Rate Monotonic priority.
    pub static_priority: Priority,
    /// Whether the job counts toward utilization.
    pub counts_toward_utilization: bool,
    /// Tick of the most recent release.
    pub last_release_instant: Tick,
    /// Most recent execution time in microseconds.
    pub exec_time_us: u64,
}

impl JobSnapshot {
    /// Snapshot of a job that has never run.
    #[must_use]
    pub fn idle(id: JobId, period: Tick, static_priority: Priority) -> Self {
        Self {
            id,
            period,
            static_priority,
            counts_toward_utilization: true,
            last_release_instant: 0,
            exec_time_us: 0,
        }
    }

    /// Same snapshot with a different release tick.
    #[must_use]
    pub fn released_at(mut self, tick: Tick) -> Self {
        self.last_release_instant = tick;
        self
    }

    /// Same snapshot with a different execution time.
    #[must_use]
    pub fn with_exec_time_us(mut self, exec_time_us: u64) -> Self {
        self.exec_time_us = exec_time_us;
        self
    }
}

impl JobDescriptor for JobSnapshot {
    fn id(&self) -> JobId {
        self.id
    }

    fn period(&self) -> Tick {
        self.period
    }

    fn static_priority(&self) -> Priority {
        self.static_priority
    }

    fn last_release_instant(&self) -> Tick {
        self.last_release_instant
    }

    fn exec_time_us(&self) -> u64 {
        self.exec_time_us
    }

    fn counts_toward_utilization(&self) -> bool {
        self.counts_toward_utilization
    }
}
