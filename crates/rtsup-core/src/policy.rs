//! Rate Monotonic and Earliest Deadline First priority assignment.
//!
//! Both policies are pure functions of the job descriptors (and, for EDF, the
//! current tick). The supervisor takes snapshots, calls [`assign`], and pushes the
//! result into the priority port.

use crate::job::{JobDescriptor, JobId};
use rtsup_timing::Tick;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Active scheduling discipline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SchedulingMode {
    /// Fixed priorities, shorter period => higher priority.
    #[default]
    #[serde(rename = "rm", alias = "rate_monotonic")]
    RateMonotonic,
    /// Dynamic priorities, nearest absolute deadline => highest priority.
    #[serde(rename = "edf", alias = "earliest_deadline_first")]
    EarliestDeadlineFirst,
}

impl SchedulingMode {
    /// The other mode.
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::RateMonotonic => Self::EarliestDeadlineFirst,
            Self::EarliestDeadlineFirst => Self::RateMonotonic,
        }
    }

    /// Short label.
    #[must_use]
    pub fn short_name(self) -> &'static str {
        match self {
            Self::RateMonotonic => "RM",
            Self::EarliestDeadlineFirst => "EDF",
        }
    }
}

impl fmt::Display for SchedulingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateMonotonic => write!(f, "RM (fixed)"),
            Self::EarliestDeadlineFirst => write!(f, "EDF (dynamic)"),
        }
    }
}

impl FromStr for SchedulingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rm" | "rate_monotonic" => Ok(Self::RateMonotonic),
            "edf" | "earliest_deadline_first" => Ok(Self::EarliestDeadlineFirst),
            other => Err(format!("unknown scheduling mode '{other}'")),
        }
    }
}

/// Scheduler priority level; larger is more urgent.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Priority(pub u8);

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// Contiguous priority levels reserved for the periodic jobs under EDF.
///
/// Rank 0 (earliest deadline) gets `top`, rank 1 gets `top - 1`, and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityBand {
    top: Priority,
}

impl PriorityBand {
    /// Band whose highest level is `top`.
    #[must_use]
    pub fn new(top: Priority) -> Self {
        Self { top }
    }

    /// Highest level of the band.
    #[must_use]
    pub fn top(self) -> Priority {
        self.top
    }

    /// Level for the job at `rank` in deadline order. Saturates at 0.
    #[must_use]
    pub fn level(self, rank: usize) -> Priority {
        let rank = u8::try_from(rank).unwrap_or(u8::MAX);
        Priority(self.top.0.saturating_sub(rank))
    }

    /// Whether `jobs` levels fit without reaching the idle level 0.
    #[must_use]
    pub fn fits(self, jobs: usize) -> bool {
        jobs <= usize::from(self.top.0)
    }
}

/// One priority decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    /// Job the priority applies to.
    pub job: JobId,
    /// Assigned level.
    pub priority: Priority,
    /// Remaining ticks to the job's deadline (EDF only).
    pub deadline_remaining: Option<i64>,
}

/// Rate Monotonic: every job gets its configured static priority.
///
/// Returned in input order. Idempotent; applying it every cycle is safe.
pub fn rate_monotonic<J: JobDescriptor>(jobs: &[J]) -> Vec<Assignment> {
    jobs.iter()
        .map(|job| Assignment {
            job: job.id(),
            priority: job.static_priority(),
            deadline_remaining: None,
        })
        .collect()
}

/// Earliest Deadline First over the band.
///
/// Jobs are ordered by remaining deadline ascending with a stable sort, so equal
/// deadlines keep their input order. Returned in that order, most urgent first.
pub fn earliest_deadline_first<J: JobDescriptor>(
    jobs: &[J],
    now: Tick,
    band: PriorityBand,
) -> Vec<Assignment> {
    let mut ranked: Vec<(i64, JobId)> = jobs
        .iter()
        .map(|job| (job.deadline_remaining(now), job.id()))
        .collect();

    ranked.sort_by_key(|&(remaining, _)| remaining);

    ranked
        .into_iter()
        .enumerate()
        .map(|(rank, (remaining, job))| Assignment {
            job,
            priority: band.level(rank),
            deadline_remaining: Some(remaining),
        })
        .collect()
}

/// Assign priorities according to `mode`.
pub fn assign<J: JobDescriptor>(
    mode: SchedulingMode,
    jobs: &[J],
    now: Tick,
    band: PriorityBand,
) -> Vec<Assignment> {
    match mode {
        SchedulingMode::RateMonotonic => rate_monotonic(jobs),
        SchedulingMode::EarliestDeadlineFirst => earliest_deadline_first(jobs, now, band),
    }
}

/// Whether the static priorities follow the Rate Monotonic rule.
///
/// Every job with a strictly shorter period must have a strictly higher priority.
pub fn is_rate_monotonic_order<J: JobDescriptor>(jobs: &[J]) -> bool {
    jobs.iter().all(|a| {
        jobs.iter()
            .filter(|b| a.period() < b.period())
            .all(|b| a.static_priority() > b.static_priority())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobSnapshot;

    fn reference_jobs() -> [JobSnapshot; 3] {
        [
            JobSnapshot::idle(JobId(1), 100, Priority(3)),
            JobSnapshot::idle(JobId(2), 200, Priority(2)),
            JobSnapshot::idle(JobId(3), 400, Priority(1)),
        ]
    }

    fn order(assignments: &[Assignment]) -> Vec<JobId> {
        assignments.iter().map(|a| a.job).collect()
    }

    #[test]
    fn test_rm_uses_static_priorities() {
        let assignments = rate_monotonic(&reference_jobs());
        let levels: Vec<u8> = assignments.iter().map(|a| a.priority.0).collect();
        assert_eq!(levels, vec![3, 2, 1]);
        assert!(assignments.iter().all(|a| a.deadline_remaining.is_none()));
    }

    #[test]
    fn test_edf_all_just_released_matches_rm_order() {
        let jobs = reference_jobs().map(|j| j.released_at(1_000));
        let assignments =
            earliest_deadline_first(&jobs, 1_000, PriorityBand::new(Priority(4)));

        assert_eq!(order(&assignments), vec![JobId(1), JobId(2), JobId(3)]);
        let levels: Vec<u8> = assignments.iter().map(|a| a.priority.0).collect();
        assert_eq!(levels, vec![4, 3, 2]);
        let remaining: Vec<Option<i64>> =
            assignments.iter().map(|a| a.deadline_remaining).collect();
        assert_eq!(remaining, vec![Some(100), Some(200), Some(400)]);
    }

    #[test]
    fn test_edf_disagrees_with_rm_when_sensor_lags() {
        let [sensor, filter, monitor] = reference_jobs();
        // Filter released at 900 (deadline 1100); the sensor's latest release is
        // 1050 (deadline 1150), so the filter is more urgent at tick 1060.
        let jobs = [
            sensor.released_at(1_050),
            filter.released_at(900),
            monitor.released_at(1_000),
        ];
        let assignments =
            earliest_deadline_first(&jobs, 1_060, PriorityBand::new(Priority(4)));
        assert_eq!(order(&assignments), vec![JobId(2), JobId(1), JobId(3)]);
    }

    #[test]
    fn test_edf_ties_keep_input_order() {
        // Remaining deadlines [5, 5, 3] for [A, B, C]
        let jobs = [
            JobSnapshot::idle(JobId(10), 5, Priority(1)),
            JobSnapshot::idle(JobId(11), 5, Priority(1)),
            JobSnapshot::idle(JobId(12), 3, Priority(1)),
        ];
        let assignments = earliest_deadline_first(&jobs, 0, PriorityBand::new(Priority(4)));
        assert_eq!(order(&assignments), vec![JobId(12), JobId(10), JobId(11)]);
    }

    #[test]
    fn test_edf_keeps_negative_remaining() {
        let jobs = [
            JobSnapshot::idle(JobId(1), 100, Priority(3)).released_at(0),
            JobSnapshot::idle(JobId(2), 200, Priority(2)).released_at(0),
        ];
        let assignments = earliest_deadline_first(&jobs, 150, PriorityBand::new(Priority(4)));
        assert_eq!(assignments[0].job, JobId(1));
        assert_eq!(assignments[0].deadline_remaining, Some(-50));
    }

    #[test]
    fn test_band_levels_saturate() {
        let band = PriorityBand::new(Priority(2));
        assert_eq!(band.level(0), Priority(2));
        assert_eq!(band.level(2), Priority(0));
        assert_eq!(band.level(9), Priority(0));
        assert!(band.fits(2));
        assert!(!band.fits(3));
    }

    #[test]
    fn test_assign_dispatches_on_mode() {
        let jobs = reference_jobs();
        let band = PriorityBand::new(Priority(4));
        assert_eq!(
            assign(SchedulingMode::RateMonotonic, &jobs, 0, band),
            rate_monotonic(&jobs)
        );
        assert_eq!(
            assign(SchedulingMode::EarliestDeadlineFirst, &jobs, 0, band),
            earliest_deadline_first(&jobs, 0, band)
        );
    }

    #[test]
    fn test_rate_monotonic_order_check() {
        assert!(is_rate_monotonic_order(&reference_jobs()));

        let inverted = [
            JobSnapshot::idle(JobId(1), 100, Priority(1)),
            JobSnapshot::idle(JobId(2), 200, Priority(2)),
        ];
        assert!(!is_rate_monotonic_order(&inverted));
    }

    #[test]
    fn test_mode_toggle_and_parse() {
        assert_eq!(
            SchedulingMode::RateMonotonic.toggled(),
            SchedulingMode::EarliestDeadlineFirst
        );
        assert_eq!("EDF".parse::<SchedulingMode>(), Ok(SchedulingMode::EarliestDeadlineFirst));
        assert_eq!("rm".parse::<SchedulingMode>(), Ok(SchedulingMode::RateMonotonic));
        assert!("fifo".parse::<SchedulingMode>().is_err());
        assert_eq!(SchedulingMode::RateMonotonic.to_string(), "RM (fixed)");
    }
}
