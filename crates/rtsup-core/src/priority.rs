//! Priority port into the underlying preemptive executor.
//!
//! The supervisor never schedules anything itself; it only writes priority levels
//! through [`PriorityControl`]. A target executor implements the trait on top of
//! its own task handles. [`PriorityTable`] is the host implementation: it keeps
//! the current level of every registered job so observers and tests can read it.

use crate::job::JobId;
use crate::policy::Priority;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

/// Write access to task priorities.
pub trait PriorityControl: Send + Sync {
    /// Set the priority of `job`. Must be cheap and never block indefinitely.
    fn set_priority(&self, job: JobId, priority: Priority);
}

/// Host priority table with one atomic level per registered job.
#[derive(Debug)]
pub struct PriorityTable {
    entries: Vec<(JobId, AtomicU8)>,
    changes: AtomicU64,
}

impl PriorityTable {
    /// Table for `jobs`, all at level 0, in registration order.
    pub fn new(jobs: impl IntoIterator<Item = JobId>) -> Self {
        Self {
            entries: jobs.into_iter().map(|id| (id, AtomicU8::new(0))).collect(),
            changes: AtomicU64::new(0),
        }
    }

    /// Current level of `job`, if registered.
    pub fn priority_of(&self, job: JobId) -> Option<Priority> {
        self.entry(job)
            .map(|level| Priority(level.load(Ordering::Relaxed)))
    }

    /// Registered jobs ordered from highest to lowest level.
    ///
    /// Equal levels keep registration order.
    pub fn ordering(&self) -> Vec<JobId> {
        let mut levels: Vec<(JobId, u8)> = self
            .entries
            .iter()
            .map(|(id, level)| (*id, level.load(Ordering::Relaxed)))
            .collect();
        levels.sort_by(|a, b| b.1.cmp(&a.1));
        levels.into_iter().map(|(id, _)| id).collect()
    }

    /// Number of writes that actually changed a level.
    pub fn changes(&self) -> u64 {
        self.changes.load(Ordering::Relaxed)
    }

    fn entry(&self, job: JobId) -> Option<&AtomicU8> {
        self.entries
            .iter()
            .find(|(id, _)| *id == job)
            .map(|(_, level)| level)
    }
}

impl PriorityControl for PriorityTable {
    fn set_priority(&self, job: JobId, priority: Priority) {
        let Some(level) = self.entry(job) else {
            tracing::warn!(%job, %priority, "priority set for unregistered job");
            return;
        };

        let previous = level.swap(priority.0, Ordering::Relaxed);
        if previous != priority.0 {
            self.changes.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(%job, from = previous, to = priority.0, "priority changed");
        }
    }
}
