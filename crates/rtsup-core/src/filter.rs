//! Exponential moving-average filter action.

use crate::runner::JobAction;
use crate::shared::SharedDistance;
use rtsup_timing::CostModel;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// One EMA step: `trunc((1 - weight) * filtered + weight * raw)`.
#[must_use]
pub fn ema_update(filtered: i32, raw: i32, weight: f64) -> i32 {
    let blended = (1.0 - weight) * f64::from(filtered) + weight * f64::from(raw);
    blended.trunc() as i32
}

/// Smooths the raw distance into `filtered_mm` once per release.
///
/// A cycle with no valid raw reading leaves the estimate unchanged.
pub struct DistanceFilter {
    shared: Arc<SharedDistance>,
    cost: Arc<dyn CostModel>,
    lock_wait: Duration,
    weight: f64,
    work: Duration,
}

impl DistanceFilter {
    /// Create the action with the reference weight of 0.3.
    pub fn new(shared: Arc<SharedDistance>, cost: Arc<dyn CostModel>) -> Self {
        Self {
            shared,
            cost,
            lock_wait: Duration::from_millis(10),
            weight: 0.3,
            work: Duration::from_millis(10),
        }
    }

    /// Set the bounded lock wait.
    #[must_use]
    pub fn with_lock_wait(mut self, lock_wait: Duration) -> Self {
        self.lock_wait = lock_wait;
        self
    }

    /// Set the weight given to each new reading.
    #[must_use]
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Set the synthetic cost per cycle.
    #[must_use]
    pub fn with_work(mut self, work: Duration) -> Self {
        self.work = work;
        self
    }

    /// Apply one filter step. Returns the estimate after the step, or `None`
    /// when the lock was busy.
    pub fn step(&mut self) -> Option<i32> {
        let weight = self.weight;
        let filtered = self.shared.try_update(self.lock_wait, |state| {
            if let Some(raw) = state.raw_mm {
                state.filtered_mm = ema_update(state.filtered_mm, raw, weight);
            }
            state.filtered_mm
        });
        if filtered.is_none() {
            tracing::debug!("distance lock busy, filter update skipped");
        }

        self.cost.consume(self.work);
        filtered
    }
}

impl JobAction for DistanceFilter {
    fn execute(&mut self) {
        self.step();
    }
}

impl fmt::Debug for DistanceFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DistanceFilter")
            .field("weight", &self.weight)
            .field("lock_wait", &self.lock_wait)
            .field("work", &self.work)
            .finish_non_exhaustive()
    }
}
