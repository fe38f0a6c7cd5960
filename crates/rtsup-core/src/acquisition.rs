//! Sensor acquisition action.

use crate::indicators::{Indicator, IndicatorSink};
use crate::runner::JobAction;
use crate::sensor::DistanceSensor;
use crate::shared::SharedDistance;
use rtsup_timing::CostModel;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Reads the distance sensor into the shared state once per release.
///
/// The processing indicator is lit for the whole action. The read happens with
/// the shared lock held; if the lock cannot be taken within the budget the
/// reading for this cycle is dropped.
pub struct SensorAcquisition<S> {
    sensor: S,
    shared: Arc<SharedDistance>,
    indicators: Arc<dyn IndicatorSink>,
    cost: Arc<dyn CostModel>,
    lock_wait: Duration,
    max_range_mm: i32,
    work: Duration,
}

impl<S: DistanceSensor> SensorAcquisition<S> {
    /// Create the action.
    pub fn new(
        sensor: S,
        shared: Arc<SharedDistance>,
        indicators: Arc<dyn IndicatorSink>,
        cost: Arc<dyn CostModel>,
    ) -> Self {
        Self {
            sensor,
            shared,
            indicators,
            cost,
            lock_wait: Duration::from_millis(10),
            max_range_mm: 8_190,
            work: Duration::from_millis(5),
        }
    }

    /// Set the bounded lock wait.
    #[must_use]
    pub fn with_lock_wait(mut self, lock_wait: Duration) -> Self {
        self.lock_wait = lock_wait;
        self
    }

    /// Set the largest distance accepted as valid.
    #[must_use]
    pub fn with_max_range_mm(mut self, max_range_mm: i32) -> Self {
        self.max_range_mm = max_range_mm;
        self
    }

    /// Set the synthetic cost per cycle.
    #[must_use]
    pub fn with_work(mut self, work: Duration) -> Self {
        self.work = work;
        self
    }

    /// Perform one acquisition. Returns the value written, or `None` if the
    /// lock was busy and nothing was written.
    pub fn acquire(&mut self) -> Option<Option<i32>> {
        self.indicators.set(Indicator::Processing, true);

        let max_range_mm = self.max_range_mm;
        let written = self.shared.try_update(self.lock_wait, |state| {
            state.raw_mm = self.sensor.read().accepted(max_range_mm);
            state.raw_mm
        });
        match written {
            Some(None) => tracing::trace!("invalid distance reading"),
            None => tracing::debug!("distance lock busy, sensor update skipped"),
            Some(Some(_)) => {}
        }

        self.cost.consume(self.work);
        self.indicators.set(Indicator::Processing, false);
        written
    }
}

impl<S: DistanceSensor> JobAction for SensorAcquisition<S> {
    fn execute(&mut self) {
        self.acquire();
    }
}

impl<S> fmt::Debug for SensorAcquisition<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SensorAcquisition")
            .field("lock_wait", &self.lock_wait)
            .field("max_range_mm", &self.max_range_mm)
            .field("work", &self.work)
            .finish_non_exhaustive()
    }
}
