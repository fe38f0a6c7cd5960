//! Test doubles for the collaborator ports.

use parking_lot::Mutex;
use rtsup_core::{
    DistanceSensor, Indicator, IndicatorSink, JobId, Priority, PriorityControl, SensorSample,
};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Sensor that replays a fixed list of samples, then repeats a fallback.
#[derive(Debug)]
pub struct ScriptedSensor {
    samples: VecDeque<SensorSample>,
    fallback: SensorSample,
    reads: Arc<AtomicU64>,
}

impl ScriptedSensor {
    /// Replay `samples`; afterwards every read is invalid.
    pub fn new(samples: impl IntoIterator<Item = SensorSample>) -> Self {
        Self {
            samples: samples.into_iter().collect(),
            fallback: SensorSample::invalid(),
            reads: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Replay valid readings of the given distances.
    pub fn from_distances(distances: &[i32]) -> Self {
        Self::new(distances.iter().copied().map(SensorSample::valid))
    }

    /// Sensor that always reports `distance_mm`.
    pub fn constant(distance_mm: i32) -> Self {
        Self::new([]).with_fallback(SensorSample::valid(distance_mm))
    }

    /// Sample returned once the script is exhausted.
    #[must_use]
    pub fn with_fallback(mut self, fallback: SensorSample) -> Self {
        self.fallback = fallback;
        self
    }

    /// Read counter that stays valid after the sensor is moved into a thread.
    pub fn read_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.reads)
    }
}

impl DistanceSensor for ScriptedSensor {
    fn read(&mut self) -> SensorSample {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.samples.pop_front().unwrap_or(self.fallback)
    }
}

/// Indicator sink that records every write.
#[derive(Debug, Default)]
pub struct RecordingIndicators {
    writes: Mutex<Vec<(Indicator, bool)>>,
}

impl RecordingIndicators {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Last value written to `indicator`, `false` if never written.
    pub fn is_on(&self, indicator: Indicator) -> bool {
        self.writes
            .lock()
            .iter()
            .rev()
            .find(|(i, _)| *i == indicator)
            .is_some_and(|(_, on)| *on)
    }

    /// Every write in order.
    pub fn history(&self) -> Vec<(Indicator, bool)> {
        self.writes.lock().clone()
    }

    /// Number of off-to-on transitions of `indicator`.
    pub fn rising_edges(&self, indicator: Indicator) -> usize {
        let mut on = false;
        let mut edges = 0;
        for (_, value) in self.writes.lock().iter().filter(|(i, _)| *i == indicator) {
            if *value && !on {
                edges += 1;
            }
            on = *value;
        }
        edges
    }
}

impl IndicatorSink for RecordingIndicators {
    fn set(&self, indicator: Indicator, on: bool) {
        self.writes.lock().push((indicator, on));
    }
}

/// Priority port that records every write.
#[derive(Debug, Default)]
pub struct RecordingPriorities {
    writes: Mutex<Vec<(JobId, Priority)>>,
}

impl RecordingPriorities {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent level written for `job`.
    pub fn last(&self, job: JobId) -> Option<Priority> {
        self.writes
            .lock()
            .iter()
            .rev()
            .find(|(id, _)| *id == job)
            .map(|(_, priority)| *priority)
    }

    /// Every write in order.
    pub fn history(&self) -> Vec<(JobId, Priority)> {
        self.writes.lock().clone()
    }

    /// Number of writes.
    pub fn writes(&self) -> usize {
        self.writes.lock().len()
    }
}

impl PriorityControl for RecordingPriorities {
    fn set_priority(&self, job: JobId, priority: Priority) {
        self.writes.lock().push((job, priority));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_sensor_replays_then_falls_back() {
        let mut sensor = ScriptedSensor::from_distances(&[100, 200]);
        let reads = sensor.read_counter();
        assert_eq!(sensor.read(), SensorSample::valid(100));
        assert_eq!(sensor.read(), SensorSample::valid(200));
        assert!(!sensor.read().valid);
        assert_eq!(reads.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_rising_edges() {
        let rec = RecordingIndicators::new();
        rec.set(Indicator::Processing, true);
        rec.set(Indicator::Processing, false);
        rec.set(Indicator::ModeRm, true);
        rec.set(Indicator::Processing, true);
        rec.set(Indicator::Processing, true);
        assert_eq!(rec.rising_edges(Indicator::Processing), 2);
        assert!(rec.is_on(Indicator::ModeRm));
        assert!(!rec.is_on(Indicator::OverloadAlert));
    }

    #[test]
    fn test_priorities_last_write_wins() {
        let rec = RecordingPriorities::new();
        rec.set_priority(JobId(1), Priority(3));
        rec.set_priority(JobId(1), Priority(4));
        assert_eq!(rec.last(JobId(1)), Some(Priority(4)));
        assert_eq!(rec.last(JobId(2)), None);
        assert_eq!(rec.writes(), 2);
    }
}
