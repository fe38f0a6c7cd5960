//! Host distance sensors.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rtsup_core::{DistanceSensor, SensorSample, UnavailableSensor};

const MIN_DISTANCE_MM: i32 = 50;
const MAX_DISTANCE_MM: i32 = 2_000;

/// Random-walk time-of-flight sensor with occasional failed measurements.
#[derive(Debug)]
pub struct SimulatedSensor {
    rng: StdRng,
    distance_mm: i32,
    step_mm: i32,
    failure_rate: f64,
}

impl SimulatedSensor {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        Self {
            rng,
            distance_mm: 500,
            step_mm: 40,
            failure_rate: 0.05,
        }
    }

    #[must_use]
    pub fn with_failure_rate(mut self, failure_rate: f64) -> Self {
        self.failure_rate = if failure_rate.is_finite() {
            failure_rate.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self
    }
}

impl DistanceSensor for SimulatedSensor {
    fn read(&mut self) -> SensorSample {
        if self.rng.random_bool(self.failure_rate) {
            return SensorSample::invalid();
        }
        let step = self.rng.random_range(-self.step_mm..=self.step_mm);
        self.distance_mm = self
            .distance_mm
            .saturating_add(step)
            .clamp(MIN_DISTANCE_MM, MAX_DISTANCE_MM);
        SensorSample::valid(self.distance_mm)
    }
}

/// Sensor selected on the command line.
#[derive(Debug)]
pub enum HostSensor {
    Simulated(SimulatedSensor),
    Unavailable(UnavailableSensor),
}

impl DistanceSensor for HostSensor {
    fn read(&mut self) -> SensorSample {
        match self {
            Self::Simulated(sensor) => sensor.read(),
            Self::Unavailable(sensor) => sensor.read(),
        }
    }
}
