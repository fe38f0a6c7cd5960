//! Distance sensor port.

/// One time-of-flight measurement as reported by the sensor driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorSample {
    /// Measured distance in millimetres. Meaningless when `valid` is false.
    pub distance_mm: i32,
    /// Driver-reported validity of the measurement.
    pub valid: bool,
}

impl SensorSample {
    /// A valid measurement.
    #[must_use]
    pub fn valid(distance_mm: i32) -> Self {
        Self {
            distance_mm,
            valid: true,
        }
    }

    /// A failed or out-of-range measurement.
    #[must_use]
    pub fn invalid() -> Self {
        Self {
            distance_mm: 0,
            valid: false,
        }
    }

    /// The distance if the sample is valid and within `0..=max_range_mm`.
    #[must_use]
    pub fn accepted(self, max_range_mm: i32) -> Option<i32> {
        (self.valid && (0..=max_range_mm).contains(&self.distance_mm))
            .then_some(self.distance_mm)
    }
}

/// Blocking, one-shot distance reads.
pub trait DistanceSensor: Send {
    /// Perform one measurement.
    fn read(&mut self) -> SensorSample;
}

/// Sensor that is absent: every read is invalid.
///
/// Used when the device is not detected at startup; the system keeps running with
/// every reading reported as the sentinel.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableSensor;

impl DistanceSensor for UnavailableSensor {
    fn read(&mut self) -> SensorSample {
        SensorSample::invalid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepted_range() {
        assert_eq!(SensorSample::valid(0).accepted(8_190), Some(0));
        assert_eq!(SensorSample::valid(8_190).accepted(8_190), Some(8_190));
        assert_eq!(SensorSample::valid(8_191).accepted(8_190), None);
        assert_eq!(SensorSample::valid(-3).accepted(8_190), None);
        assert_eq!(SensorSample::invalid().accepted(8_190), None);
    }

    #[test]
    fn test_unavailable_sensor_is_always_invalid() {
        let mut sensor = UnavailableSensor;
        for _ in 0..3 {
            assert!(!sensor.read().valid);
        }
    }
}
