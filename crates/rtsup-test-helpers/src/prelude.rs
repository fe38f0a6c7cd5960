//! Convenience re-exports for common test utilities.

pub use crate::mock::{RecordingIndicators, RecordingPriorities, ScriptedSensor};
pub use crate::must::{must, must_some, must_with};
pub use crate::time::{VirtualClock, VirtualCost};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;
