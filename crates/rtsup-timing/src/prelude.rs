//! Prelude module for common timing types.

pub use crate::clock::{MonotonicClock, Tick, Timebase, tick_delta};
pub use crate::cost::{BusyWait, CostModel, NoCost};
pub use crate::error::{TimingError, TimingResult};
pub use crate::jitter::JitterMetrics;
pub use crate::release::PeriodicRelease;
pub use crate::{LATE_RELEASE_THRESHOLD_US, TICK_US};
