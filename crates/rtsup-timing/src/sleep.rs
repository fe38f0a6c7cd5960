//! High-precision sleep with a busy-spin tail.

use std::time::{Duration, Instant};

/// Below this remaining duration the sleep only spins.
const SPIN_ONLY_BELOW: Duration = Duration::from_micros(100);

/// Portion of the interval that is always spun instead of slept.
const SPIN_TAIL: Duration = Duration::from_micros(80);

/// Sleep implementation shared by the host timebases.
pub(crate) struct PlatformSleep;

impl PlatformSleep {
    pub(crate) fn new() -> Self {
        Self
    }

    /// Sleep until `target`, using the OS sleep for the bulk and spinning the tail.
    pub(crate) fn sleep_until(&self, target: Instant) {
        let now = Instant::now();
        if target <= now {
            return;
        }

        let duration = target.duration_since(now);
        if duration >= SPIN_ONLY_BELOW {
            std::thread::sleep(duration.saturating_sub(SPIN_TAIL));
        }

        while Instant::now() < target {
            std::hint::spin_loop();
        }
    }
}
