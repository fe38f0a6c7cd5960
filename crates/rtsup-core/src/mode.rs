//! Process-wide scheduling mode cell.
//!
//! Single writer (the mode-toggle handler), many readers (supervisor, monitor).
//! Readers may see the previous mode for up to one of their own periods.

use crate::policy::SchedulingMode;
use std::sync::atomic::{AtomicU8, Ordering};

const RM: u8 = 0;
const EDF: u8 = 1;

/// Shared, lock-free holder of the active [`SchedulingMode`].
#[derive(Debug)]
pub struct ModeCell {
    mode: AtomicU8,
}

impl ModeCell {
    /// Create a cell holding `initial`.
    #[must_use]
    pub fn new(initial: SchedulingMode) -> Self {
        Self {
            mode: AtomicU8::new(encode(initial)),
        }
    }

    /// Current mode.
    pub fn load(&self) -> SchedulingMode {
        decode(self.mode.load(Ordering::Acquire))
    }

    /// Replace the mode.
    pub fn store(&self, mode: SchedulingMode) {
        self.mode.store(encode(mode), Ordering::Release);
    }

    /// Flip the mode and return the new value. Lock-free, safe from interrupt context.
    pub fn toggle(&self) -> SchedulingMode {
        let previous = self.mode.fetch_xor(1, Ordering::AcqRel);
        decode(previous).toggled()
    }
}

impl Default for ModeCell {
    fn default() -> Self {
        Self::new(SchedulingMode::default())
    }
}

fn encode(mode: SchedulingMode) -> u8 {
    match mode {
        SchedulingMode::RateMonotonic => RM,
        SchedulingMode::EarliestDeadlineFirst => EDF,
    }
}

fn decode(raw: u8) -> SchedulingMode {
    if raw & 1 == EDF {
        SchedulingMode::EarliestDeadlineFirst
    } else {
        SchedulingMode::RateMonotonic
    }
}
