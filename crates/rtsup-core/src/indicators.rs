//! Indicator output port.
//!
//! Four write-only boolean outputs: two mutually exclusive mode lamps, a
//! processing-activity lamp and an overload alert.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// Indicator outputs driven by the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Indicator {
    /// Lit while Rate Monotonic is active.
    ModeRm,
    /// Lit while Earliest Deadline First is active.
    ModeEdf,
    /// Lit while the sensor acquisition action runs.
    Processing,
    /// Lit on estimated overload or during an aperiodic burst.
    OverloadAlert,
}

impl Indicator {
    /// Every indicator, in output order.
    pub const ALL: [Indicator; 4] = [
        Indicator::ModeRm,
        Indicator::ModeEdf,
        Indicator::Processing,
        Indicator::OverloadAlert,
    ];

    fn index(self) -> usize {
        match self {
            Indicator::ModeRm => 0,
            Indicator::ModeEdf => 1,
            Indicator::Processing => 2,
            Indicator::OverloadAlert => 3,
        }
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Indicator::ModeRm => "mode-rm",
            Indicator::ModeEdf => "mode-edf",
            Indicator::Processing => "processing",
            Indicator::OverloadAlert => "overload-alert",
        };
        f.write_str(label)
    }
}

/// Write-only indicator sink.
pub trait IndicatorSink: Send + Sync {
    /// Drive `indicator` on or off.
    fn set(&self, indicator: Indicator, on: bool);
}

/// In-process indicator bank; logs every transition.
#[derive(Debug, Default)]
pub struct IndicatorBank {
    states: [AtomicBool; 4],
}

impl IndicatorBank {
    /// All indicators off.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state of `indicator`.
    pub fn is_on(&self, indicator: Indicator) -> bool {
        self.states
            .get(indicator.index())
            .is_some_and(|state| state.load(Ordering::Relaxed))
    }
}

impl IndicatorSink for IndicatorBank {
    fn set(&self, indicator: Indicator, on: bool) {
        let Some(state) = self.states.get(indicator.index()) else {
            return;
        };
        if state.swap(on, Ordering::Relaxed) != on {
            tracing::debug!(%indicator, on, "indicator changed");
        }
    }
}
