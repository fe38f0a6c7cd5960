//! Drift-free periodic release.
//!
//! Every release instant is computed from the previous release instant, never from
//! the time the job actually woke or finished. An overrun therefore shortens the
//! next wait instead of shifting every later release.

use crate::clock::{Tick, Timebase, tick_delta};
use crate::error::{TimingError, TimingResult};

/// Absolute periodic release bookkeeping for one job.
///
/// # RT-Safety
///
/// `wait_next` is O(1) and allocation-free; the only blocking is the timebase sleep.
///
/// # Example
///
/// ```
/// use rtsup_timing::PeriodicRelease;
///
/// let release = PeriodicRelease::new(100, 0).expect("non-zero period");
/// assert_eq!(release.next_release(), 100);
/// ```
#[derive(Debug, Clone)]
pub struct PeriodicRelease {
    /// Period in ticks
    period: Tick,

    /// Tick of the most recent release (or the start tick before the first one)
    last_release: Tick,

    /// Number of releases performed
    releases: u64,

    /// Releases whose target tick had already passed when `wait_next` was called
    overruns: u64,
}

impl PeriodicRelease {
    /// Create a release schedule whose first release is `start + period`.
    ///
    /// # Errors
    ///
    /// Returns `TimingError::ZeroPeriod` if `period` is zero.
    pub fn new(period: Tick, start: Tick) -> TimingResult<Self> {
        if period == 0 {
            return Err(TimingError::ZeroPeriod);
        }
        Ok(Self {
            period,
            last_release: start,
            releases: 0,
            overruns: 0,
        })
    }

    /// Block until the next release instant and return it.
    ///
    /// If the instant has already passed (the previous cycle overran) this returns
    /// without blocking, and the schedule still advances by exactly one period.
    pub fn wait_next(&mut self, clock: &dyn Timebase) -> Tick {
        let next = self.next_release();
        let now = clock.now_ticks();

        if tick_delta(next, now) > 0 {
            clock.sleep_until_tick(next);
        } else {
            self.overruns = self.overruns.saturating_add(1);
            tracing::trace!(
                target_tick = next,
                now_tick = now,
                "release instant already passed"
            );
        }

        self.last_release = next;
        self.releases = self.releases.saturating_add(1);
        next
    }

    /// Tick of the upcoming release.
    #[inline]
    #[must_use]
    pub fn next_release(&self) -> Tick {
        self.last_release.wrapping_add(self.period)
    }

    /// Tick of the most recent release.
    #[inline]
    pub fn last_release(&self) -> Tick {
        self.last_release
    }

    /// Period in ticks.
    #[inline]
    pub fn period(&self) -> Tick {
        self.period
    }

    /// Number of releases performed so far.
    #[inline]
    pub fn releases(&self) -> u64 {
        self.releases
    }

    /// Number of releases that were already due when requested.
    #[inline]
    pub fn overruns(&self) -> u64 {
        self.overruns
    }
}
