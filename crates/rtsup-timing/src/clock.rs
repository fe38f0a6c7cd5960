//! Monotonic timebase with a millisecond scheduler tick.
//!
//! Two clocks are exposed through one trait because the supervisor uses them for
//! different things: the microsecond clock measures jitter and execution time,
//! the tick clock drives releases and EDF deadlines.

use crate::TICK_US;
use crate::sleep::PlatformSleep;
use std::time::{Duration, Instant};

/// Scheduler tick count. Wraps like a hardware tick counter.
pub type Tick = u64;

/// Signed distance from `from` to `to` in ticks.
///
/// Uses wrapping arithmetic so the sign stays correct across a counter wrap,
/// the same way RTOS tick comparisons work.
#[inline]
#[must_use]
pub fn tick_delta(to: Tick, from: Tick) -> i64 {
    to.wrapping_sub(from) as i64
}

/// Source of time and the blocking periodic-release primitive.
///
/// Implementations must be monotonic: `now_us` and `now_ticks` never go backwards.
pub trait Timebase: Send + Sync {
    /// Microseconds since the timebase origin.
    fn now_us(&self) -> i64;

    /// Scheduler ticks since the timebase origin. One tick is [`TICK_US`]
    /// microseconds.
    fn now_ticks(&self) -> Tick;

    /// Block the calling thread until `now_ticks() >= tick`.
    ///
    /// Returns immediately when the tick is already in the past.
    fn sleep_until_tick(&self, tick: Tick);
}

/// Host timebase backed by `std::time::Instant`.
///
/// # RT-Safety
///
/// `now_us` and `now_ticks` are a single `Instant::now()` call. `sleep_until_tick`
/// sleeps the bulk of the interval and busy-spins the tail for precision.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Create a clock with its origin at now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    fn elapsed_us(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_micros()).unwrap_or(u64::MAX)
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Timebase for MonotonicClock {
    fn now_us(&self) -> i64 {
        i64::try_from(self.elapsed_us()).unwrap_or(i64::MAX)
    }

    fn now_ticks(&self) -> Tick {
        self.elapsed_us() / TICK_US
    }

    fn sleep_until_tick(&self, tick: Tick) {
        let offset = Duration::from_micros(tick.saturating_mul(TICK_US));
        let Some(target) = self.origin.checked_add(offset) else {
            return;
        };
        PlatformSleep::new().sleep_until(target);
    }
}
