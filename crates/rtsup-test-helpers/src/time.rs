//! Virtual time.
//!
//! [`VirtualClock`] only moves when told to. A sleep jumps the clock straight to
//! the wake-up tick, so a runner driven from a single test thread releases
//! exactly on its period with zero jitter. [`VirtualCost`] turns synthetic work
//! into clock advancement, which makes execution times exact.

use rtsup_timing::{CostModel, TICK_US, Tick, Timebase};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

/// Manually driven clock with 1 ms ticks.
#[derive(Debug, Default)]
pub struct VirtualClock {
    now_us: AtomicI64,
    sleeps: AtomicU64,
}

impl VirtualClock {
    /// Clock at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clock starting at `ms` milliseconds.
    pub fn at_ms(ms: i64) -> Self {
        let clock = Self::new();
        clock.set_us(ms * 1_000);
        clock
    }

    /// Shared handle, ready to hand out as `Arc<dyn Timebase>`.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Move time forward by `by`.
    pub fn advance(&self, by: Duration) {
        let us = i64::try_from(by.as_micros()).unwrap_or(i64::MAX);
        self.now_us.fetch_add(us, Ordering::SeqCst);
    }

    /// Move time forward by `ms` milliseconds.
    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }

    /// Set the absolute time in microseconds.
    pub fn set_us(&self, us: i64) {
        self.now_us.store(us, Ordering::SeqCst);
    }

    /// Number of `sleep_until_tick` calls that had to move the clock.
    pub fn sleeps(&self) -> u64 {
        self.sleeps.load(Ordering::SeqCst)
    }
}

impl Timebase for VirtualClock {
    fn now_us(&self) -> i64 {
        self.now_us.load(Ordering::SeqCst)
    }

    fn now_ticks(&self) -> Tick {
        u64::try_from(self.now_us()).unwrap_or(0) / TICK_US
    }

    fn sleep_until_tick(&self, tick: Tick) {
        let target = i64::try_from(tick.saturating_mul(TICK_US)).unwrap_or(i64::MAX);
        if self.now_us.fetch_max(target, Ordering::SeqCst) < target {
            self.sleeps.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Cost model that advances a [`VirtualClock`] by the nominal cost.
#[derive(Debug, Clone)]
pub struct VirtualCost {
    clock: Arc<VirtualClock>,
}

impl VirtualCost {
    /// Cost model driving `clock`.
    pub fn new(clock: Arc<VirtualClock>) -> Self {
        Self { clock }
    }
}

impl CostModel for VirtualCost {
    fn consume(&self, nominal: Duration) -> Duration {
        self.clock.advance(nominal);
        nominal
    }
}
