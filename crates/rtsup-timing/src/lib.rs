//! Timebase, drift-free periodic release and jitter tracking for the rtsup supervisor.
//!
//! This crate holds the timing primitives every periodic job in the supervisor is
//! built on:
//!
//! - **Timebase**: monotonic microsecond clock plus a millisecond scheduler tick
//! - **PeriodicRelease**: absolute release bookkeeping (`last_release + period`)
//!   that never accumulates drift, even after an overrun
//! - **JitterMetrics**: signed jitter samples with percentile and late-release tracking
//! - **CostModel**: injectable synthetic workload (`BusyWait` on hardware, `NoCost` in tests)
//!
//! # RT-Safety Guarantees
//!
//! - **No heap allocations** in `PeriodicRelease::wait_next` or `JitterMetrics::record`
//!   once the ring buffer is filled
//! - **Bounded execution time** for everything except the explicit sleep
//!
//! # Example
//!
//! ```no_run
//! use rtsup_timing::{MonotonicClock, PeriodicRelease, Timebase};
//!
//! let clock = MonotonicClock::new();
//! let mut release = PeriodicRelease::new(100, clock.now_ticks()).expect("non-zero period");
//!
//! loop {
//!     let tick = release.wait_next(&clock);
//!     // Periodic work for the release at `tick`
//!     # let _ = tick;
//! }
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]
#![deny(static_mut_refs)]
#![deny(unused_must_use)]

pub mod clock;
pub mod cost;
pub mod error;
pub mod jitter;
pub mod release;
mod sleep;

pub mod prelude;

pub use clock::{MonotonicClock, Tick, Timebase, tick_delta};
pub use cost::{BusyWait, CostModel, NoCost};
pub use error::{TimingError, TimingResult};
pub use jitter::JitterMetrics;
pub use release::PeriodicRelease;

/// Scheduler tick resolution in microseconds (1 tick = 1 ms).
pub const TICK_US: u64 = 1_000;

/// Jitter beyond this many microseconds is counted as a late release.
///
/// One scheduler tick: a release can legitimately land anywhere inside the tick
/// it was scheduled for.
pub const LATE_RELEASE_THRESHOLD_US: i64 = 1_000;
