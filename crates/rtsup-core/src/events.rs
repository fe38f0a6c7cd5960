//! Debounced trigger handlers.
//!
//! # RT Safety
//!
//! `on_rising_edge` and `on_rising_edge_at` touch only atomics and, for the
//! aperiodic trigger, a non-blocking channel send. They never log, allocate
//! or block.

use crate::aperiodic::ReleaseSender;
use crate::mode::ModeCell;
use crate::policy::SchedulingMode;
use rtsup_timing::Timebase;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

/// Accepts an edge only if strictly more than `window` has passed since the
/// last accepted one. The first edge is always accepted.
#[derive(Debug)]
pub struct Debouncer {
    window_us: i64,
    last_accepted_us: AtomicI64,
    accepted: AtomicU64,
    ignored: AtomicU64,
}

impl Debouncer {
    /// Create a debouncer with the given window.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window_us: i64::try_from(window.as_micros()).unwrap_or(i64::MAX),
            last_accepted_us: AtomicI64::new(i64::MIN),
            accepted: AtomicU64::new(0),
            ignored: AtomicU64::new(0),
        }
    }

    /// Decide on an edge observed at `now_us`.
    pub fn accept(&self, now_us: i64) -> bool {
        let last = self.last_accepted_us.load(Ordering::Acquire);
        let accepted = now_us.saturating_sub(last) > self.window_us
            && self
                .last_accepted_us
                .compare_exchange(last, now_us, Ordering::AcqRel, Ordering::Acquire)
                .is_ok();

        if accepted {
            self.accepted.fetch_add(1, Ordering::Relaxed);
        } else {
            self.ignored.fetch_add(1, Ordering::Relaxed);
        }
        accepted
    }

    /// Number of accepted edges.
    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    /// Number of edges rejected as bounce.
    pub fn ignored(&self) -> u64 {
        self.ignored.load(Ordering::Relaxed)
    }
}

/// Flips the scheduling mode on each accepted edge.
pub struct ModeToggleHandler {
    debouncer: Debouncer,
    mode: Arc<ModeCell>,
    clock: Arc<dyn Timebase>,
}

impl ModeToggleHandler {
    /// Create a handler with the given debounce window (500 ms reference).
    pub fn new(mode: Arc<ModeCell>, clock: Arc<dyn Timebase>, debounce: Duration) -> Self {
        Self {
            debouncer: Debouncer::new(debounce),
            mode,
            clock,
        }
    }

    /// Handle an edge now. Returns the new mode if the edge was accepted.
    pub fn on_rising_edge(&self) -> Option<SchedulingMode> {
        self.on_rising_edge_at(self.clock.now_us())
    }

    /// Handle an edge observed at `now_us`.
    pub fn on_rising_edge_at(&self, now_us: i64) -> Option<SchedulingMode> {
        self.debouncer.accept(now_us).then(|| self.mode.toggle())
    }

    /// Debounce counters.
    pub fn debouncer(&self) -> &Debouncer {
        &self.debouncer
    }
}

impl fmt::Debug for ModeToggleHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModeToggleHandler")
            .field("debouncer", &self.debouncer)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

/// Releases the aperiodic job on each accepted edge.
pub struct AperiodicTrigger {
    debouncer: Debouncer,
    sender: ReleaseSender,
    clock: Arc<dyn Timebase>,
}

impl AperiodicTrigger {
    /// Create a trigger with the given debounce window (200 ms reference).
    pub fn new(sender: ReleaseSender, clock: Arc<dyn Timebase>, debounce: Duration) -> Self {
        Self {
            debouncer: Debouncer::new(debounce),
            sender,
            clock,
        }
    }

    /// Handle an edge now. Returns `true` if the edge was accepted.
    ///
    /// An accepted edge while a release is still pending is coalesced into it.
    pub fn on_rising_edge(&self) -> bool {
        self.on_rising_edge_at(self.clock.now_us())
    }

    /// Handle an edge observed at `now_us`.
    pub fn on_rising_edge_at(&self, now_us: i64) -> bool {
        if !self.debouncer.accept(now_us) {
            return false;
        }
        self.sender.signal();
        true
    }

    /// Debounce counters.
    pub fn debouncer(&self) -> &Debouncer {
        &self.debouncer
    }
}

impl fmt::Debug for AperiodicTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AperiodicTrigger")
            .field("debouncer", &self.debouncer)
            .finish_non_exhaustive()
    }
}
