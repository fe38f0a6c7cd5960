//! Aperiodic job: single-slot release mailbox and burst runner.
//!
//! The mailbox is a `bounded(1)` channel. Signals sent while a release is
//! already pending are dropped, so any number of triggers between two takes
//! produce exactly one burst.

use crate::indicators::{Indicator, IndicatorSink};
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TrySendError};
use rtsup_timing::CostModel;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

/// Create a connected sender/receiver pair for one aperiodic job.
pub fn release_slot() -> (ReleaseSender, ReleaseReceiver) {
    let (tx, rx) = channel::bounded(1);
    let coalesced = Arc::new(AtomicU64::new(0));
    (
        ReleaseSender {
            tx,
            coalesced: Arc::clone(&coalesced),
        },
        ReleaseReceiver { rx, coalesced },
    )
}

/// Non-blocking release signal. Cloneable; safe from interrupt-like contexts.
#[derive(Debug, Clone)]
pub struct ReleaseSender {
    tx: Sender<()>,
    coalesced: Arc<AtomicU64>,
}

impl ReleaseSender {
    /// Post a release. Returns `false` if one was already pending or the
    /// receiver is gone. Never blocks.
    pub fn signal(&self) -> bool {
        match self.tx.try_send(()) {
            Ok(()) => true,
            Err(TrySendError::Full(())) => {
                self.coalesced.fetch_add(1, Ordering::Relaxed);
                false
            }
            Err(TrySendError::Disconnected(())) => false,
        }
    }
}

/// Result of waiting on the mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseWait {
    /// A release was taken.
    Released,
    /// The wait ended without a release.
    TimedOut,
    /// Every sender has been dropped.
    Closed,
}

/// Receiving side of the mailbox.
#[derive(Debug)]
pub struct ReleaseReceiver {
    rx: Receiver<()>,
    coalesced: Arc<AtomicU64>,
}

impl ReleaseReceiver {
    /// Block until a release arrives or all senders are gone.
    pub fn wait(&self) -> ReleaseWait {
        match self.rx.recv() {
            Ok(()) => ReleaseWait::Released,
            Err(_) => ReleaseWait::Closed,
        }
    }

    /// Block for at most `timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> ReleaseWait {
        match self.rx.recv_timeout(timeout) {
            Ok(()) => ReleaseWait::Released,
            Err(RecvTimeoutError::Timeout) => ReleaseWait::TimedOut,
            Err(RecvTimeoutError::Disconnected) => ReleaseWait::Closed,
        }
    }

    /// Take a pending release without blocking.
    pub fn try_take(&self) -> bool {
        self.rx.try_recv().is_ok()
    }

    /// Number of signals dropped because a release was already pending.
    pub fn coalesced(&self) -> u64 {
        self.coalesced.load(Ordering::Relaxed)
    }
}

/// Runs one fixed-cost burst per release, with the overload indicator lit.
pub struct AperiodicRunner {
    receiver: ReleaseReceiver,
    indicators: Arc<dyn IndicatorSink>,
    cost: Arc<dyn CostModel>,
    burst: Duration,
    bursts: u64,
}

impl AperiodicRunner {
    /// Create a runner with the reference 150 ms burst.
    pub fn new(
        receiver: ReleaseReceiver,
        indicators: Arc<dyn IndicatorSink>,
        cost: Arc<dyn CostModel>,
    ) -> Self {
        Self {
            receiver,
            indicators,
            cost,
            burst: Duration::from_millis(150),
            bursts: 0,
        }
    }

    /// Set the burst duration.
    #[must_use]
    pub fn with_burst(mut self, burst: Duration) -> Self {
        self.burst = burst;
        self
    }

    /// Run one burst unconditionally. Returns the time it took.
    pub fn run_burst(&mut self) -> Duration {
        tracing::info!(burst_ms = self.burst.as_millis(), "aperiodic load start");
        self.indicators.set(Indicator::OverloadAlert, true);
        let took = self.cost.consume(self.burst);
        self.indicators.set(Indicator::OverloadAlert, false);
        self.bursts = self.bursts.saturating_add(1);
        tracing::info!(took_us = took.as_micros(), "aperiodic load end");
        took
    }

    /// Wait up to `timeout` for a release and run a burst if one arrives.
    pub fn poll(&mut self, timeout: Duration) -> ReleaseWait {
        let outcome = self.receiver.wait_timeout(timeout);
        if outcome == ReleaseWait::Released {
            self.run_burst();
        }
        outcome
    }

    /// Serve releases until `stop` is set or the mailbox closes.
    ///
    /// The stop flag is checked at least once every `poll_interval`.
    pub fn run(&mut self, stop: &AtomicBool, poll_interval: Duration) {
        tracing::info!("aperiodic job started");
        while !stop.load(Ordering::Acquire) {
            if self.poll(poll_interval) == ReleaseWait::Closed {
                break;
            }
        }
        tracing::info!(
            bursts = self.bursts,
            coalesced = self.receiver.coalesced(),
            "aperiodic job stopped"
        );
    }

    /// Number of bursts run.
    pub fn bursts(&self) -> u64 {
        self.bursts
    }
}

impl fmt::Debug for AperiodicRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AperiodicRunner")
            .field("burst", &self.burst)
            .field("bursts", &self.bursts)
            .finish_non_exhaustive()
    }
}
