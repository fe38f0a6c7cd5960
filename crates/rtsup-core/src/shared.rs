//! Shared distance state.
//!
//! Two writers (sensor acquisition and filter) take the lock with a bounded wait
//! and skip their update when the budget runs out. The load monitor reads a
//! lock-free mirror instead, matching how the status line never contends for the
//! measurement lock.

use parking_lot::{Mutex, MutexGuard};
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};
use std::time::Duration;

/// Value reported for "no valid reading this cycle".
pub const INVALID_READING_MM: i32 = -1;

/// Latest raw reading and its exponentially smoothed estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DistanceState {
    /// Latest accepted reading; `None` when the last acquisition was invalid.
    pub raw_mm: Option<i32>,
    /// Smoothed estimate in millimetres.
    pub filtered_mm: i32,
}

impl DistanceState {
    /// Raw reading with the invalid sentinel substituted for `None`.
    #[must_use]
    pub fn raw_or_sentinel(&self) -> i32 {
        self.raw_mm.unwrap_or(INVALID_READING_MM)
    }
}

/// Distance state protected by an exclusive lock with bounded wait.
#[derive(Debug)]
pub struct SharedDistance {
    state: Mutex<DistanceState>,
    raw_mirror: AtomicI32,
    filtered_mirror: AtomicI32,
    skipped_updates: AtomicU64,
}

impl SharedDistance {
    /// Create state with no reading and a zero estimate.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(DistanceState::default()),
            raw_mirror: AtomicI32::new(INVALID_READING_MM),
            filtered_mirror: AtomicI32::new(0),
            skipped_updates: AtomicU64::new(0),
        }
    }

    /// Run `update` under the lock if it can be taken within `wait`.
    ///
    /// Returns `None` (and counts a skipped update) when the lock stays busy.
    /// Never blocks longer than `wait`.
    pub fn try_update<R>(
        &self,
        wait: Duration,
        update: impl FnOnce(&mut DistanceState) -> R,
    ) -> Option<R> {
        let Some(mut guard) = self.state.try_lock_for(wait) else {
            self.skipped_updates.fetch_add(1, Ordering::Relaxed);
            return None;
        };

        let result = update(&mut guard);
        self.publish(&guard);
        Some(result)
    }

    fn publish(&self, state: &DistanceState) {
        self.raw_mirror
            .store(state.raw_or_sentinel(), Ordering::Relaxed);
        self.filtered_mirror
            .store(state.filtered_mm, Ordering::Relaxed);
    }

    /// Lock-free view of the most recently committed values.
    ///
    /// The two fields are read independently and may come from adjacent updates.
    pub fn peek(&self) -> DistanceState {
        let raw = self.raw_mirror.load(Ordering::Relaxed);
        DistanceState {
            raw_mm: (raw != INVALID_READING_MM).then_some(raw),
            filtered_mm: self.filtered_mirror.load(Ordering::Relaxed),
        }
    }

    /// Take the lock without a time limit.
    ///
    /// Periodic jobs must use [`SharedDistance::try_update`]; this exists for
    /// startup seeding and for holding the lock in contention tests. Writes made
    /// through the guard reach [`SharedDistance::peek`] when it is dropped.
    pub fn lock(&self) -> DistanceGuard<'_> {
        DistanceGuard {
            shared: self,
            guard: self.state.lock(),
        }
    }

    /// Number of updates skipped because the lock was busy.
    pub fn skipped_updates(&self) -> u64 {
        self.skipped_updates.load(Ordering::Relaxed)
    }
}

/// Exclusive access to the distance state; refreshes the lock-free mirror on drop.
pub struct DistanceGuard<'a> {
    shared: &'a SharedDistance,
    guard: MutexGuard<'a, DistanceState>,
}

impl Deref for DistanceGuard<'_> {
    type Target = DistanceState;

    fn deref(&self) -> &DistanceState {
        &self.guard
    }
}

impl DerefMut for DistanceGuard<'_> {
    fn deref_mut(&mut self) -> &mut DistanceState {
        &mut self.guard
    }
}

impl Drop for DistanceGuard<'_> {
    fn drop(&mut self) {
        self.shared.publish(&self.guard);
    }
}

impl std::fmt::Debug for DistanceGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("DistanceGuard").field(&*self.guard).finish()
    }
}

impl Default for SharedDistance {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::mpsc;
    use std::thread;

    const WAIT: Duration = Duration::from_millis(10);

    #[test]
    fn test_update_commits_and_mirrors() {
        let shared = SharedDistance::new();
        let result = shared.try_update(WAIT, |state| {
            state.raw_mm = Some(420);
            state.filtered_mm = 126;
            7
        });

        assert_eq!(result, Some(7));
        assert_eq!(
            shared.peek(),
            DistanceState {
                raw_mm: Some(420),
                filtered_mm: 126
            }
        );
        assert_eq!(shared.skipped_updates(), 0);
    }

    #[test]
    fn test_sentinel_mirrors_as_none() {
        let shared = SharedDistance::new();
        let _ = shared.try_update(WAIT, |state| state.raw_mm = None);
        assert_eq!(shared.peek().raw_mm, None);
        assert_eq!(shared.peek().raw_or_sentinel(), INVALID_READING_MM);
    }

    #[test]
    fn test_writes_through_lock_reach_peek() {
        let shared = SharedDistance::new();
        {
            let mut state = shared.lock();
            state.raw_mm = Some(420);
            state.filtered_mm = 500;
        }

        let locked = *shared.lock();
        assert_eq!(shared.peek(), locked);
        assert_eq!(
            shared.peek(),
            DistanceState {
                raw_mm: Some(420),
                filtered_mm: 500
            }
        );
    }

    #[test]
    fn test_cleared_reading_through_lock_reaches_peek() {
        let shared = SharedDistance::new();
        let _ = shared.try_update(WAIT, |state| state.raw_mm = Some(900));
        shared.lock().raw_mm = None;
        assert_eq!(shared.peek().raw_mm, None);
    }

    #[test]
    fn test_busy_lock_skips_update() {
        let shared = Arc::new(SharedDistance::new());
        let (locked_tx, locked_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        let holder = {
            let shared = Arc::clone(&shared);
            thread::spawn(move || {
                let _guard = shared.lock();
                let _ = locked_tx.send(());
                let _ = release_rx.recv();
            })
        };

        assert!(locked_rx.recv().is_ok());
        let result = shared.try_update(WAIT, |state| state.raw_mm = Some(1));
        assert!(result.is_none());
        assert_eq!(shared.skipped_updates(), 1);

        let _ = release_tx.send(());
        assert!(holder.join().is_ok(), "Thread should not panic");

        assert_eq!(shared.peek().raw_mm, None);
        assert!(shared.try_update(WAIT, |state| state.raw_mm = Some(1)).is_some());
    }
}
