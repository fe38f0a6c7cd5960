//! Synthetic workload cost models.
//!
//! Periodic jobs model their CPU cost with a fixed busy-wait. The wait is
//! injected as a `CostModel` so scheduling logic can be tested with a zero-cost
//! stub, or with a virtual-clock model that advances simulated time instead.

use std::time::{Duration, Instant};

/// Consumes a nominal amount of work and reports how long it actually took.
pub trait CostModel: Send + Sync {
    /// Perform `nominal` worth of work. Always runs to completion.
    fn consume(&self, nominal: Duration) -> Duration;
}

/// Spins the CPU for the nominal duration.
///
/// Never yields: the cost is meant to be visible to whatever else wants the core.
#[derive(Debug, Clone, Copy, Default)]
pub struct BusyWait;

impl CostModel for BusyWait {
    fn consume(&self, nominal: Duration) -> Duration {
        let start = Instant::now();
        while start.elapsed() < nominal {
            std::hint::spin_loop();
        }
        start.elapsed()
    }
}

/// Zero-cost stub.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCost;

impl CostModel for NoCost {
    fn consume(&self, _nominal: Duration) -> Duration {
        Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_wait_runs_at_least_nominal() {
        let elapsed = BusyWait.consume(Duration::from_millis(2));
        assert!(elapsed >= Duration::from_millis(2));
    }

    #[test]
    fn test_no_cost_is_free() {
        assert_eq!(NoCost.consume(Duration::from_secs(10)), Duration::ZERO);
    }

    #[test]
    fn test_cost_models_are_object_safe() {
        let models: [Box<dyn CostModel>; 2] = [Box::new(BusyWait), Box::new(NoCost)];
        for model in &models {
            let _ = model.consume(Duration::ZERO);
        }
    }
}
