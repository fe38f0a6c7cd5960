//! Error types for the timing crate.

use thiserror::Error;

/// Timing configuration errors (pre-allocated, `Copy`, safe on the RT path).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[repr(u8)]
pub enum TimingError {
    /// A periodic release was configured with a zero period
    #[error("Release period must be greater than zero")]
    ZeroPeriod = 1,
}

/// Timing result type
pub type TimingResult<T = ()> = Result<T, TimingError>;
