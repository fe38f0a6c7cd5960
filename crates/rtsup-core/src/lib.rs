//! # rtsup-core
//!
//! Scheduling-policy engine for a small real-time task supervisor that switches a
//! fixed set of periodic jobs between Rate Monotonic (RM) and Earliest Deadline
//! First (EDF) priority assignment at runtime.
//!
//! ## Architecture
//!
//! - [`job`] - Per-job metrics records, written by the job's own runner
//! - [`policy`] - Pure RM/EDF priority assignment
//! - [`runner`] - Generic periodic job runner (release, jitter, action, execution time)
//! - [`acquisition`], [`filter`], [`monitor`] - The three periodic domain actions
//! - [`shared`] - Shared distance state behind a bounded-wait lock
//! - [`events`] - Debounced mode-toggle and aperiodic-release handlers
//! - [`aperiodic`] - Single-slot release mailbox and the aperiodic burst runner
//! - [`supervisor`] - Periodic priority reassignment
//! - [`system`] - Thread wiring for a complete running supervisor
//! - [`sensor`], [`indicators`], [`priority`] - Ports to external collaborators
//!
//! ## RT Safety Notes
//!
//! Event handlers (`ModeToggleHandler::on_rising_edge`,
//! `AperiodicTrigger::on_rising_edge`) only touch atomics and a non-blocking
//! channel send, so they are safe to call from interrupt-like contexts.
//! The sensor and filter jobs never wait on the shared state longer than the
//! configured lock budget.
//!
//! ## Example
//!
//! ```rust
//! use rtsup_core::prelude::*;
//!
//! let config = SupervisorConfig::default();
//! let jobs: Vec<JobSnapshot> = config
//!     .jobs
//!     .iter()
//!     .map(|job| JobMetrics::new(job).snapshot())
//!     .collect();
//!
//! let order = policy::assign(
//!     SchedulingMode::RateMonotonic,
//!     &jobs,
//!     0,
//!     config.edf_band(),
//! );
//! assert_eq!(order[0].priority, Priority(3));
//! ```

#![deny(
    unsafe_op_in_unsafe_fn,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::panic,
    missing_docs,
    missing_debug_implementations
)]
#![warn(clippy::pedantic)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod acquisition;
pub mod aperiodic;
pub mod config;
pub mod error;
pub mod events;
pub mod filter;
pub mod indicators;
pub mod job;
pub mod mode;
pub mod monitor;
pub mod policy;
pub mod priority;
pub mod runner;
pub mod sensor;
pub mod shared;
pub mod supervisor;
pub mod system;

pub mod prelude;

pub use acquisition::SensorAcquisition;
pub use aperiodic::{AperiodicRunner, ReleaseReceiver, ReleaseSender, ReleaseWait, release_slot};
pub use config::{JobConfig, JobRole, SupervisorConfig, SupervisorConfigBuilder};
pub use error::{SupervisorError, SupervisorResult};
pub use events::{AperiodicTrigger, Debouncer, ModeToggleHandler};
pub use filter::{DistanceFilter, ema_update};
pub use indicators::{Indicator, IndicatorBank, IndicatorSink};
pub use job::{JobDescriptor, JobId, JobMetrics, JobSnapshot};
pub use mode::ModeCell;
pub use monitor::{LoadMonitor, StatusBoard, StatusReport, cpu_utilization_pct};
pub use policy::{Assignment, Priority, PriorityBand, SchedulingMode};
pub use priority::{PriorityControl, PriorityTable};
pub use runner::{CycleReport, JobAction, PeriodicRunner};
pub use sensor::{DistanceSensor, SensorSample, UnavailableSensor};
pub use shared::{DistanceGuard, DistanceState, INVALID_READING_MM, SharedDistance};
pub use supervisor::Supervisor;
pub use system::{Collaborators, SupervisorSystem};
