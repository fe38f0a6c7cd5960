//! Prelude for convenient imports.
//!
//! ```rust
//! use rtsup_core::prelude::*;
//! ```

pub use crate::policy;

pub use crate::aperiodic::{AperiodicRunner, ReleaseWait, release_slot};
pub use crate::config::{JobConfig, JobRole, SupervisorConfig};
pub use crate::error::{SupervisorError, SupervisorResult};
pub use crate::events::{AperiodicTrigger, ModeToggleHandler};
pub use crate::indicators::{Indicator, IndicatorBank, IndicatorSink};
pub use crate::job::{JobDescriptor, JobId, JobMetrics, JobSnapshot};
pub use crate::mode::ModeCell;
pub use crate::monitor::{StatusReport, cpu_utilization_pct};
pub use crate::policy::{Assignment, Priority, PriorityBand, SchedulingMode};
pub use crate::priority::{PriorityControl, PriorityTable};
pub use crate::runner::{JobAction, PeriodicRunner};
pub use crate::sensor::{DistanceSensor, SensorSample, UnavailableSensor};
pub use crate::shared::{DistanceState, SharedDistance};
pub use crate::system::{Collaborators, SupervisorSystem};
