//! Supervisor configuration.
//!
//! `Default` is the reference configuration: Sensor 100 ms / Filter 200 ms /
//! Monitor 400 ms, supervisor every 50 ms, EDF band 4..2, aperiodic job at 5.

use crate::error::{SupervisorError, SupervisorResult};
use crate::job::{JobDescriptor, JobId, JobSnapshot};
use crate::policy::{self, Priority, PriorityBand, SchedulingMode};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Domain action a periodic job performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobRole {
    /// Reads the distance sensor into the shared state.
    SensorAcquisition,
    /// Smooths the raw reading.
    Filter,
    /// Computes utilization and reports status.
    Monitor,
}

impl JobRole {
    /// Every role, each of which needs exactly one job.
    pub const ALL: [JobRole; 3] = [
        JobRole::SensorAcquisition,
        JobRole::Filter,
        JobRole::Monitor,
    ];
}

/// Configuration of one periodic job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobConfig {
    /// Identifier; list order is the EDF tie-break order.
    pub id: JobId,
    /// Display name.
    pub name: String,
    /// Domain action.
    pub role: JobRole,
    /// Period (and implicit deadline) in milliseconds.
    pub period_ms: u64,
    /// Rate Monotonic priority.
    pub static_priority: Priority,
    /// Synthetic processing cost per cycle in milliseconds.
    #[serde(default)]
    pub work_ms: u64,
    /// Whether the job contributes to the utilization estimate.
    #[serde(default = "default_true")]
    pub counts_toward_utilization: bool,
    /// Whether each release logs its jitter.
    #[serde(default = "default_true")]
    pub report_jitter: bool,
}

fn default_true() -> bool {
    true
}

impl JobConfig {
    /// Synthetic processing cost per cycle.
    #[must_use]
    pub fn work(&self) -> Duration {
        Duration::from_millis(self.work_ms)
    }

    fn snapshot(&self) -> JobSnapshot {
        JobSnapshot::idle(self.id, self.period_ms, self.static_priority)
    }
}

/// Complete supervisor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Periodic jobs, one per role.
    pub jobs: Vec<JobConfig>,
    /// Supervisor period in milliseconds.
    pub supervisor_period_ms: u64,
    /// Mode at startup.
    pub initial_mode: SchedulingMode,
    /// Highest level of the EDF band.
    pub edf_band_top: Priority,
    /// Level of the aperiodic job; must preempt every periodic job.
    pub aperiodic_priority: Priority,
    /// Level of the supervisor task.
    pub supervisor_priority: Priority,
    /// Bounded wait on the shared distance lock, in milliseconds.
    pub lock_wait_ms: u64,
    /// Debounce window of the mode-toggle trigger, in milliseconds.
    pub mode_debounce_ms: u64,
    /// Debounce window of the aperiodic trigger, in milliseconds.
    pub aperiodic_debounce_ms: u64,
    /// Utilization above which the overload indicator is lit, in percent.
    pub overload_threshold_pct: f64,
    /// EMA weight of a new reading, in `(0, 1]`.
    pub filter_weight: f64,
    /// Readings above this distance are treated as invalid.
    pub max_range_mm: i32,
    /// Duration of one aperiodic burst, in milliseconds.
    pub aperiodic_burst_ms: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            jobs: vec![
                JobConfig {
                    id: JobId(1),
                    name: "Sensor".to_string(),
                    role: JobRole::SensorAcquisition,
                    period_ms: 100,
                    static_priority: Priority(3),
                    work_ms: 5,
                    counts_toward_utilization: true,
                    report_jitter: true,
                },
                JobConfig {
                    id: JobId(2),
                    name: "Filter".to_string(),
                    role: JobRole::Filter,
                    period_ms: 200,
                    static_priority: Priority(2),
                    work_ms: 10,
                    counts_toward_utilization: true,
                    report_jitter: true,
                },
                JobConfig {
                    id: JobId(3),
                    name: "Monitor".to_string(),
                    role: JobRole::Monitor,
                    period_ms: 400,
                    static_priority: Priority(1),
                    work_ms: 0,
                    counts_toward_utilization: false,
                    report_jitter: false,
                },
            ],
            supervisor_period_ms: 50,
            initial_mode: SchedulingMode::RateMonotonic,
            edf_band_top: Priority(4),
            aperiodic_priority: Priority(5),
            supervisor_priority: Priority(10),
            lock_wait_ms: 10,
            mode_debounce_ms: 500,
            aperiodic_debounce_ms: 200,
            overload_threshold_pct: 60.0,
            filter_weight: 0.3,
            max_range_mm: 8_190,
            aperiodic_burst_ms: 150,
        }
    }
}

impl SupervisorConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the job set is incomplete or inconsistent, or any
    /// numeric parameter is out of range.
    pub fn validate(&self) -> SupervisorResult<()> {
        self.validate_jobs()?;

        if self.supervisor_period_ms == 0 {
            return Err(SupervisorError::invalid_configuration(
                "supervisor_period_ms must be greater than 0",
            ));
        }
        let shortest = self.jobs.iter().map(|j| j.period_ms).min().unwrap_or(0);
        if self.supervisor_period_ms >= shortest {
            return Err(SupervisorError::invalid_configuration(format!(
                "supervisor_period_ms ({}) must be shorter than the shortest job period ({shortest})",
                self.supervisor_period_ms
            )));
        }

        if !self.edf_band().fits(self.jobs.len()) {
            return Err(SupervisorError::invalid_configuration(format!(
                "edf_band_top {} is too low for {} jobs",
                self.edf_band_top.0,
                self.jobs.len()
            )));
        }
        let highest_periodic = self
            .jobs
            .iter()
            .map(|j| j.static_priority)
            .chain(std::iter::once(self.edf_band_top))
            .max()
            .unwrap_or_default();
        if self.aperiodic_priority <= highest_periodic {
            return Err(SupervisorError::invalid_configuration(
                "aperiodic_priority must be above every periodic job priority",
            ));
        }
        if self.supervisor_priority <= self.aperiodic_priority {
            return Err(SupervisorError::invalid_configuration(
                "supervisor_priority must be above aperiodic_priority",
            ));
        }

        if !(self.filter_weight > 0.0 && self.filter_weight <= 1.0) {
            return Err(SupervisorError::invalid_configuration(
                "filter_weight must be in (0, 1]",
            ));
        }
        if !(self.overload_threshold_pct.is_finite() && self.overload_threshold_pct > 0.0) {
            return Err(SupervisorError::invalid_configuration(
                "overload_threshold_pct must be a positive number",
            ));
        }
        if self.max_range_mm <= 0 {
            return Err(SupervisorError::invalid_configuration(
                "max_range_mm must be greater than 0",
            ));
        }
        Ok(())
    }

    fn validate_jobs(&self) -> SupervisorResult<()> {
        if self.jobs.is_empty() {
            return Err(SupervisorError::invalid_configuration(
                "at least one periodic job is required",
            ));
        }

        let mut ids = HashSet::new();
        for job in &self.jobs {
            if job.id.is_reserved() {
                return Err(SupervisorError::invalid_configuration(format!(
                    "job id {} is reserved",
                    job.id
                )));
            }
            if !ids.insert(job.id) {
                return Err(SupervisorError::DuplicateJobId(job.id));
            }
            if job.period_ms == 0 {
                return Err(SupervisorError::invalid_configuration(format!(
                    "job '{}' period_ms must be greater than 0",
                    job.name
                )));
            }
        }

        for role in JobRole::ALL {
            match self.jobs.iter().filter(|j| j.role == role).count() {
                0 => return Err(SupervisorError::MissingRole(role)),
                1 => {}
                _ => {
                    return Err(SupervisorError::invalid_configuration(format!(
                        "more than one job configured for role {role:?}"
                    )));
                }
            }
        }

        let snapshots: Vec<JobSnapshot> = self.jobs.iter().map(JobConfig::snapshot).collect();
        if !policy::is_rate_monotonic_order(&snapshots) {
            let listing: Vec<String> = snapshots
                .iter()
                .map(|j| format!("{}:{}ms->{}", j.id(), j.period(), j.static_priority()))
                .collect();
            return Err(SupervisorError::invalid_configuration(format!(
                "static priorities are not rate monotonic ({})",
                listing.join(", ")
            )));
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration. Missing fields take default values.
    ///
    /// # Errors
    ///
    /// Returns `SupervisorError::ConfigParse` for malformed JSON, or a validation error.
    pub fn from_json_str(text: &str) -> SupervisorResult<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns `SupervisorError::ConfigParse` if serialization fails.
    pub fn to_json_pretty(&self) -> SupervisorResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// The job configured for `role`.
    #[must_use]
    pub fn job_for(&self, role: JobRole) -> Option<&JobConfig> {
        self.jobs.iter().find(|j| j.role == role)
    }

    /// EDF priority band.
    #[must_use]
    pub fn edf_band(&self) -> PriorityBand {
        PriorityBand::new(self.edf_band_top)
    }

    /// Supervisor period.
    #[must_use]
    pub fn supervisor_period(&self) -> Duration {
        Duration::from_millis(self.supervisor_period_ms)
    }

    /// Bounded wait on the shared distance lock.
    #[must_use]
    pub fn lock_wait(&self) -> Duration {
        Duration::from_millis(self.lock_wait_ms)
    }

    /// Mode-toggle debounce window.
    #[must_use]
    pub fn mode_debounce(&self) -> Duration {
        Duration::from_millis(self.mode_debounce_ms)
    }

    /// Aperiodic-release debounce window.
    #[must_use]
    pub fn aperiodic_debounce(&self) -> Duration {
        Duration::from_millis(self.aperiodic_debounce_ms)
    }

    /// Duration of one aperiodic burst.
    #[must_use]
    pub fn aperiodic_burst(&self) -> Duration {
        Duration::from_millis(self.aperiodic_burst_ms)
    }

    /// Create a configuration builder starting from the reference configuration.
    #[must_use]
    pub fn builder() -> SupervisorConfigBuilder {
        SupervisorConfigBuilder::default()
    }
}

/// Builder for `SupervisorConfig`.
#[derive(Debug, Default)]
pub struct SupervisorConfigBuilder {
    config: SupervisorConfig,
}

impl SupervisorConfigBuilder {
    /// Replace the job set.
    #[must_use]
    pub fn jobs(mut self, jobs: Vec<JobConfig>) -> Self {
        self.config.jobs = jobs;
        self
    }

    /// Set the synthetic cost of the job with `role`.
    #[must_use]
    pub fn work_ms(mut self, role: JobRole, ms: u64) -> Self {
        if let Some(job) = self.config.jobs.iter_mut().find(|j| j.role == role) {
            job.work_ms = ms;
        }
        self
    }

    /// Set the initial scheduling mode.
    #[must_use]
    pub fn initial_mode(mut self, mode: SchedulingMode) -> Self {
        self.config.initial_mode = mode;
        self
    }

    /// Set the supervisor period in milliseconds.
    #[must_use]
    pub fn supervisor_period_ms(mut self, ms: u64) -> Self {
        self.config.supervisor_period_ms = ms;
        self
    }

    /// Set the top of the EDF band.
    #[must_use]
    pub fn edf_band_top(mut self, top: Priority) -> Self {
        self.config.edf_band_top = top;
        self
    }

    /// Set the bounded lock wait in milliseconds.
    #[must_use]
    pub fn lock_wait_ms(mut self, ms: u64) -> Self {
        self.config.lock_wait_ms = ms;
        self
    }

    /// Set the debounce windows in milliseconds.
    #[must_use]
    pub fn debounce_ms(mut self, mode_ms: u64, aperiodic_ms: u64) -> Self {
        self.config.mode_debounce_ms = mode_ms;
        self.config.aperiodic_debounce_ms = aperiodic_ms;
        self
    }

    /// Set the overload threshold in percent.
    #[must_use]
    pub fn overload_threshold_pct(mut self, pct: f64) -> Self {
        self.config.overload_threshold_pct = pct;
        self
    }

    /// Set the EMA weight of new readings.
    #[must_use]
    pub fn filter_weight(mut self, weight: f64) -> Self {
        self.config.filter_weight = weight;
        self
    }

    /// Set the aperiodic burst duration in milliseconds.
    #[must_use]
    pub fn aperiodic_burst_ms(mut self, ms: u64) -> Self {
        self.config.aperiodic_burst_ms = ms;
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> SupervisorResult<SupervisorConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(SupervisorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_default_matches_reference_configuration() {
        let config = SupervisorConfig::default();
        let periods: Vec<u64> = config.jobs.iter().map(|j| j.period_ms).collect();
        assert_eq!(periods, vec![100, 200, 400]);
        assert_eq!(config.supervisor_period(), Duration::from_millis(50));
        assert_eq!(config.edf_band().top(), Priority(4));

        let monitor = config.job_for(JobRole::Monitor);
        assert!(monitor.is_some_and(|m| !m.counts_toward_utilization && !m.report_jitter));
    }

    #[test]
    fn test_builder_overrides() -> SupervisorResult<()> {
        let config = SupervisorConfig::builder()
            .initial_mode(SchedulingMode::EarliestDeadlineFirst)
            .work_ms(JobRole::Filter, 40)
            .build()?;
        assert_eq!(config.initial_mode, SchedulingMode::EarliestDeadlineFirst);
        assert_eq!(config.job_for(JobRole::Filter).map(|j| j.work_ms), Some(40));
        Ok(())
    }

    #[test]
    fn test_rejects_empty_jobs() {
        let result = SupervisorConfig::builder().jobs(vec![]).build();
        assert!(matches!(result, Err(SupervisorError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let mut config = SupervisorConfig::default();
        config.jobs[1].id = JobId(1);
        assert!(matches!(
            config.validate(),
            Err(SupervisorError::DuplicateJobId(JobId(1)))
        ));
    }

    #[test]
    fn test_rejects_missing_role() {
        let mut config = SupervisorConfig::default();
        config.jobs[2].role = JobRole::Filter;
        assert!(config.validate().is_err());

        config.jobs.truncate(2);
        assert!(matches!(
            config.validate(),
            Err(SupervisorError::MissingRole(JobRole::Monitor))
        ));
    }

    #[test]
    fn test_rejects_zero_period() {
        let mut config = SupervisorConfig::default();
        config.jobs[0].period_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_non_rate_monotonic_priorities() {
        let mut config = SupervisorConfig::default();
        config.jobs[0].static_priority = Priority(1);
        config.jobs[2].static_priority = Priority(3);
        let err = config.validate();
        assert!(matches!(
            err,
            Err(SupervisorError::InvalidConfiguration(ref msg)) if msg.contains("rate monotonic")
        ));
    }

    #[test]
    fn test_rejects_narrow_band() {
        let result = SupervisorConfig::builder().edf_band_top(Priority(2)).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_aperiodic_below_band() {
        let mut config = SupervisorConfig::default();
        config.aperiodic_priority = Priority(4);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_slow_supervisor() {
        let result = SupervisorConfig::builder().supervisor_period_ms(100).build();
        assert!(result.is_err());
        let result = SupervisorConfig::builder().supervisor_period_ms(0).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_bad_filter_weight() {
        assert!(SupervisorConfig::builder().filter_weight(0.0).build().is_err());
        assert!(SupervisorConfig::builder().filter_weight(1.5).build().is_err());
        assert!(SupervisorConfig::builder().filter_weight(f64::NAN).build().is_err());
        assert!(SupervisorConfig::builder().filter_weight(1.0).build().is_ok());
    }

    #[test]
    fn test_rejects_bad_threshold() {
        assert!(SupervisorConfig::builder().overload_threshold_pct(0.0).build().is_err());
        assert!(
            SupervisorConfig::builder()
                .overload_threshold_pct(f64::INFINITY)
                .build()
                .is_err()
        );
    }

    #[test]
    fn test_json_round_trip_and_partial_override() -> SupervisorResult<()> {
        let json = SupervisorConfig::default().to_json_pretty()?;
        assert_eq!(SupervisorConfig::from_json_str(&json)?, SupervisorConfig::default());

        let partial =
            SupervisorConfig::from_json_str(r#"{ "initial_mode": "edf", "lock_wait_ms": 2 }"#)?;
        assert_eq!(partial.initial_mode, SchedulingMode::EarliestDeadlineFirst);
        assert_eq!(partial.lock_wait(), Duration::from_millis(2));
        assert_eq!(partial.jobs.len(), 3);
        Ok(())
    }

    #[test]
    fn test_json_errors() {
        assert!(matches!(
            SupervisorConfig::from_json_str("{ not json"),
            Err(SupervisorError::ConfigParse(_))
        ));
        assert!(matches!(
            SupervisorConfig::from_json_str(r#"{ "filter_weight": 2.0 }"#),
            Err(SupervisorError::InvalidConfiguration(_))
        ));
    }
}
