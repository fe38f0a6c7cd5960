//! Error types for the supervisor.
//!
//! Runtime degradation (invalid readings, lock contention, missed deadlines) is
//! never reported through these types; they cover configuration and lifecycle only.

use crate::config::JobRole;
use crate::job::JobId;
use rtsup_timing::TimingError;
use thiserror::Error;

/// Errors that can occur while configuring, starting or stopping the supervisor.
#[derive(Debug, Clone, Error)]
pub enum SupervisorError {
    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Two jobs share the same identifier.
    #[error("Duplicate job id: {0}")]
    DuplicateJobId(JobId),

    /// The configuration has no job for a required role.
    #[error("No job configured for role {0:?}")]
    MissingRole(JobRole),

    /// Configuration text could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(String),

    /// Timing primitive rejected its parameters.
    #[error(transparent)]
    Timing(#[from] TimingError),

    /// A job thread could not be spawned.
    #[error("Failed to spawn thread '{name}': {reason}")]
    SpawnFailed {
        /// Thread name.
        name: String,
        /// OS error text.
        reason: String,
    },

    /// A job thread panicked before shutdown.
    #[error("Thread '{0}' panicked")]
    ThreadPanicked(String),
}

impl SupervisorError {
    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_configuration(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration(reason.into())
    }

    /// Create a spawn failure error.
    #[must_use]
    pub fn spawn_failed(name: impl Into<String>, reason: impl ToString) -> Self {
        Self::SpawnFailed {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a thread panic error.
    #[must_use]
    pub fn thread_panicked(name: impl Into<String>) -> Self {
        Self::ThreadPanicked(name.into())
    }
}

impl From<serde_json::Error> for SupervisorError {
    fn from(err: serde_json::Error) -> Self {
        Self::ConfigParse(err.to_string())
    }
}

/// A specialized `Result` type for supervisor operations.
pub type SupervisorResult<T> = std::result::Result<T, SupervisorError>;
