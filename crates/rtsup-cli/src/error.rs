//! Error types for rtsupd

use rtsup_core::SupervisorError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(#[source] SupervisorError),

    #[error("Failed to start supervisor: {0}")]
    Startup(#[source] SupervisorError),

    #[error("Supervisor did not stop cleanly: {0}")]
    Shutdown(#[source] SupervisorError),

    #[error("Failed to spawn trigger reader: {0}")]
    TriggerReader(#[source] std::io::Error),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::ConfigRead { .. } | Self::InvalidConfiguration(_) => 2,
            Self::Startup(_) | Self::TriggerReader(_) => 3,
            Self::Shutdown(_) => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let config =
            CliError::InvalidConfiguration(SupervisorError::invalid_configuration("x"));
        assert_eq!(config.exit_code(), 2);

        let startup = CliError::Startup(SupervisorError::spawn_failed("rtsup-sensor", "busy"));
        assert_eq!(startup.exit_code(), 3);

        let shutdown = CliError::Shutdown(SupervisorError::thread_panicked("rtsup-filter"));
        assert_eq!(shutdown.exit_code(), 4);
    }
}
