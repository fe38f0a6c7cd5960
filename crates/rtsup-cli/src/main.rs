//! rtsupd - RM/EDF task supervisor host daemon
//!
//! Runs the sensor, filter and monitor jobs on OS threads with a simulated
//! time-of-flight sensor, and takes mode-toggle and aperiodic-load triggers
//! from stdin.

#![deny(static_mut_refs)]
#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

mod error;
mod sensor;
mod triggers;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use crossbeam::channel::RecvTimeoutError;
use rtsup_core::prelude::*;
use rtsup_timing::{BusyWait, MonotonicClock};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::CliError;
use crate::sensor::{HostSensor, SimulatedSensor};
use crate::triggers::Trigger;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    /// Rate Monotonic (fixed priorities)
    Rm,
    /// Earliest Deadline First (dynamic priorities)
    Edf,
}

impl From<ModeArg> for SchedulingMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Rm => SchedulingMode::RateMonotonic,
            ModeArg::Edf => SchedulingMode::EarliestDeadlineFirst,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "rtsupd")]
#[command(about = "Real-time task supervisor with runtime RM/EDF switching")]
#[command(version)]
#[command(long_about = "
rtsupd runs three periodic jobs (sensor acquisition, filter, load monitor), a
priority supervisor and an aperiodic load job on OS threads.

While it runs, type a command and press enter:
  m   toggle between Rate Monotonic and Earliest Deadline First
  a   inject a 150 ms aperiodic load burst
  q   quit
")]
struct Cli {
    /// JSON configuration file (defaults to the reference configuration)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Initial scheduling mode (overrides the config file)
    #[arg(short, long, value_enum)]
    mode: Option<ModeArg>,

    /// Stop after this many seconds instead of waiting for `q`
    #[arg(short, long, value_name = "SECS")]
    duration: Option<u64>,

    /// Run as if the distance sensor was not detected
    #[arg(long)]
    unavailable_sensor: bool,

    /// Seed for the simulated sensor
    #[arg(long)]
    seed: Option<u64>,

    /// Probability that a simulated reading fails
    #[arg(long, default_value_t = 0.05)]
    failure_rate: f64,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    print_config: bool,

    /// Verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("rtsupd={log_level},rtsup_core={log_level},rtsup_timing={log_level}")
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            let exit_code = e.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
            ExitCode::from(exit_code)
        }
    }
}

fn load_config(cli: &Cli) -> Result<SupervisorConfig> {
    let mut config = match &cli.config {
        Some(path) => read_config(path)?,
        None => SupervisorConfig::default(),
    };
    if let Some(mode) = cli.mode {
        config.initial_mode = mode.into();
    }
    config.validate().map_err(CliError::InvalidConfiguration)?;
    Ok(config)
}

fn read_config(path: &Path) -> Result<SupervisorConfig, CliError> {
    let text = std::fs::read_to_string(path).map_err(|source| CliError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;
    SupervisorConfig::from_json_str(&text).map_err(CliError::InvalidConfiguration)
}

fn run(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    if cli.print_config {
        println!("{}", config.to_json_pretty()?);
        return Ok(());
    }

    let sensor = if cli.unavailable_sensor {
        tracing::warn!(
            reading_mm = rtsup_core::INVALID_READING_MM,
            "distance sensor not detected, readings will be invalid"
        );
        HostSensor::Unavailable(UnavailableSensor)
    } else {
        HostSensor::Simulated(
            SimulatedSensor::new(cli.seed).with_failure_rate(cli.failure_rate),
        )
    };

    let priorities = Arc::new(PriorityTable::new(
        config
            .jobs
            .iter()
            .map(|job| job.id)
            .chain([JobId::APERIODIC, JobId::SUPERVISOR]),
    ));
    let collaborators = Collaborators {
        sensor,
        clock: Arc::new(MonotonicClock::new()),
        cost: Arc::new(BusyWait),
        indicators: Arc::new(IndicatorBank::new()),
        priorities: Arc::clone(&priorities) as Arc<dyn PriorityControl>,
    };

    let system = SupervisorSystem::start(config, collaborators).map_err(CliError::Startup)?;
    println!(
        "rtsupd running in {} mode. Commands: m = toggle mode, a = aperiodic load, q = quit",
        system.mode()
    );

    let triggers = triggers::spawn_stdin_reader().map_err(CliError::TriggerReader)?;
    let deadline = cli.duration.map(|secs| Instant::now() + Duration::from_secs(secs));
    let mut stdin_open = true;

    loop {
        let wait = match deadline {
            Some(deadline) => match deadline.checked_duration_since(Instant::now()) {
                Some(remaining) if !remaining.is_zero() => remaining,
                _ => break,
            },
            None => Duration::from_secs(1),
        };

        if !stdin_open {
            std::thread::sleep(wait.min(Duration::from_secs(1)));
            continue;
        }

        match triggers.recv_timeout(wait) {
            Ok(Trigger::ToggleMode) => match system.mode_toggle().on_rising_edge() {
                Some(mode) => println!("mode -> {mode}"),
                None => println!("mode toggle ignored (debounce)"),
            },
            Ok(Trigger::AperiodicLoad) => {
                if system.aperiodic_trigger().on_rising_edge() {
                    println!("aperiodic load released");
                } else {
                    println!("aperiodic trigger ignored (debounce)");
                }
            }
            Ok(Trigger::Quit) => break,
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                tracing::debug!("stdin closed; running until stopped");
                stdin_open = false;
            }
        }
    }

    let final_status = system.latest_status();
    let ordering = priorities.ordering();
    system.shutdown().map_err(CliError::Shutdown)?;

    if let Some(status) = final_status {
        println!("last status: {status}");
    }
    let ordering: Vec<String> = ordering
        .iter()
        .filter(|id| !id.is_reserved())
        .filter_map(|id| priorities.priority_of(*id).map(|p| format!("{id}={p}")))
        .collect();
    println!("final priorities: {}", ordering.join(" "));
    Ok(())
}
