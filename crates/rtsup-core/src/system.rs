//! Complete running supervisor: one OS thread per job plus the supervisor and
//! the aperiodic job.

use crate::acquisition::SensorAcquisition;
use crate::aperiodic::{AperiodicRunner, ReleaseReceiver, release_slot};
use crate::config::{JobConfig, JobRole, SupervisorConfig};
use crate::error::{SupervisorError, SupervisorResult};
use crate::events::{AperiodicTrigger, ModeToggleHandler};
use crate::filter::DistanceFilter;
use crate::indicators::{Indicator, IndicatorSink};
use crate::job::{JobId, JobMetrics};
use crate::mode::ModeCell;
use crate::monitor::{LoadMonitor, StatusBoard, StatusReport};
use crate::policy::{self, SchedulingMode};
use crate::priority::PriorityControl;
use crate::runner::{JobAction, PeriodicRunner};
use crate::sensor::DistanceSensor;
use crate::shared::{DistanceState, SharedDistance};
use crate::supervisor::Supervisor;
use rtsup_timing::{CostModel, Timebase};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

/// External collaborators a system is assembled from.
pub struct Collaborators<S> {
    /// Distance sensor, moved into the acquisition thread.
    pub sensor: S,
    /// Time source shared by every runner.
    pub clock: Arc<dyn Timebase>,
    /// Synthetic work model.
    pub cost: Arc<dyn CostModel>,
    /// Indicator outputs.
    pub indicators: Arc<dyn IndicatorSink>,
    /// Priority port into the executor.
    pub priorities: Arc<dyn PriorityControl>,
}

impl<S> fmt::Debug for Collaborators<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

/// A running supervisor.
///
/// Dropping the system raises the stop flag without waiting; call
/// [`SupervisorSystem::shutdown`] to join the threads.
pub struct SupervisorSystem {
    config: SupervisorConfig,
    mode: Arc<ModeCell>,
    shared: Arc<SharedDistance>,
    jobs: Vec<Arc<JobMetrics>>,
    board: Arc<StatusBoard>,
    mode_toggle: ModeToggleHandler,
    aperiodic_trigger: AperiodicTrigger,
    stop: Arc<AtomicBool>,
    threads: Vec<(String, JoinHandle<()>)>,
}

impl SupervisorSystem {
    /// Validate `config`, publish the initial priorities and start every thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or a thread cannot be
    /// spawned. Threads already started are stopped and joined before the error
    /// is returned.
    pub fn start<S>(
        config: SupervisorConfig,
        collaborators: Collaborators<S>,
    ) -> SupervisorResult<Self>
    where
        S: DistanceSensor + 'static,
    {
        config.validate()?;
        let (system, collaborators, release_rx) = Self::prepare(config, collaborators);
        system.launch(collaborators, release_rx)
    }

    /// Build the shared state and publish the initial priorities and
    /// indicators. No thread is started.
    fn prepare<S>(
        config: SupervisorConfig,
        collaborators: Collaborators<S>,
    ) -> (Self, Collaborators<S>, ReleaseReceiver) {
        let Collaborators {
            sensor,
            clock,
            cost,
            indicators,
            priorities,
        } = collaborators;

        let mode = Arc::new(ModeCell::new(config.initial_mode));
        let shared = Arc::new(SharedDistance::new());
        let board = Arc::new(StatusBoard::new());
        let stop = Arc::new(AtomicBool::new(false));

        let start_tick = clock.now_ticks();
        let start_us = clock.now_us();
        let jobs: Vec<Arc<JobMetrics>> = config
            .jobs
            .iter()
            .map(|job| {
                let metrics = JobMetrics::new(job);
                metrics.record_release(start_tick, start_us);
                Arc::new(metrics)
            })
            .collect();

        for assignment in policy::rate_monotonic(&jobs) {
            priorities.set_priority(assignment.job, assignment.priority);
        }
        priorities.set_priority(JobId::APERIODIC, config.aperiodic_priority);
        priorities.set_priority(JobId::SUPERVISOR, config.supervisor_priority);
        let edf = config.initial_mode == SchedulingMode::EarliestDeadlineFirst;
        indicators.set(Indicator::ModeRm, !edf);
        indicators.set(Indicator::ModeEdf, edf);
        indicators.set(Indicator::Processing, false);
        indicators.set(Indicator::OverloadAlert, false);

        let (release_tx, release_rx) = release_slot();
        let system = Self {
            mode_toggle: ModeToggleHandler::new(
                Arc::clone(&mode),
                Arc::clone(&clock),
                config.mode_debounce(),
            ),
            aperiodic_trigger: AperiodicTrigger::new(
                release_tx,
                Arc::clone(&clock),
                config.aperiodic_debounce(),
            ),
            config,
            mode,
            shared,
            jobs,
            board,
            stop,
            threads: Vec::new(),
        };

        let collaborators = Collaborators {
            sensor,
            clock,
            cost,
            indicators,
            priorities,
        };
        (system, collaborators, release_rx)
    }

    fn launch<S>(
        mut self,
        collaborators: Collaborators<S>,
        release_rx: ReleaseReceiver,
    ) -> SupervisorResult<Self>
    where
        S: DistanceSensor + 'static,
    {
        if let Err(err) = self.spawn_threads(collaborators, release_rx) {
            self.stop_and_join();
            return Err(err);
        }

        tracing::info!(
            jobs = self.jobs.len(),
            mode = %self.config.initial_mode,
            "supervisor system started"
        );
        Ok(self)
    }

    fn spawn_threads<S>(
        &mut self,
        collaborators: Collaborators<S>,
        release_rx: ReleaseReceiver,
    ) -> SupervisorResult<()>
    where
        S: DistanceSensor + 'static,
    {
        let Collaborators {
            sensor,
            clock,
            cost,
            indicators,
            priorities,
        } = collaborators;

        let mut sensor = Some(sensor);
        for (job_config, metrics) in self.config.jobs.clone().iter().zip(self.jobs.clone()) {
            match job_config.role {
                JobRole::SensorAcquisition => {
                    let Some(sensor) = sensor.take() else {
                        continue;
                    };
                    let action = SensorAcquisition::new(
                        sensor,
                        Arc::clone(&self.shared),
                        Arc::clone(&indicators),
                        Arc::clone(&cost),
                    )
                    .with_lock_wait(self.config.lock_wait())
                    .with_max_range_mm(self.config.max_range_mm)
                    .with_work(job_config.work());
                    self.spawn_periodic(job_config, metrics, action, &clock)?;
                }
                JobRole::Filter => {
                    let action = DistanceFilter::new(Arc::clone(&self.shared), Arc::clone(&cost))
                        .with_lock_wait(self.config.lock_wait())
                        .with_weight(self.config.filter_weight)
                        .with_work(job_config.work());
                    self.spawn_periodic(job_config, metrics, action, &clock)?;
                }
                JobRole::Monitor => {
                    let action = LoadMonitor::new(
                        self.jobs.clone(),
                        Arc::clone(&self.shared),
                        Arc::clone(&self.mode),
                        Arc::clone(&indicators),
                        Arc::clone(&self.board),
                    )
                    .with_threshold_pct(self.config.overload_threshold_pct);
                    self.spawn_periodic(job_config, metrics, action, &clock)?;
                }
            }
        }

        let mut supervisor = Supervisor::new(
            self.jobs.clone(),
            Arc::clone(&self.mode),
            priorities,
            Arc::clone(&indicators),
            Arc::clone(&clock),
            self.config.edf_band(),
            self.config.supervisor_period_ms,
        )?;
        let stop = Arc::clone(&self.stop);
        self.spawn("rtsup-supervisor", move || supervisor.run(&stop))?;

        let mut aperiodic = AperiodicRunner::new(release_rx, indicators, cost)
            .with_burst(self.config.aperiodic_burst());
        let stop = Arc::clone(&self.stop);
        let poll_interval = self.config.supervisor_period();
        self.spawn("rtsup-aperiodic", move || aperiodic.run(&stop, poll_interval))
    }

    fn spawn_periodic<A>(
        &mut self,
        job_config: &JobConfig,
        metrics: Arc<JobMetrics>,
        action: A,
        clock: &Arc<dyn Timebase>,
    ) -> SupervisorResult<()>
    where
        A: JobAction + 'static,
    {
        let mut runner = PeriodicRunner::new(metrics, action, Arc::clone(clock))?
            .with_jitter_reporting(job_config.report_jitter);
        let stop = Arc::clone(&self.stop);
        let name = format!("rtsup-{}", job_config.name.to_lowercase());
        self.spawn(&name, move || runner.run(&stop))
    }

    fn spawn(&mut self, name: &str, body: impl FnOnce() + Send + 'static) -> SupervisorResult<()> {
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(body)
            .map_err(|err| SupervisorError::spawn_failed(name, err))?;
        self.threads.push((name.to_string(), handle));
        Ok(())
    }

    /// Stop every thread at its next suspension point and wait for it.
    ///
    /// # Errors
    ///
    /// Returns `SupervisorError::ThreadPanicked` naming the first thread that
    /// panicked. Every thread is joined regardless.
    pub fn shutdown(mut self) -> SupervisorResult<()> {
        let first_panic = self.stop_and_join();
        tracing::info!("supervisor system stopped");
        match first_panic {
            Some(name) => Err(SupervisorError::thread_panicked(name)),
            None => Ok(()),
        }
    }

    /// Raise the stop flag and join every started thread. Returns the name of
    /// the first thread that panicked.
    fn stop_and_join(&mut self) -> Option<String> {
        self.stop.store(true, Ordering::Release);
        let mut first_panic = None;
        for (name, handle) in std::mem::take(&mut self.threads) {
            if handle.join().is_err() {
                tracing::error!(thread = %name, "thread panicked");
                first_panic.get_or_insert(name);
            }
        }
        first_panic
    }

    /// Mode-toggle trigger.
    pub fn mode_toggle(&self) -> &ModeToggleHandler {
        &self.mode_toggle
    }

    /// Aperiodic release trigger.
    pub fn aperiodic_trigger(&self) -> &AperiodicTrigger {
        &self.aperiodic_trigger
    }

    /// Active scheduling mode.
    pub fn mode(&self) -> SchedulingMode {
        self.mode.load()
    }

    /// Lock-free view of the shared distance state.
    pub fn distance(&self) -> DistanceState {
        self.shared.peek()
    }

    /// Shared distance state.
    pub fn shared(&self) -> &Arc<SharedDistance> {
        &self.shared
    }

    /// Latest status report from the load monitor.
    pub fn latest_status(&self) -> Option<StatusReport> {
        self.board.latest()
    }

    /// Per-job metrics, in configuration order.
    pub fn jobs(&self) -> &[Arc<JobMetrics>] {
        &self.jobs
    }

    /// Configuration the system was started with.
    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// Names of the threads started.
    pub fn thread_names(&self) -> Vec<&str> {
        self.threads.iter().map(|(name, _)| name.as_str()).collect()
    }
}

impl Drop for SupervisorSystem {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
    }
}

impl fmt::Debug for SupervisorSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupervisorSystem")
            .field("mode", &self.mode.load())
            .field("jobs", &self.jobs.len())
            .field("threads", &self.thread_names())
            .field("stopping", &self.stop.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
