//! Periodic runners driving the real domain actions on virtual time.

use rtsup_core::prelude::*;
use rtsup_core::{DistanceFilter, LoadMonitor, SensorAcquisition, StatusBoard};
use rtsup_test_helpers::prelude::*;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

struct Rig {
    clock: Arc<VirtualClock>,
    cost: Arc<VirtualCost>,
    shared: Arc<SharedDistance>,
    indicators: Arc<RecordingIndicators>,
    config: SupervisorConfig,
}

impl Rig {
    fn new() -> Self {
        let clock = VirtualClock::shared();
        Self {
            cost: Arc::new(VirtualCost::new(Arc::clone(&clock))),
            clock,
            shared: Arc::new(SharedDistance::new()),
            indicators: Arc::new(RecordingIndicators::new()),
            config: SupervisorConfig::default(),
        }
    }

    fn metrics(&self, role: JobRole) -> Arc<JobMetrics> {
        let job = must_some(self.config.job_for(role), "reference role");
        Arc::new(JobMetrics::new(job))
    }

    fn acquisition(&self, sensor: ScriptedSensor) -> SensorAcquisition<ScriptedSensor> {
        SensorAcquisition::new(
            sensor,
            Arc::clone(&self.shared),
            Arc::clone(&self.indicators) as Arc<dyn IndicatorSink>,
            Arc::clone(&self.cost) as Arc<dyn rtsup_timing::CostModel>,
        )
        .with_lock_wait(Duration::from_millis(1))
    }

    fn filter(&self) -> DistanceFilter {
        DistanceFilter::new(
            Arc::clone(&self.shared),
            Arc::clone(&self.cost) as Arc<dyn rtsup_timing::CostModel>,
        )
    }
}

#[test]
fn test_sensor_runner_releases_on_period_with_zero_jitter() -> SupervisorResult<()> {
    let rig = Rig::new();
    let job = rig.metrics(JobRole::SensorAcquisition);
    let action = rig.acquisition(ScriptedSensor::constant(500));
    let mut runner =
        PeriodicRunner::new(Arc::clone(&job), action, Arc::clone(&rig.clock) as _)?;

    for n in 1..=5u64 {
        let report = runner.run_cycle();
        assert_eq!(report.release_tick, n * 100);
        assert_eq!(report.jitter_us, 0);
        assert_eq!(report.exec_time_us, 5_000);
    }
    assert_eq!(job.last_release_instant(), 500);
    assert_eq!(job.exec_time_us(), 5_000);
    assert_eq!(rig.shared.peek().raw_mm, Some(500));
    assert_eq!(rig.indicators.rising_edges(Indicator::Processing), 5);
    assert!(!rig.indicators.is_on(Indicator::Processing));
    Ok(())
}

#[test]
fn test_sensor_and_filter_pipeline() -> SupervisorResult<()> {
    let rig = Rig::new();
    let mut sensor = PeriodicRunner::new(
        rig.metrics(JobRole::SensorAcquisition),
        rig.acquisition(ScriptedSensor::from_distances(&[1_000])),
        Arc::clone(&rig.clock) as _,
    )?;
    let mut filter = PeriodicRunner::new(
        rig.metrics(JobRole::Filter),
        rig.filter(),
        Arc::clone(&rig.clock) as _,
    )?;

    sensor.run_cycle();
    filter.run_cycle();
    assert_eq!(rig.shared.peek().filtered_mm, 300);

    // Script exhausted: the next reading is invalid and the estimate holds.
    sensor.run_cycle();
    assert_eq!(rig.shared.peek().raw_mm, None);
    filter.run_cycle();
    assert_eq!(rig.shared.peek().filtered_mm, 300);
    Ok(())
}

#[test]
fn test_monitor_sees_runner_execution_times() -> SupervisorResult<()> {
    let rig = Rig::new();
    let sensor_job = rig.metrics(JobRole::SensorAcquisition);
    let filter_job = rig.metrics(JobRole::Filter);
    let monitor_job = rig.metrics(JobRole::Monitor);
    let board = Arc::new(StatusBoard::new());

    let mut sensor = PeriodicRunner::new(
        Arc::clone(&sensor_job),
        rig.acquisition(ScriptedSensor::constant(250)),
        Arc::clone(&rig.clock) as _,
    )?;
    let mut filter = PeriodicRunner::new(
        Arc::clone(&filter_job),
        rig.filter(),
        Arc::clone(&rig.clock) as _,
    )?;
    let monitor = LoadMonitor::new(
        vec![sensor_job, filter_job, Arc::clone(&monitor_job)],
        Arc::clone(&rig.shared),
        Arc::new(ModeCell::default()),
        Arc::clone(&rig.indicators) as Arc<dyn IndicatorSink>,
        Arc::clone(&board),
    );
    let mut monitor = PeriodicRunner::new(monitor_job, monitor, Arc::clone(&rig.clock) as _)?
        .with_jitter_reporting(false);

    sensor.run_cycle();
    filter.run_cycle();
    monitor.run_cycle();

    let report = must_some(board.latest(), "monitor published a report");
    assert!((report.utilization_pct - 10.0).abs() < 1e-9);
    assert!(!report.overloaded);
    assert_eq!(report.raw_mm, Some(250));
    Ok(())
}

#[test]
fn test_overloaded_configuration_lights_alert() -> SupervisorResult<()> {
    let mut rig = Rig::new();
    rig.config = SupervisorConfig::builder()
        .work_ms(JobRole::SensorAcquisition, 50)
        .work_ms(JobRole::Filter, 40)
        .build()?;
    let sensor_job = rig.metrics(JobRole::SensorAcquisition);
    let filter_job = rig.metrics(JobRole::Filter);
    let board = Arc::new(StatusBoard::new());

    let mut sensor = PeriodicRunner::new(
        Arc::clone(&sensor_job),
        rig.acquisition(ScriptedSensor::constant(250)).with_work(Duration::from_millis(50)),
        Arc::clone(&rig.clock) as _,
    )?;
    let mut filter = PeriodicRunner::new(
        Arc::clone(&filter_job),
        rig.filter().with_work(Duration::from_millis(40)),
        Arc::clone(&rig.clock) as _,
    )?;
    let monitor = LoadMonitor::new(
        vec![sensor_job, filter_job],
        Arc::clone(&rig.shared),
        Arc::new(ModeCell::default()),
        Arc::clone(&rig.indicators) as Arc<dyn IndicatorSink>,
        Arc::clone(&board),
    );

    sensor.run_cycle();
    filter.run_cycle();
    // 50/100 + 40/200 = 70 %
    let report = monitor.report();
    assert!(report.overloaded);
    assert!(rig.indicators.is_on(Indicator::OverloadAlert));
    Ok(())
}

#[test]
fn test_acquisition_skips_while_lock_is_held() {
    let rig = Rig::new();
    let mut acquisition = rig.acquisition(ScriptedSensor::constant(777));
    assert_eq!(acquisition.acquire(), Some(Some(777)));

    let (locked_tx, locked_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let holder = {
        let shared = Arc::clone(&rig.shared);
        thread::spawn(move || {
            let mut guard = shared.lock();
            guard.raw_mm = Some(1);
            let _ = locked_tx.send(());
            let _ = release_rx.recv();
            guard.raw_mm = Some(777);
        })
    };
    must(locked_rx.recv());

    assert_eq!(acquisition.acquire(), None);
    assert_eq!(rig.shared.skipped_updates(), 1);
    // The mirror only moves on committed updates.
    assert_eq!(rig.shared.peek().raw_mm, Some(777));

    let _ = release_tx.send(());
    assert!(holder.join().is_ok(), "Thread should not panic");
    assert_eq!(acquisition.acquire(), Some(Some(777)));
}

#[test]
fn test_filter_skips_while_lock_is_held() {
    let rig = Rig::new();
    let _ = rig.shared.try_update(Duration::from_millis(1), |state| {
        state.raw_mm = Some(1_000);
        state.filtered_mm = 250;
    });
    let mut filter = rig.filter().with_lock_wait(Duration::from_millis(1));

    let (locked_tx, locked_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let holder = {
        let shared = Arc::clone(&rig.shared);
        thread::spawn(move || {
            let _guard = shared.lock();
            let _ = locked_tx.send(());
            let _ = release_rx.recv();
        })
    };
    must(locked_rx.recv());

    let skipped_before = rig.shared.skipped_updates();
    assert_eq!(filter.step(), None);
    assert_eq!(rig.shared.skipped_updates(), skipped_before + 1);
    assert_eq!(rig.shared.peek().filtered_mm, 250);

    let _ = release_tx.send(());
    assert!(holder.join().is_ok(), "Thread should not panic");
    assert_eq!(rig.shared.lock().filtered_mm, 250);
    // 0.7 * 250 + 0.3 * 1000
    assert_eq!(filter.step(), Some(475));
}
