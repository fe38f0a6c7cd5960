//! Threaded system smoke tests on the real clock.

use rtsup_core::prelude::*;
use rtsup_test_helpers::prelude::*;
use rtsup_timing::{MonotonicClock, NoCost};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

struct Harness {
    priorities: Arc<PriorityTable>,
    indicators: Arc<RecordingIndicators>,
}

fn start(
    config: SupervisorConfig,
    sensor: ScriptedSensor,
) -> SupervisorResult<(SupervisorSystem, Harness)> {
    let priorities = Arc::new(PriorityTable::new(
        config
            .jobs
            .iter()
            .map(|job| job.id)
            .chain([JobId::APERIODIC, JobId::SUPERVISOR]),
    ));
    let indicators = Arc::new(RecordingIndicators::new());
    let system = SupervisorSystem::start(
        config,
        Collaborators {
            sensor,
            clock: Arc::new(MonotonicClock::new()),
            cost: Arc::new(NoCost),
            indicators: Arc::clone(&indicators) as Arc<dyn IndicatorSink>,
            priorities: Arc::clone(&priorities) as Arc<dyn PriorityControl>,
        },
    )?;
    Ok((system, Harness { priorities, indicators }))
}

#[test]
fn test_system_runs_and_shuts_down() -> TestResult {
    let sensor = ScriptedSensor::constant(600);
    let reads = sensor.read_counter();
    let (system, harness) = start(SupervisorConfig::default(), sensor)?;

    assert_eq!(system.thread_names().len(), 5);
    assert_eq!(harness.priorities.priority_of(JobId::APERIODIC), Some(Priority(5)));
    assert_eq!(harness.priorities.priority_of(JobId::SUPERVISOR), Some(Priority(10)));
    assert_eq!(harness.priorities.priority_of(JobId(1)), Some(Priority(3)));
    assert!(harness.indicators.is_on(Indicator::ModeRm));

    thread::sleep(Duration::from_millis(550));

    assert!(reads.load(Ordering::SeqCst) >= 2, "sensor should have been read");
    assert_eq!(system.distance().raw_mm, Some(600));
    assert!(system.distance().filtered_mm > 0);
    assert!(system.jobs().iter().all(|job| job.cycles() >= 1));
    let status = must_some(system.latest_status(), "monitor should have reported");
    assert_eq!(status.mode, SchedulingMode::RateMonotonic);
    assert!(!status.overloaded);

    system.shutdown()?;
    Ok(())
}

#[test]
fn test_mode_toggle_reaches_priority_table() -> TestResult {
    let (system, harness) = start(SupervisorConfig::default(), ScriptedSensor::constant(100))?;

    assert_eq!(
        system.mode_toggle().on_rising_edge(),
        Some(SchedulingMode::EarliestDeadlineFirst)
    );
    assert_eq!(system.mode(), SchedulingMode::EarliestDeadlineFirst);
    thread::sleep(Duration::from_millis(150));

    let mut levels: Vec<u8> = system
        .jobs()
        .iter()
        .filter_map(|job| harness.priorities.priority_of(job.id()))
        .map(|p| p.0)
        .collect();
    levels.sort_unstable();
    assert_eq!(levels, vec![2, 3, 4]);
    assert!(harness.indicators.is_on(Indicator::ModeEdf));
    assert!(!harness.indicators.is_on(Indicator::ModeRm));

    // Immediate second press is bounce.
    assert_eq!(system.mode_toggle().on_rising_edge(), None);

    system.shutdown()?;
    Ok(())
}

#[test]
fn test_aperiodic_trigger_runs_burst() -> TestResult {
    let (system, harness) = start(SupervisorConfig::default(), ScriptedSensor::constant(100))?;

    assert!(system.aperiodic_trigger().on_rising_edge());
    thread::sleep(Duration::from_millis(150));
    assert!(harness.indicators.rising_edges(Indicator::OverloadAlert) >= 1);

    system.shutdown()?;
    Ok(())
}

#[test]
fn test_invalid_configuration_is_rejected_before_start() {
    let config = SupervisorConfig {
        filter_weight: 0.0,
        ..SupervisorConfig::default()
    };
    let result = start(config, ScriptedSensor::constant(100));
    assert!(matches!(result, Err(SupervisorError::InvalidConfiguration(_))));
}

#[test]
fn test_unavailable_sensor_degrades_gracefully() -> TestResult {
    let (system, _harness) = start(SupervisorConfig::default(), ScriptedSensor::new([]))?;
    thread::sleep(Duration::from_millis(250));

    let distance = system.distance();
    assert_eq!(distance.raw_mm, None);
    assert_eq!(distance.filtered_mm, 0);

    system.shutdown()?;
    Ok(())
}
