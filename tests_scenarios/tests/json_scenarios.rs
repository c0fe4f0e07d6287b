//! JSON Scenario Tests
//!
//! Scenarios and audit trails are plain serde data, so a recorded run can
//! be stored, reloaded and replayed with identical results.

use core_types::{Pid, SchedulingAlgorithm};
use kernel_api::{render_outcome, KernelEvent};
use sim_kernel::test_utils::kernel_with;
use sim_kernel::{KernelConfig, ScheduleEvent};
use tests_scenarios::{mixed_workload, run_checked};

const PRIORITY_SCENARIO: &str = r#"[
    {"event": "process_arrived", "pid": 1, "priority": 5, "process_type": "Foreground", "memory_needed": 2097152},
    {"event": "process_arrived", "pid": 2, "priority": 1, "process_type": "Foreground", "memory_needed": 2097152},
    {"event": "init_mutex", "id": 1},
    {"event": "mutex_lock", "id": 1},
    {"event": "exit"},
    {"event": "process_arrived", "pid": 3, "priority": 0, "process_type": "Background", "memory_needed": 99999999},
    {"event": "timer_interrupt"}
]"#;

#[test]
fn test_json_scenario_replays() {
    let events: Vec<KernelEvent> = serde_json::from_str(PRIORITY_SCENARIO).unwrap();
    let mut kernel = kernel_with(SchedulingAlgorithm::Priority);
    let lines: Vec<String> = run_checked(&mut kernel, &events)
        .iter()
        .map(render_outcome)
        .collect();
    assert_eq!(lines, vec!["1", "2", "2", "2", "1", "-1", "1"]);
}

#[test]
fn test_recorded_workload_replays_identically() {
    let workload = mixed_workload(25);
    let json = serde_json::to_string(&workload).unwrap();
    let reloaded: Vec<KernelEvent> = serde_json::from_str(&json).unwrap();
    assert_eq!(reloaded, workload);

    let mut first = kernel_with(SchedulingAlgorithm::Multilevel);
    let mut second = kernel_with(SchedulingAlgorithm::Multilevel);
    assert_eq!(
        run_checked(&mut first, &workload),
        run_checked(&mut second, &reloaded)
    );
    assert_eq!(
        first.scheduler().audit_log(),
        second.scheduler().audit_log()
    );
}

#[test]
fn test_audit_log_serializes() {
    let mut kernel = kernel_with(SchedulingAlgorithm::RoundRobin);
    run_checked(&mut kernel, &mixed_workload(6));

    let json = serde_json::to_string(kernel.scheduler().audit_log()).unwrap();
    let decoded: Vec<ScheduleEvent> = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded, kernel.scheduler().audit_log());
    assert!(matches!(
        decoded.first(),
        Some(ScheduleEvent::ProcessSelected { pid, timestamp_ticks: 0 }) if *pid == Pid::new(1)
    ));
}

#[test]
fn test_kernel_config_round_trip() {
    let config = KernelConfig::new(SchedulingAlgorithm::Multilevel).with_level_switch_threshold(120);
    let json = serde_json::to_string(&config).unwrap();
    let decoded: KernelConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded, config);
}
