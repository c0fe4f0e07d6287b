//! Scheduling Policy Integration Tests
//!
//! These tests drive whole event sequences through the kernel and check
//! what each policy promises:
//! - Priority preemption and stable ties
//! - Round-robin time slicing
//! - Multilevel starvation bounds
//!
//! Invariants are checked after every event via `run_checked`.

use core_types::{Pid, ProcessType, SchedulingAlgorithm, MIB};
use kernel_api::{KernelEvent, KernelEvents};
use sim_kernel::test_utils::{kernel_with, tick};
use sim_kernel::{PreemptionReason, ScheduleEvent};
use tests_scenarios::{arrival, mixed_workload, run_checked, running_pids};

// ============================================================================
// Priority
// ============================================================================

#[test]
fn test_priority_preemption_scenario() {
    let mut kernel = kernel_with(SchedulingAlgorithm::Priority);
    let outcomes = run_checked(
        &mut kernel,
        &[
            arrival(1, 5, ProcessType::Foreground, 2 * MIB),
            arrival(2, 1, ProcessType::Foreground, 2 * MIB),
            KernelEvent::Exit,
        ],
    );
    assert_eq!(running_pids(&outcomes), vec![1, 2, 1]);
}

#[test]
fn test_negative_priority_outranks_zero() {
    let mut kernel = kernel_with(SchedulingAlgorithm::Priority);
    let outcomes = run_checked(
        &mut kernel,
        &[
            arrival(1, 0, ProcessType::Foreground, MIB),
            arrival(2, -4, ProcessType::Foreground, MIB),
            arrival(3, -1, ProcessType::Foreground, MIB),
            KernelEvent::Exit,
            KernelEvent::Exit,
        ],
    );
    assert_eq!(running_pids(&outcomes), vec![1, 2, 2, 3, 1]);
}

#[test]
fn test_priority_equal_arrival_does_not_preempt() {
    let mut kernel = kernel_with(SchedulingAlgorithm::Priority);
    let outcomes = run_checked(
        &mut kernel,
        &[
            arrival(4, 2, ProcessType::Foreground, MIB),
            arrival(1, 2, ProcessType::Foreground, MIB),
            arrival(3, 2, ProcessType::Foreground, MIB),
            KernelEvent::Exit,
            KernelEvent::Exit,
        ],
    );
    // Equal priorities run in arrival order, not PID order
    assert_eq!(running_pids(&outcomes), vec![4, 4, 4, 1, 3]);
}

#[test]
fn test_priority_timer_never_preempts() {
    let mut kernel = kernel_with(SchedulingAlgorithm::Priority);
    run_checked(
        &mut kernel,
        &[
            arrival(1, 3, ProcessType::Foreground, MIB),
            arrival(2, 3, ProcessType::Foreground, MIB),
        ],
    );
    assert_eq!(tick(&mut kernel, 50), Pid::new(1));
    assert_eq!(kernel.scheduler().running().map(|p| p.time_used), Some(500));
}

#[test]
fn test_priority_change_swaps_with_ready_minimum() {
    let mut kernel = kernel_with(SchedulingAlgorithm::Priority);
    let outcomes = run_checked(
        &mut kernel,
        &[
            arrival(1, 1, ProcessType::Foreground, MIB),
            arrival(2, 4, ProcessType::Foreground, MIB),
            arrival(3, 2, ProcessType::Foreground, MIB),
            KernelEvent::SetPriority {
                priority: core_types::Priority::new(3),
            },
            KernelEvent::SetPriority {
                priority: core_types::Priority::new(5),
            },
        ],
    );
    assert_eq!(running_pids(&outcomes), vec![1, 1, 1, 3, 1]);
}

#[test]
fn test_mixed_workload_keeps_invariants_under_every_policy() {
    for algorithm in [
        SchedulingAlgorithm::Fcfs,
        SchedulingAlgorithm::RoundRobin,
        SchedulingAlgorithm::Priority,
        SchedulingAlgorithm::Multilevel,
    ] {
        let mut kernel = kernel_with(algorithm);
        run_checked(&mut kernel, &mixed_workload(40));
    }
}

// ============================================================================
// Round-robin
// ============================================================================

#[test]
fn test_round_robin_never_exceeds_quantum() {
    let mut kernel = kernel_with(SchedulingAlgorithm::RoundRobin);
    for pid in 1..=3 {
        kernel
            .process_arrived(Pid::new(pid), core_types::Priority::new(1), ProcessType::Foreground, MIB)
            .unwrap();
    }

    let mut order = Vec::new();
    for _ in 0..24 {
        let running = kernel.timer_interrupt().unwrap();
        let used = kernel.scheduler().running().map_or(0, |p| p.time_used);
        assert!(used < kernel.config().quantum);
        if order.last() != Some(&running) {
            order.push(running);
        }
    }
    let order: Vec<u32> = order.iter().map(|pid| pid.as_u32()).collect();
    assert_eq!(order, vec![1, 2, 3, 1, 2, 3, 1]);
}

#[test]
fn test_round_robin_quantum_is_configurable() {
    let config = sim_kernel::KernelConfig::new(SchedulingAlgorithm::RoundRobin).with_quantum(20);
    let mut kernel = sim_kernel::SimulatedKernel::new(config).unwrap();
    run_checked(
        &mut kernel,
        &[
            arrival(1, 1, ProcessType::Foreground, MIB),
            arrival(2, 1, ProcessType::Foreground, MIB),
        ],
    );
    assert_eq!(tick(&mut kernel, 2), Pid::new(2));
    let expirations = kernel
        .scheduler()
        .audit_log()
        .iter()
        .filter(|event| {
            matches!(
                event,
                ScheduleEvent::ProcessPreempted {
                    reason: PreemptionReason::QuantumExpired,
                    ..
                }
            )
        })
        .count();
    assert_eq!(expirations, 1);
}

// ============================================================================
// Multilevel
// ============================================================================

#[test]
fn test_multilevel_foreground_starves_background_only_until_threshold() {
    let mut kernel = kernel_with(SchedulingAlgorithm::Multilevel);
    run_checked(
        &mut kernel,
        &[
            arrival(1, 1, ProcessType::Foreground, MIB),
            arrival(2, 1, ProcessType::Foreground, MIB),
            arrival(3, 1, ProcessType::Background, MIB),
        ],
    );

    let mut foreground_streak = 0;
    let mut longest_streak = 0;
    let mut background_turns = 0;
    for _ in 0..100 {
        let running = kernel.timer_interrupt().unwrap();
        if running == Pid::new(3) {
            background_turns += 1;
            foreground_streak = 0;
        } else {
            foreground_streak += 1;
            longest_streak = longest_streak.max(foreground_streak);
        }
    }

    // 200 units at 10 per tick
    assert_eq!(longest_streak, 20);
    assert!(background_turns > 0);
}

#[test]
fn test_multilevel_levels_alternate_every_threshold() {
    let mut kernel = kernel_with(SchedulingAlgorithm::Multilevel);
    run_checked(
        &mut kernel,
        &[
            arrival(1, 1, ProcessType::Foreground, MIB),
            arrival(2, 1, ProcessType::Background, MIB),
        ],
    );

    let mut switches = Vec::new();
    for step in 1..=80 {
        kernel.timer_interrupt().unwrap();
        if kernel.scheduler().level_time() == 0 {
            switches.push((step, kernel.scheduler().current_level()));
        }
    }
    assert_eq!(
        switches,
        vec![
            (20, ProcessType::Background),
            (40, ProcessType::Foreground),
            (60, ProcessType::Background),
            (80, ProcessType::Foreground),
        ]
    );
}

#[test]
fn test_multilevel_background_runs_when_foreground_empties() {
    let mut kernel = kernel_with(SchedulingAlgorithm::Multilevel);
    let outcomes = run_checked(
        &mut kernel,
        &[
            arrival(1, 1, ProcessType::Foreground, MIB),
            arrival(2, 1, ProcessType::Background, MIB),
            arrival(3, 1, ProcessType::Background, MIB),
            KernelEvent::Exit,
            KernelEvent::Exit,
            KernelEvent::Exit,
        ],
    );
    assert_eq!(running_pids(&outcomes), vec![1, 1, 1, 2, 3, 0]);
    assert_eq!(kernel.scheduler().current_level(), ProcessType::Background);
}
