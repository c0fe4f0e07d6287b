//! Scenario Test Utilities
//!
//! This crate provides shared utilities for end-to-end kernel scenarios.
//!
//! ## Test Philosophy
//!
//! - **Invariants between every event**: scenarios run through
//!   [`run_checked`], which fails on the first event that breaks one
//! - **Deterministic workloads**: generated sequences depend only on their
//!   index, so a failure always reproduces
//! - **Outputs, not internals**: assertions prefer the PID sequence the
//!   driver would see

use core_types::{MutexId, Pid, Priority, ProcessType, SemaphoreId, KIB};
use kernel_api::{KernelError, KernelEvent};
use sim_kernel::test_utils::check_kernel_invariants;
use sim_kernel::SimulatedKernel;

/// Builds an arrival event
pub fn arrival(pid: u32, priority: i32, process_type: ProcessType, memory_needed: u64) -> KernelEvent {
    KernelEvent::ProcessArrived {
        pid: Pid::new(pid),
        priority: Priority::new(priority),
        process_type,
        memory_needed,
    }
}

pub fn sem_p(id: u32) -> KernelEvent {
    KernelEvent::SemaphoreP { id: SemaphoreId(id) }
}

pub fn sem_v(id: u32) -> KernelEvent {
    KernelEvent::SemaphoreV { id: SemaphoreId(id) }
}

pub fn lock(id: u32) -> KernelEvent {
    KernelEvent::MutexLock { id: MutexId(id) }
}

pub fn unlock(id: u32) -> KernelEvent {
    KernelEvent::MutexUnlock { id: MutexId(id) }
}

/// Applies `events` in order, checking kernel invariants after each one
///
/// Panics with the offending event index when an invariant breaks.
pub fn run_checked(
    kernel: &mut SimulatedKernel,
    events: &[KernelEvent],
) -> Vec<Result<Pid, KernelError>> {
    events
        .iter()
        .enumerate()
        .map(|(index, event)| {
            let outcome = kernel.handle_event(event);
            if let Err(violation) = check_kernel_invariants(kernel) {
                panic!("invariant broken after event {} ({}): {}", index, event, violation);
            }
            outcome
        })
        .collect()
}

/// Running PIDs of a fully successful run
///
/// Panics if any event was rejected.
pub fn running_pids(outcomes: &[Result<Pid, KernelError>]) -> Vec<u32> {
    outcomes
        .iter()
        .enumerate()
        .map(|(index, outcome)| match outcome {
            Ok(pid) => pid.as_u32(),
            Err(err) => panic!("event {} rejected: {}", index, err),
        })
        .collect()
}

/// Deterministic mixed workload
///
/// Arrivals of varying size, type and priority interleaved with timer
/// interrupts and exits. Exits while idle are skipped by the caller's
/// kernel as idle-process errors, which is part of what is exercised.
pub fn mixed_workload(processes: u32) -> Vec<KernelEvent> {
    let mut events = Vec::new();
    for i in 1..=processes {
        let size = (u64::from(i.wrapping_mul(37)) % 13 + 1) * 64 * KIB;
        let process_type = if i % 3 == 0 {
            ProcessType::Background
        } else {
            ProcessType::Foreground
        };
        let priority = i32::try_from(i.wrapping_mul(7) % 5).unwrap_or_default();
        events.push(arrival(i, priority, process_type, size));

        for _ in 0..(i % 4) {
            events.push(KernelEvent::TimerInterrupt);
        }
        if i % 2 == 0 {
            events.push(KernelEvent::Exit);
        }
        if i % 5 == 0 {
            events.push(KernelEvent::SetPriority {
                priority: Priority::new(i32::try_from(i % 7).unwrap_or_default()),
            });
        }
    }
    events
}
