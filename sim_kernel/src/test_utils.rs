//! Test utilities for scenario testing
//!
//! Helpers shared by unit tests and the scenario test crate: building a
//! kernel, driving it with events, and checking the invariants that must
//! hold between events.

use crate::{KernelConfig, SimulatedKernel};
use core_types::{Pid, Priority, ProcessType, SchedulingAlgorithm, MIB};
use kernel_api::{KernelError, KernelEvent, KernelEvents};

/// Builds a kernel with the default machine for `algorithm`
///
/// Panics if the default configuration is rejected, which only happens when
/// the defaults themselves are broken.
pub fn kernel_with(algorithm: SchedulingAlgorithm) -> SimulatedKernel {
    match SimulatedKernel::new(KernelConfig::new(algorithm)) {
        Ok(kernel) => kernel,
        Err(err) => panic!("default kernel configuration rejected: {}", err),
    }
}

/// Admits a 1 MiB process of the given type
pub fn arrive(
    kernel: &mut SimulatedKernel,
    pid: u32,
    priority: i32,
    process_type: ProcessType,
) -> Result<Pid, KernelError> {
    kernel.process_arrived(Pid::new(pid), Priority::new(priority), process_type, MIB)
}

/// Fires `count` timer interrupts and returns the PID running after the last
///
/// Panics if an interrupt is rejected.
pub fn tick(kernel: &mut SimulatedKernel, count: usize) -> Pid {
    for _ in 0..count {
        if let Err(err) = kernel.timer_interrupt() {
            panic!("timer interrupt rejected: {}", err);
        }
    }
    kernel.running_pid()
}

/// Applies every event in order, collecting each outcome
pub fn replay(kernel: &mut SimulatedKernel, events: &[KernelEvent]) -> Vec<Result<Pid, KernelError>> {
    events.iter().map(|event| kernel.handle_event(event)).collect()
}

/// Checks the invariants that hold between any two events
///
/// - The memory manager partitions the address space exactly
/// - Every resident process is in exactly one place
/// - Semaphore waiter counts match their negative values
/// - Mutexes only have waiters while owned, and only by resident processes
/// - Under priority scheduling nothing ready outranks the running process
pub fn check_kernel_invariants(kernel: &SimulatedKernel) -> Result<(), String> {
    kernel.memory().check_invariants()?;

    let mut placed: Vec<Pid> = kernel.scheduler().ready_pids();
    if let Some(running) = kernel.scheduler().running() {
        placed.push(running.pid);
    }

    for (id, semaphore) in kernel.semaphores() {
        let expected = usize::try_from(-semaphore.value()).unwrap_or(0);
        if semaphore.waiting().len() != expected {
            return Err(format!(
                "{} has value {} but {} waiters",
                id,
                semaphore.value(),
                semaphore.waiting().len()
            ));
        }
        placed.extend(semaphore.waiting_pids());
    }

    for (id, mutex) in kernel.mutexes() {
        if mutex.has_waiters() && mutex.owner().is_none() {
            return Err(format!("{} has waiters but no owner", id));
        }
        if let Some(owner) = mutex.owner() {
            if !kernel.is_resident(owner) {
                return Err(format!("{} is owned by {}, which is not resident", id, owner));
            }
        }
        placed.extend(mutex.waiting_pids());
    }

    placed.sort();
    let resident = kernel.resident_pids();
    if placed != resident {
        return Err(format!(
            "resident processes {:?} but scheduled or blocked {:?}",
            resident, placed
        ));
    }

    if kernel.config().algorithm.is_priority() {
        assert_priority_order(kernel)?;
    }
    Ok(())
}

/// Checks that no ready process strictly outranks the running one
pub fn assert_priority_order(kernel: &SimulatedKernel) -> Result<(), String> {
    let Some(running) = kernel.scheduler().running() else {
        return Ok(());
    };
    match kernel
        .scheduler()
        .ready_pcbs()
        .into_iter()
        .find(|ready| ready.outranks(running))
    {
        Some(ready) => Err(format!(
            "ready process {} (priority {}) outranks running {} (priority {})",
            ready.pid, ready.priority, running.pid, running.priority
        )),
        None => Ok(()),
    }
}
