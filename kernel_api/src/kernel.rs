//! The event-handling contract between the driver and the kernel

use crate::KernelError;
use core_types::{MutexId, Pid, Priority, ProcessType, SemaphoreId};

/// The kernel's event-handling contract
///
/// The driver calls exactly one method per simulated event, in timestamp
/// order. Every call is synchronous and returns the PID that is running once
/// the event has been fully processed ([`Pid::IDLE`] when nothing is
/// runnable).
///
/// Syscalls are always issued by the running process, so the caller is
/// implicit in every method except arrivals.
///
/// # Example
///
/// ```
/// use core_types::{Pid, Priority, ProcessType, MIB};
/// use kernel_api::{KernelError, KernelEvents};
///
/// fn start_two<K: KernelEvents>(kernel: &mut K) -> Result<Pid, KernelError> {
///     kernel.process_arrived(Pid::new(1), Priority::new(5), ProcessType::Foreground, 2 * MIB)?;
///     kernel.process_arrived(Pid::new(2), Priority::new(1), ProcessType::Foreground, 2 * MIB)
/// }
/// ```
pub trait KernelEvents {
    /// A new process arrives and asks for `memory_needed` bytes
    ///
    /// Fails with [`KernelError::OutOfMemory`] when no free range is large
    /// enough; the process is then never admitted.
    fn process_arrived(
        &mut self,
        pid: Pid,
        priority: Priority,
        process_type: ProcessType,
        memory_needed: u64,
    ) -> Result<Pid, KernelError>;

    /// The running process exits and releases its memory
    fn syscall_exit(&mut self) -> Result<Pid, KernelError>;

    /// The running process changes its own priority
    fn syscall_set_priority(&mut self, new_priority: Priority) -> Result<Pid, KernelError>;

    /// Creates a counting semaphore under an unused id
    fn syscall_init_semaphore(
        &mut self,
        semaphore_id: SemaphoreId,
        initial_value: i64,
    ) -> Result<Pid, KernelError>;

    /// P (wait); blocks the caller when the count goes negative
    fn syscall_semaphore_p(&mut self, semaphore_id: SemaphoreId) -> Result<Pid, KernelError>;

    /// V (signal); may wake a waiter and preempt the caller
    fn syscall_semaphore_v(&mut self, semaphore_id: SemaphoreId) -> Result<Pid, KernelError>;

    /// Creates an unowned mutex under an unused id
    fn syscall_init_mutex(&mut self, mutex_id: MutexId) -> Result<Pid, KernelError>;

    /// Locks a mutex; blocks the caller when it is owned by someone else
    fn syscall_mutex_lock(&mut self, mutex_id: MutexId) -> Result<Pid, KernelError>;

    /// Unlocks a mutex owned by the caller, handing it to a waiter if any
    fn syscall_mutex_unlock(&mut self, mutex_id: MutexId) -> Result<Pid, KernelError>;

    /// A fixed-size timer tick elapsed
    fn timer_interrupt(&mut self) -> Result<Pid, KernelError>;
}
