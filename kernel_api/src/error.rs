//! Kernel error types

use core_types::{MutexId, Pid, SemaphoreId};
use thiserror::Error;

/// Errors raised by the memory manager
///
/// A failed operation never changes the allocator state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MemoryError {
    /// No free range is large enough
    #[error("Out of memory: requested {requested} bytes, largest free range is {largest_free} bytes")]
    Exhausted { requested: u64, largest_free: u64 },

    /// The PID holds no reservation
    #[error("Process {0} holds no memory reservation")]
    NotReserved(Pid),

    /// The PID already holds a reservation
    #[error("Process {0} already holds a memory reservation")]
    AlreadyReserved(Pid),

    /// Zero-byte reservations are not representable
    #[error("Cannot reserve zero bytes")]
    ZeroSized,

    /// The requested layout does not fit the address space
    #[error("Invalid memory layout: {reserved} reserved bytes in a {total} byte address space")]
    InvalidLayout { total: u64, reserved: u64 },
}

/// Errors returned from kernel event handlers
///
/// Every handler validates before mutating, so an error leaves the kernel
/// exactly as it was before the event.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KernelError {
    /// Arrival rejected because its memory could not be reserved
    #[error("Process {pid} could not be admitted: {source}")]
    OutOfMemory {
        pid: Pid,
        #[source]
        source: MemoryError,
    },

    /// Memory manager failure outside of admission
    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    /// Operation on a semaphore that was never initialized
    #[error("Unknown semaphore: {0}")]
    UnknownSemaphore(SemaphoreId),

    /// Operation on a mutex that was never initialized
    #[error("Unknown mutex: {0}")]
    UnknownMutex(MutexId),

    /// Semaphore id already initialized
    #[error("Semaphore already exists: {0}")]
    SemaphoreExists(SemaphoreId),

    /// Semaphore initialized with a negative count
    #[error("Invalid initial value {value} for {semaphore}")]
    InvalidSemaphoreValue { semaphore: SemaphoreId, value: i64 },

    /// Mutex id already initialized
    #[error("Mutex already exists: {0}")]
    MutexExists(MutexId),

    /// Unlock attempted by a process that does not own the mutex
    #[error("Process {pid} does not own {mutex}")]
    NotMutexOwner { mutex: MutexId, pid: Pid },

    /// PID reserved for the idle process or the kernel
    #[error("Invalid PID: {0}")]
    InvalidPid(Pid),

    /// PID already belongs to a resident process
    #[error("PID already in use: {0}")]
    PidInUse(Pid),

    /// A syscall arrived while the idle process was running
    #[error("Idle process cannot perform {0}")]
    IdleProcess(&'static str),
}

impl KernelError {
    /// Returns true if the error is an admission failure for lack of memory
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, KernelError::OutOfMemory { .. })
    }
}
