//! Identifiers for simulated entities
//!
//! Every identifier here is supplied by the driver, never generated by the
//! kernel. They are plain integers wrapped in newtypes so a semaphore id can
//! never be passed where a PID is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Process identifier
///
/// Assigned by the driver on arrival and never reused while the process is
/// resident. Two values are reserved: [`Pid::IDLE`] reports the idle process
/// and [`Pid::KERNEL`] owns the kernel-space memory block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Pid(pub u32);

impl Pid {
    /// PID reported when nothing is runnable
    pub const IDLE: Pid = Pid(0);

    /// Sentinel owner of the kernel-space reservation
    pub const KERNEL: Pid = Pid(u32::MAX);

    /// Creates a PID from its raw value
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    /// Returns the raw value
    pub fn as_u32(&self) -> u32 {
        self.0
    }

    /// Returns true for PIDs a driver may assign to a user process
    pub fn is_user(&self) -> bool {
        *self != Self::IDLE && *self != Self::KERNEL
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle of a counting semaphore, chosen by the driver at init time
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SemaphoreId(pub u32);

impl fmt::Display for SemaphoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Semaphore({})", self.0)
    }
}

/// Handle of a mutex, chosen by the driver at init time
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MutexId(pub u32);

impl fmt::Display for MutexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mutex({})", self.0)
    }
}
