//! Process control block

use core_types::{Pid, Priority, ProcessType};
use serde::{Deserialize, Serialize};

/// Scheduler descriptor for one resident process
///
/// A PCB is owned by exactly one place at a time: the running slot, a ready
/// structure, or the waiting list of a semaphore or mutex. Moving it between
/// those places is how blocking and waking are modeled.
///
/// The idle process has no PCB; see [`crate::scheduler::Scheduler::running`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pcb {
    pub pid: Pid,
    pub priority: Priority,
    /// Run time since the last dispatch, level switch or quantum expiry
    pub time_used: u64,
    pub process_type: ProcessType,
}

impl Pcb {
    pub fn new(pid: Pid, priority: Priority, process_type: ProcessType) -> Self {
        Self {
            pid,
            priority,
            time_used: 0,
            process_type,
        }
    }

    /// Returns true if this process should run strictly before `other`
    ///
    /// Equal priorities never outrank each other, so ties keep whoever got
    /// there first.
    pub fn outranks(&self, other: &Pcb) -> bool {
        self.priority.outranks(other.priority)
    }

    /// Clears the run-time accounting
    pub fn reset_time(&mut self) {
        self.time_used = 0;
    }
}
