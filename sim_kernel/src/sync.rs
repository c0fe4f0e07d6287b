//! Blocking synchronization primitives
//!
//! Semaphores and mutexes only track counts, ownership and who is waiting.
//! Choosing which waiter wakes, and whether it preempts the caller, is a
//! scheduling decision and lives in the kernel (see [`select_waiter`]).
//!
//! Blocking is a change of ownership: a PCB handed to
//! [`Semaphore::acquire_by`] or [`Mutex::lock_by`] either comes straight back
//! ([`Acquire::Proceeds`]) or stays in the primitive's waiting list
//! ([`Acquire::Blocked`]) until the kernel removes it.

use crate::pcb::Pcb;
use core_types::Pid;
use std::collections::VecDeque;

/// Outcome of a P or lock operation
#[derive(Debug, PartialEq, Eq)]
pub enum Acquire {
    /// The caller keeps running
    Proceeds(Pcb),
    /// The caller was queued on the primitive and can no longer run
    Blocked,
}

/// How the kernel picks a waiter to wake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakePolicy {
    /// Lowest priority value; ties go to whoever started waiting first
    HighestPriority,
    /// Lowest PID
    LowestPid,
}

/// Returns the index of the waiter `policy` selects
pub fn select_waiter(waiting: &VecDeque<Pcb>, policy: WakePolicy) -> Option<usize> {
    match policy {
        // min_by_key keeps the first of equal keys, which is the earliest waiter
        WakePolicy::HighestPriority => waiting
            .iter()
            .enumerate()
            .min_by_key(|(_, pcb)| pcb.priority)
            .map(|(index, _)| index),
        WakePolicy::LowestPid => waiting
            .iter()
            .enumerate()
            .min_by_key(|(_, pcb)| pcb.pid)
            .map(|(index, _)| index),
    }
}

/// Counting semaphore
///
/// `value` may go negative; while it is negative its magnitude equals the
/// number of waiters.
#[derive(Debug, Clone)]
pub struct Semaphore {
    value: i64,
    waiting: VecDeque<Pcb>,
}

impl Semaphore {
    pub fn new(initial_value: i64) -> Self {
        Self {
            value: initial_value,
            waiting: VecDeque::new(),
        }
    }

    /// P: decrements the count and queues the caller if it went negative
    pub fn acquire_by(&mut self, pcb: Pcb) -> Acquire {
        self.value -= 1;
        if self.value < 0 {
            self.waiting.push_back(pcb);
            Acquire::Blocked
        } else {
            Acquire::Proceeds(pcb)
        }
    }

    /// V: increments the count; waking a waiter is up to the kernel
    pub fn release(&mut self) {
        self.value += 1;
    }

    /// Removes the waiter `policy` selects
    pub fn take_waiter(&mut self, policy: WakePolicy) -> Option<Pcb> {
        let index = select_waiter(&self.waiting, policy)?;
        self.waiting.remove(index)
    }

    pub fn value(&self) -> i64 {
        self.value
    }

    pub fn waiting(&self) -> &VecDeque<Pcb> {
        &self.waiting
    }

    pub fn waiting_pids(&self) -> Vec<Pid> {
        self.waiting.iter().map(|pcb| pcb.pid).collect()
    }
}

/// Mutex with an owning process
///
/// Waiters exist only while the mutex is owned.
#[derive(Debug, Clone, Default)]
pub struct Mutex {
    owner: Option<Pid>,
    waiting: VecDeque<Pcb>,
}

impl Mutex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the mutex if it is free, otherwise queues the caller
    pub fn lock_by(&mut self, pcb: Pcb) -> Acquire {
        if self.owner.is_none() {
            self.owner = Some(pcb.pid);
            Acquire::Proceeds(pcb)
        } else {
            self.waiting.push_back(pcb);
            Acquire::Blocked
        }
    }

    /// Clears the owner
    pub fn release(&mut self) {
        self.owner = None;
    }

    /// Removes the waiter `policy` selects and makes it the owner
    ///
    /// Leaves the mutex unchanged when nobody is waiting.
    pub fn hand_off(&mut self, policy: WakePolicy) -> Option<Pcb> {
        let index = select_waiter(&self.waiting, policy)?;
        let successor = self.waiting.remove(index)?;
        self.owner = Some(successor.pid);
        Some(successor)
    }

    pub fn owner(&self) -> Option<Pid> {
        self.owner
    }

    pub fn is_owned_by(&self, pid: Pid) -> bool {
        self.owner == Some(pid)
    }

    pub fn has_waiters(&self) -> bool {
        !self.waiting.is_empty()
    }

    pub fn waiting_pids(&self) -> Vec<Pid> {
        self.waiting.iter().map(|pcb| pcb.pid).collect()
    }
}
