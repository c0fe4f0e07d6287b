//! Process classification and scheduling vocabulary

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Scheduling priority
///
/// Lower numeric values run first, negative values included. The idle
/// process has no priority at all; it is a structural fallback and never
/// takes part in a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Priority(pub i32);

impl Priority {
    pub fn new(value: i32) -> Self {
        Self(value)
    }

    /// Returns true if `self` should run strictly before `other`
    pub fn outranks(&self, other: Priority) -> bool {
        self.0 < other.0
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Queue class of a process under multilevel scheduling
///
/// Fixed at arrival. The other algorithms ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProcessType {
    #[default]
    Foreground,
    Background,
}

impl ProcessType {
    /// Returns the opposite level
    pub fn other(&self) -> Self {
        match self {
            ProcessType::Foreground => ProcessType::Background,
            ProcessType::Background => ProcessType::Foreground,
        }
    }
}

impl fmt::Display for ProcessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessType::Foreground => write!(f, "Foreground"),
            ProcessType::Background => write!(f, "Background"),
        }
    }
}

impl FromStr for ProcessType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "foreground" | "fg" => Ok(ProcessType::Foreground),
            "background" | "bg" => Ok(ProcessType::Background),
            other => Err(format!("unknown process type: {}", other)),
        }
    }
}

/// Scheduling algorithm, selected once when the kernel is built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SchedulingAlgorithm {
    /// First come, first served; never preempts
    Fcfs,
    /// FIFO with a fixed time quantum
    RoundRobin,
    /// Lowest priority value first, preemptive
    Priority,
    /// Foreground/background queues with a level-switch budget
    Multilevel,
}

impl SchedulingAlgorithm {
    pub fn is_priority(&self) -> bool {
        matches!(self, SchedulingAlgorithm::Priority)
    }
}

impl fmt::Display for SchedulingAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SchedulingAlgorithm::Fcfs => "FCFS",
            SchedulingAlgorithm::RoundRobin => "RR",
            SchedulingAlgorithm::Priority => "Priority",
            SchedulingAlgorithm::Multilevel => "Multilevel",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for SchedulingAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fcfs" => Ok(SchedulingAlgorithm::Fcfs),
            "rr" | "round-robin" | "roundrobin" => Ok(SchedulingAlgorithm::RoundRobin),
            "priority" => Ok(SchedulingAlgorithm::Priority),
            "multilevel" => Ok(SchedulingAlgorithm::Multilevel),
            other => Err(format!("unknown scheduling algorithm: {}", other)),
        }
    }
}
