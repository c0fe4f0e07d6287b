//! Kernel configuration
//!
//! Everything here is fixed when the kernel is built. Defaults model the
//! reference machine: 20 MiB of physical memory, the low 10 MiB held by the
//! kernel, a 10-unit timer tick, a 40-unit quantum and a 200-unit
//! multilevel switch budget.

use core_types::{SchedulingAlgorithm, MIB};
use kernel_api::MemoryError;
use serde::{Deserialize, Serialize};

/// Kernel configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelConfig {
    /// Scheduling policy
    pub algorithm: SchedulingAlgorithm,
    /// Size of the physical address space in bytes
    pub memory_size: u64,
    /// Bytes reserved for kernel space at address 0
    pub kernel_reserved: u64,
    /// Logical address that maps to the first byte of a process reservation
    pub logical_base: u64,
    /// Time units added by each timer interrupt
    pub timer_tick: u64,
    /// Round-robin and multilevel foreground time slice
    pub quantum: u64,
    /// Time budget of one multilevel level before the other gets a turn
    pub level_switch_threshold: u64,
}

impl KernelConfig {
    /// Default configuration for the given algorithm
    pub fn new(algorithm: SchedulingAlgorithm) -> Self {
        Self {
            algorithm,
            memory_size: 20 * MIB,
            kernel_reserved: 10 * MIB,
            logical_base: 0x2000_0000,
            timer_tick: 10,
            quantum: 40,
            level_switch_threshold: 200,
        }
    }

    pub fn with_memory(mut self, memory_size: u64, kernel_reserved: u64) -> Self {
        self.memory_size = memory_size;
        self.kernel_reserved = kernel_reserved;
        self
    }

    pub fn with_logical_base(mut self, logical_base: u64) -> Self {
        self.logical_base = logical_base;
        self
    }

    pub fn with_quantum(mut self, quantum: u64) -> Self {
        self.quantum = quantum;
        self
    }

    pub fn with_level_switch_threshold(mut self, threshold: u64) -> Self {
        self.level_switch_threshold = threshold;
        self
    }

    /// Checks that the memory layout leaves room for user processes
    pub fn validate(&self) -> Result<(), MemoryError> {
        if self.kernel_reserved >= self.memory_size {
            return Err(MemoryError::InvalidLayout {
                total: self.memory_size,
                reserved: self.kernel_reserved,
            });
        }
        Ok(())
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self::new(SchedulingAlgorithm::Fcfs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_machine() {
        let config = KernelConfig::new(SchedulingAlgorithm::RoundRobin);
        assert_eq!(config.memory_size, 20 * MIB);
        assert_eq!(config.kernel_reserved, 10 * MIB);
        assert_eq!(config.timer_tick, 10);
        assert_eq!(config.quantum, 40);
        assert_eq!(config.level_switch_threshold, 200);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_kernel_block_must_leave_user_memory() {
        let config = KernelConfig::default().with_memory(MIB, MIB);
        assert_eq!(
            config.validate(),
            Err(MemoryError::InvalidLayout {
                total: MIB,
                reserved: MIB,
            })
        );
    }
}
