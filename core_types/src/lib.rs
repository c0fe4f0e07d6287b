//! # Core Types
//!
//! This crate defines the vocabulary shared by every schedsim crate.
//!
//! ## Philosophy
//!
//! - **Explicit over implicit**: identifiers are distinct newtypes and cannot be confused.
//! - **Driver-assigned identity**: the kernel never invents a PID or a primitive handle.
//! - **Plain data**: nothing here has behavior beyond comparison and formatting.
//!
//! ## Key Types
//!
//! - [`Pid`]: process identifier, with the reserved idle and kernel values
//! - [`SemaphoreId`], [`MutexId`]: handles of synchronization primitives
//! - [`Priority`]: lower value runs first
//! - [`ProcessType`]: multilevel queue class
//! - [`SchedulingAlgorithm`]: the closed set of scheduling policies
//! - [`AddressRange`]: half-open physical address range

pub mod ids;
pub mod memory;
pub mod process;

pub use ids::{MutexId, Pid, SemaphoreId};
pub use memory::{parse_size, AddressRange, KIB, MIB};
pub use process::{Priority, ProcessType, SchedulingAlgorithm};
