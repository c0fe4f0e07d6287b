//! # Kernel API
//!
//! This crate defines the boundary between the event driver and the kernel.
//!
//! ## Philosophy
//!
//! The driver owns time and ordering; the kernel owns decisions:
//! - One call per event, processed to completion before the next
//! - Every call answers "which process runs now?"
//! - Failures are values, never panics, and never leave partial state
//!
//! ## Non-Goals
//!
//! This is NOT:
//! - A scenario file format (drivers choose their own)
//! - A real syscall ABI
//! - Thread-safe; the simulated machine has exactly one CPU and one event at a time

pub mod error;
pub mod kernel;
pub mod syscalls;

pub use error::{KernelError, MemoryError};
pub use kernel::KernelEvents;
pub use syscalls::{render_outcome, KernelEvent, FAILURE_SENTINEL};
