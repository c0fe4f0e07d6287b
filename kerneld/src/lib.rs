//! # Kernel Host Runtime
//!
//! This crate provides the event driver for the simulated kernel.
//!
//! ## Philosophy
//!
//! - **Host owns I/O**: The kernel never prints
//! - **Input is explicit events**: One scripted line per event
//! - **Output is one line per event**: The running PID, `-1` for a failed
//!   arrival, or the rejection message
//! - **Deterministic**: The same script always produces the same output
//!
//! ## Responsibilities
//!
//! The host runtime:
//! - Parses line scripts and JSON event lists
//! - Builds the kernel from command-line configuration
//! - Replays events in order and renders each outcome
//!
//! ## Non-Responsibilities
//!
//! The host does NOT:
//! - Generate workloads or reorder events by timestamp
//! - Collect statistics beyond the replay transcript

pub mod event_script;
pub mod runtime;

pub use event_script::{EventScript, ScriptError};
pub use runtime::{load_script, HostError, HostRuntime, HostRuntimeConfig, StepRecord};
