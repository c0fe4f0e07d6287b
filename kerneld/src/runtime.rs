//! # Host Runtime
//!
//! The replay loop that feeds scripted events to the simulated kernel.

use crate::event_script::{EventScript, ScriptError};
use kernel_api::{render_outcome, KernelError, KernelEvent};
use sim_kernel::{KernelConfig, SimulatedKernel};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Host runtime error types
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Kernel error: {0}")]
    Kernel(#[from] KernelError),

    #[error("Script error: {0}")]
    Script(#[from] ScriptError),

    #[error("Failed to read script {path}: {source}")]
    ReadScript {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write output: {0}")]
    Output(#[from] io::Error),
}

/// Host runtime configuration
#[derive(Debug, Clone, Default)]
pub struct HostRuntimeConfig {
    /// Machine and scheduling policy
    pub kernel: KernelConfig,
    /// Maximum events to replay (0 = unlimited)
    pub max_steps: usize,
}

/// One replayed event and its output line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub event: KernelEvent,
    pub output: String,
}

/// Host runtime
pub struct HostRuntime {
    /// Configuration
    config: HostRuntimeConfig,
    /// Simulated kernel
    kernel: SimulatedKernel,
    /// Events still to replay
    script: EventScript,
    /// Replayed events, in order
    transcript: Vec<StepRecord>,
}

impl HostRuntime {
    /// Creates a new host runtime
    pub fn new(config: HostRuntimeConfig, script: EventScript) -> Result<Self, HostError> {
        let kernel = SimulatedKernel::new(config.kernel.clone())?;
        info!(events = script.remaining(), "host runtime ready");
        Ok(Self {
            config,
            kernel,
            script,
            transcript: Vec::new(),
        })
    }

    /// Replays the next event, returning its output line
    pub fn step(&mut self) -> Option<&StepRecord> {
        if self.config.max_steps != 0 && self.transcript.len() >= self.config.max_steps {
            return None;
        }
        let event = self.script.next_event()?;
        let output = render_outcome(&self.kernel.handle_event(&event));
        debug!(step = self.transcript.len() + 1, %event, %output, "event replayed");

        self.transcript.push(StepRecord { event, output });
        self.transcript.last()
    }

    /// Replays the whole script, writing one line per event
    ///
    /// Returns the number of events replayed.
    pub fn run<W: Write>(&mut self, out: &mut W) -> Result<usize, HostError> {
        let start = self.transcript.len();
        while let Some(record) = self.step() {
            writeln!(out, "{}", record.output)?;
        }
        let replayed = self.transcript.len() - start;
        if self.script.has_more() {
            warn!(
                max_steps = self.config.max_steps,
                skipped = self.script.remaining(),
                "step limit reached before the end of the script"
            );
        }

        info!(
            replayed,
            running = %self.kernel.running_pid(),
            free_bytes = self.kernel.memory().free_bytes(),
            "replay finished"
        );
        Ok(replayed)
    }

    /// Returns the simulated kernel
    pub fn kernel(&self) -> &SimulatedKernel {
        &self.kernel
    }

    /// Returns every replayed event with its output
    pub fn transcript(&self) -> &[StepRecord] {
        &self.transcript
    }

    /// Returns the output lines produced so far
    pub fn outputs(&self) -> Vec<&str> {
        self.transcript
            .iter()
            .map(|record| record.output.as_str())
            .collect()
    }

    /// Returns the number of replayed events
    pub fn step_count(&self) -> usize {
        self.transcript.len()
    }

    /// Returns true once every scripted event has been replayed
    pub fn is_finished(&self) -> bool {
        !self.script.has_more()
    }
}

/// Loads a script file, as JSON when it has a `.json` extension
pub fn load_script(path: &Path) -> Result<EventScript, HostError> {
    let text = fs::read_to_string(path).map_err(|source| HostError::ReadScript {
        path: path.display().to_string(),
        source,
    })?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let script = if is_json {
        EventScript::from_json(&text)?
    } else {
        EventScript::from_text(&text)?
    };
    Ok(script)
}
