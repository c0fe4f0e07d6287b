//! # Event Script Parser
//!
//! Provides a simple scripted event format for deterministic runs and demos.
//!
//! ## Format
//!
//! Scripts are line-based, with each line representing one kernel event:
//! - Arrival: `arrive <pid> <priority> <Foreground|Background> <size>`
//! - Process syscalls: `exit`, `priority <new>`
//! - Semaphores: `sem_init <id> <value>`, `sem_p <id>`, `sem_v <id>`
//! - Mutexes: `mutex_init <id>`, `lock <id>`, `unlock <id>`
//! - Timer: `tick`
//! - Comments: `# This is a comment`, also after an event
//!
//! Sizes are plain bytes or carry a `B`, `KiB` or `MiB` suffix.
//!
//! ## Example
//!
//! ```text
//! # Priority preemption
//! arrive 1 5 Foreground 2MiB
//! arrive 2 1 Foreground 2MiB   # preempts 1
//! exit                         # 1 runs again
//! ```
//!
//! A script may also be a JSON array of [`KernelEvent`] values.

use core_types::{parse_size, MutexId, Pid, Priority, ProcessType, SemaphoreId};
use kernel_api::KernelEvent;
use std::collections::VecDeque;
use std::str::FromStr;
use thiserror::Error;

/// Event script error types
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScriptError {
    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    #[error("Parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    #[error("Empty script")]
    EmptyScript,

    #[error("Invalid JSON script: {0}")]
    InvalidJson(String),
}

/// Event script
///
/// Parses and provides scripted kernel events in file order.
#[derive(Debug, Clone, Default)]
pub struct EventScript {
    events: VecDeque<KernelEvent>,
}

impl EventScript {
    /// Creates a new empty event script
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps already decoded events
    pub fn from_events(events: impl IntoIterator<Item = KernelEvent>) -> Self {
        Self {
            events: events.into_iter().collect(),
        }
    }

    /// Parses a script from text
    pub fn from_text(text: &str) -> Result<Self, ScriptError> {
        let mut events = VecDeque::new();

        for (line_num, line) in text.lines().enumerate() {
            let line = match line.split_once('#') {
                Some((event, _comment)) => event.trim(),
                None => line.trim(),
            };
            if line.is_empty() {
                continue;
            }
            events.push_back(Self::parse_line(line, line_num + 1)?);
        }

        if events.is_empty() {
            return Err(ScriptError::EmptyScript);
        }
        Ok(Self { events })
    }

    /// Parses a JSON array of events
    pub fn from_json(text: &str) -> Result<Self, ScriptError> {
        let events: Vec<KernelEvent> =
            serde_json::from_str(text).map_err(|e| ScriptError::InvalidJson(e.to_string()))?;
        if events.is_empty() {
            return Err(ScriptError::EmptyScript);
        }
        Ok(Self::from_events(events))
    }

    /// Parses a single line of script
    fn parse_line(line: &str, line_num: usize) -> Result<KernelEvent, ScriptError> {
        let mut fields = line.split_whitespace();
        let Some(name) = fields.next() else {
            return Err(ScriptError::EmptyScript);
        };
        let args: Vec<&str> = fields.collect();
        let args = Args {
            name,
            values: &args,
            line: line_num,
        };

        let event = match name.to_lowercase().as_str() {
            "arrive" => {
                args.expect_count(4)?;
                let memory_needed = parse_size(args.values[3]).ok_or_else(|| {
                    args.error(format!("invalid size: {}", args.values[3]))
                })?;
                KernelEvent::ProcessArrived {
                    pid: Pid::new(args.parse(0, "pid")?),
                    priority: Priority::new(args.parse(1, "priority")?),
                    process_type: args.parse::<ProcessType>(2, "process type")?,
                    memory_needed,
                }
            }
            "exit" => {
                args.expect_count(0)?;
                KernelEvent::Exit
            }
            "priority" => {
                args.expect_count(1)?;
                KernelEvent::SetPriority {
                    priority: Priority::new(args.parse(0, "priority")?),
                }
            }
            "sem_init" => {
                args.expect_count(2)?;
                KernelEvent::InitSemaphore {
                    id: SemaphoreId(args.parse(0, "semaphore id")?),
                    initial_value: args.parse(1, "initial value")?,
                }
            }
            "sem_p" => {
                args.expect_count(1)?;
                KernelEvent::SemaphoreP {
                    id: SemaphoreId(args.parse(0, "semaphore id")?),
                }
            }
            "sem_v" => {
                args.expect_count(1)?;
                KernelEvent::SemaphoreV {
                    id: SemaphoreId(args.parse(0, "semaphore id")?),
                }
            }
            "mutex_init" => {
                args.expect_count(1)?;
                KernelEvent::InitMutex {
                    id: MutexId(args.parse(0, "mutex id")?),
                }
            }
            "lock" => {
                args.expect_count(1)?;
                KernelEvent::MutexLock {
                    id: MutexId(args.parse(0, "mutex id")?),
                }
            }
            "unlock" => {
                args.expect_count(1)?;
                KernelEvent::MutexUnlock {
                    id: MutexId(args.parse(0, "mutex id")?),
                }
            }
            "tick" => {
                args.expect_count(0)?;
                KernelEvent::TimerInterrupt
            }
            _ => return Err(ScriptError::UnknownEvent(name.to_string())),
        };
        Ok(event)
    }

    /// Returns the next event, if any
    pub fn next_event(&mut self) -> Option<KernelEvent> {
        self.events.pop_front()
    }

    /// Returns true if the script has more events
    pub fn has_more(&self) -> bool {
        !self.events.is_empty()
    }

    /// Returns the number of remaining events
    pub fn remaining(&self) -> usize {
        self.events.len()
    }

    /// Renders the remaining events back to script text
    pub fn to_text(&self) -> String {
        self.events
            .iter()
            .map(|event| format!("{}\n", event))
            .collect()
    }
}

/// Arguments of one script line
struct Args<'a> {
    name: &'a str,
    values: &'a [&'a str],
    line: usize,
}

impl Args<'_> {
    fn error(&self, message: String) -> ScriptError {
        ScriptError::ParseError {
            line: self.line,
            message,
        }
    }

    fn expect_count(&self, count: usize) -> Result<(), ScriptError> {
        if self.values.len() == count {
            Ok(())
        } else {
            Err(self.error(format!(
                "{} takes {} argument(s), got {}",
                self.name,
                count,
                self.values.len()
            )))
        }
    }

    fn parse<T: FromStr>(&self, index: usize, what: &str) -> Result<T, ScriptError> {
        let raw = self.values[index];
        raw.parse()
            .map_err(|_| self.error(format!("invalid {}: {}", what, raw)))
    }
}
