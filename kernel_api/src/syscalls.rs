//! Events as data
//!
//! [`KernelEvent`] is the serializable form of one call on the
//! [`KernelEvents`] contract. Drivers that read scenarios from a file build
//! a `Vec<KernelEvent>` and replay it with [`KernelEvent::apply`].

use crate::{KernelError, KernelEvents};
use core_types::{MutexId, Pid, Priority, ProcessType, SemaphoreId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Value a driver records when an arrival could not be admitted
pub const FAILURE_SENTINEL: i64 = -1;

/// One simulated event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum KernelEvent {
    ProcessArrived {
        pid: Pid,
        priority: Priority,
        #[serde(default)]
        process_type: ProcessType,
        memory_needed: u64,
    },
    Exit,
    SetPriority {
        priority: Priority,
    },
    InitSemaphore {
        id: SemaphoreId,
        initial_value: i64,
    },
    SemaphoreP {
        id: SemaphoreId,
    },
    SemaphoreV {
        id: SemaphoreId,
    },
    InitMutex {
        id: MutexId,
    },
    MutexLock {
        id: MutexId,
    },
    MutexUnlock {
        id: MutexId,
    },
    TimerInterrupt,
}

impl KernelEvent {
    /// Delivers this event to a kernel
    pub fn apply<K: KernelEvents + ?Sized>(&self, kernel: &mut K) -> Result<Pid, KernelError> {
        match *self {
            KernelEvent::ProcessArrived {
                pid,
                priority,
                process_type,
                memory_needed,
            } => kernel.process_arrived(pid, priority, process_type, memory_needed),
            KernelEvent::Exit => kernel.syscall_exit(),
            KernelEvent::SetPriority { priority } => kernel.syscall_set_priority(priority),
            KernelEvent::InitSemaphore { id, initial_value } => {
                kernel.syscall_init_semaphore(id, initial_value)
            }
            KernelEvent::SemaphoreP { id } => kernel.syscall_semaphore_p(id),
            KernelEvent::SemaphoreV { id } => kernel.syscall_semaphore_v(id),
            KernelEvent::InitMutex { id } => kernel.syscall_init_mutex(id),
            KernelEvent::MutexLock { id } => kernel.syscall_mutex_lock(id),
            KernelEvent::MutexUnlock { id } => kernel.syscall_mutex_unlock(id),
            KernelEvent::TimerInterrupt => kernel.timer_interrupt(),
        }
    }

    /// Short name used in logs and host output
    pub fn name(&self) -> &'static str {
        match self {
            KernelEvent::ProcessArrived { .. } => "arrive",
            KernelEvent::Exit => "exit",
            KernelEvent::SetPriority { .. } => "priority",
            KernelEvent::InitSemaphore { .. } => "sem_init",
            KernelEvent::SemaphoreP { .. } => "sem_p",
            KernelEvent::SemaphoreV { .. } => "sem_v",
            KernelEvent::InitMutex { .. } => "mutex_init",
            KernelEvent::MutexLock { .. } => "lock",
            KernelEvent::MutexUnlock { .. } => "unlock",
            KernelEvent::TimerInterrupt => "tick",
        }
    }
}

impl fmt::Display for KernelEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelEvent::ProcessArrived {
                pid,
                priority,
                process_type,
                memory_needed,
            } => write!(
                f,
                "arrive {} {} {} {}",
                pid, priority, process_type, memory_needed
            ),
            KernelEvent::SetPriority { priority } => write!(f, "priority {}", priority),
            KernelEvent::InitSemaphore { id, initial_value } => {
                write!(f, "sem_init {} {}", id.0, initial_value)
            }
            KernelEvent::SemaphoreP { id } => write!(f, "sem_p {}", id.0),
            KernelEvent::SemaphoreV { id } => write!(f, "sem_v {}", id.0),
            KernelEvent::InitMutex { id } => write!(f, "mutex_init {}", id.0),
            KernelEvent::MutexLock { id } => write!(f, "lock {}", id.0),
            KernelEvent::MutexUnlock { id } => write!(f, "unlock {}", id.0),
            KernelEvent::Exit | KernelEvent::TimerInterrupt => write!(f, "{}", self.name()),
        }
    }
}

/// Renders one handler result as a driver output line
///
/// Running PIDs print as bare numbers and failed arrivals as
/// [`FAILURE_SENTINEL`]. Other rejected events print their error.
pub fn render_outcome(outcome: &Result<Pid, KernelError>) -> String {
    match outcome {
        Ok(pid) => pid.to_string(),
        Err(err) if err.is_out_of_memory() => FAILURE_SENTINEL.to_string(),
        Err(err) => format!("error: {}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryError;

    #[derive(Default)]
    struct RecordingKernel {
        calls: Vec<&'static str>,
    }

    impl KernelEvents for RecordingKernel {
        fn process_arrived(
            &mut self,
            pid: Pid,
            _priority: Priority,
            _process_type: ProcessType,
            _memory_needed: u64,
        ) -> Result<Pid, KernelError> {
            self.calls.push("arrive");
            Ok(pid)
        }

        fn syscall_exit(&mut self) -> Result<Pid, KernelError> {
            self.calls.push("exit");
            Ok(Pid::IDLE)
        }

        fn syscall_set_priority(&mut self, _new_priority: Priority) -> Result<Pid, KernelError> {
            self.calls.push("priority");
            Ok(Pid::IDLE)
        }

        fn syscall_init_semaphore(
            &mut self,
            _semaphore_id: SemaphoreId,
            _initial_value: i64,
        ) -> Result<Pid, KernelError> {
            self.calls.push("sem_init");
            Ok(Pid::IDLE)
        }

        fn syscall_semaphore_p(&mut self, _semaphore_id: SemaphoreId) -> Result<Pid, KernelError> {
            self.calls.push("sem_p");
            Ok(Pid::IDLE)
        }

        fn syscall_semaphore_v(&mut self, _semaphore_id: SemaphoreId) -> Result<Pid, KernelError> {
            self.calls.push("sem_v");
            Ok(Pid::IDLE)
        }

        fn syscall_init_mutex(&mut self, _mutex_id: MutexId) -> Result<Pid, KernelError> {
            self.calls.push("mutex_init");
            Ok(Pid::IDLE)
        }

        fn syscall_mutex_lock(&mut self, _mutex_id: MutexId) -> Result<Pid, KernelError> {
            self.calls.push("lock");
            Ok(Pid::IDLE)
        }

        fn syscall_mutex_unlock(&mut self, _mutex_id: MutexId) -> Result<Pid, KernelError> {
            self.calls.push("unlock");
            Ok(Pid::IDLE)
        }

        fn timer_interrupt(&mut self) -> Result<Pid, KernelError> {
            self.calls.push("tick");
            Ok(Pid::IDLE)
        }
    }

    #[test]
    fn test_apply_dispatches_to_matching_handler() {
        let events = vec![
            KernelEvent::ProcessArrived {
                pid: Pid::new(3),
                priority: Priority::new(1),
                process_type: ProcessType::Background,
                memory_needed: 64,
            },
            KernelEvent::InitMutex { id: MutexId(1) },
            KernelEvent::MutexLock { id: MutexId(1) },
            KernelEvent::TimerInterrupt,
            KernelEvent::Exit,
        ];

        let mut kernel = RecordingKernel::default();
        let first = events[0].apply(&mut kernel).unwrap();
        for event in &events[1..] {
            event.apply(&mut kernel).unwrap();
        }

        assert_eq!(first, Pid::new(3));
        let expected: Vec<&str> = events.iter().map(|e| e.name()).collect();
        assert_eq!(kernel.calls, expected);
    }

    #[test]
    fn test_event_json_uses_tagged_snake_case() {
        let event = KernelEvent::SemaphoreP { id: SemaphoreId(4) };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"event":"semaphore_p","id":4}"#);
    }

    #[test]
    fn test_arrival_process_type_defaults_to_foreground() {
        let json = r#"{"event":"process_arrived","pid":1,"priority":2,"memory_needed":10}"#;
        let event: KernelEvent = serde_json::from_str(json).unwrap();
        assert_eq!(
            event,
            KernelEvent::ProcessArrived {
                pid: Pid::new(1),
                priority: Priority::new(2),
                process_type: ProcessType::Foreground,
                memory_needed: 10,
            }
        );
    }

    #[test]
    fn test_render_outcome() {
        assert_eq!(render_outcome(&Ok(Pid::new(7))), "7");
        let oom = Err(KernelError::OutOfMemory {
            pid: Pid::new(7),
            source: MemoryError::Exhausted {
                requested: 10,
                largest_free: 5,
            },
        });
        assert_eq!(render_outcome(&oom), "-1");
        let unknown = Err(KernelError::UnknownMutex(MutexId(9)));
        assert_eq!(render_outcome(&unknown), "error: Unknown mutex: Mutex(9)");
    }
}
