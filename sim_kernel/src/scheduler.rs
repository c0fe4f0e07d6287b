//! Scheduler core
//!
//! Decides which process runs. The scheduler owns the running slot and the
//! ready structures; it never blocks anything on its own. Semaphores and
//! mutexes hand PCBs in and out through [`Scheduler::run_blocking`] and
//! [`Scheduler::wake`].
//!
//! ## Policies
//!
//! - **FCFS**: one FIFO, no preemption.
//! - **Round-robin**: one FIFO; the running process goes to the tail once it
//!   has used a full quantum.
//! - **Priority**: lowest priority value first. Strictly better arrivals,
//!   wake-ups and priority changes preempt. Equal priorities keep insertion
//!   order.
//! - **Multilevel**: a foreground and a background FIFO. The active level is
//!   served until it empties or its time budget runs out while the other
//!   level has work. Foreground processes are also time-sliced.
//!
//! ## Idle
//!
//! The idle process is not a PCB. An empty running slot *is* idle and is
//! reported as [`Pid::IDLE`]; it can never be queued or compared.
//!
//! ## Accounting
//!
//! `time_used` restarts from zero whenever a process is dispatched or its
//! quantum expires. Timer interrupts while idle only advance the clock.

use crate::config::KernelConfig;
use crate::pcb::Pcb;
use crate::sync::{Acquire, WakePolicy};
use core_types::{Pid, Priority, ProcessType, SchedulingAlgorithm};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use tracing::debug;

/// Scheduling event for audit trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduleEvent {
    /// Process was dispatched
    ProcessSelected { pid: Pid, timestamp_ticks: u64 },
    /// Running process was put back on a ready structure
    ProcessPreempted {
        pid: Pid,
        reason: PreemptionReason,
        timestamp_ticks: u64,
    },
    /// Running process blocked on a semaphore or mutex
    ProcessBlocked { pid: Pid, timestamp_ticks: u64 },
    /// Blocked process became runnable
    ProcessWoken { pid: Pid, timestamp_ticks: u64 },
    /// Running process exited
    ProcessExited { pid: Pid, timestamp_ticks: u64 },
    /// Multilevel scheduling changed its active level
    LevelSwitched {
        level: ProcessType,
        timestamp_ticks: u64,
    },
}

/// Reason for preemption
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PreemptionReason {
    /// Time quantum expired
    QuantumExpired,
    /// A strictly higher-priority process became ready
    HigherPriority,
    /// The multilevel level budget ran out
    LevelSwitch,
}

/// Scheduler configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub algorithm: SchedulingAlgorithm,
    /// Run time before a round-robin or foreground process is requeued
    pub quantum: u64,
    /// Run time of one multilevel level before the other gets a turn
    pub level_switch_threshold: u64,
}

impl SchedulerConfig {
    pub fn new(algorithm: SchedulingAlgorithm) -> Self {
        Self::from(&KernelConfig::new(algorithm))
    }
}

impl From<&KernelConfig> for SchedulerConfig {
    fn from(config: &KernelConfig) -> Self {
        Self {
            algorithm: config.algorithm,
            quantum: config.quantum,
            level_switch_threshold: config.level_switch_threshold,
        }
    }
}

/// Priority-ordered ready structure
///
/// Keys are `(priority, sequence)`. The sequence number grows on every
/// insertion and only breaks ties between equal priorities.
#[derive(Debug, Default)]
struct PriorityQueue {
    entries: BTreeMap<(Priority, u64), Pcb>,
    next_seq: u64,
}

impl PriorityQueue {
    fn push(&mut self, pcb: Pcb) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert((pcb.priority, seq), pcb);
    }

    fn pop_min(&mut self) -> Option<Pcb> {
        self.entries.pop_first().map(|(_, pcb)| pcb)
    }

    fn peek_min(&self) -> Option<&Pcb> {
        self.entries.values().next()
    }
}

/// Foreground and background queues of the multilevel policy
#[derive(Debug, Default)]
struct LevelQueues {
    foreground: VecDeque<Pcb>,
    background: VecDeque<Pcb>,
}

impl LevelQueues {
    fn get(&self, level: ProcessType) -> &VecDeque<Pcb> {
        match level {
            ProcessType::Foreground => &self.foreground,
            ProcessType::Background => &self.background,
        }
    }

    fn get_mut(&mut self, level: ProcessType) -> &mut VecDeque<Pcb> {
        match level {
            ProcessType::Foreground => &mut self.foreground,
            ProcessType::Background => &mut self.background,
        }
    }
}

#[derive(Debug)]
enum ReadyQueues {
    Fifo(VecDeque<Pcb>),
    Priority(PriorityQueue),
    Multilevel(LevelQueues),
}

impl ReadyQueues {
    fn for_algorithm(algorithm: SchedulingAlgorithm) -> Self {
        match algorithm {
            SchedulingAlgorithm::Fcfs | SchedulingAlgorithm::RoundRobin => {
                ReadyQueues::Fifo(VecDeque::new())
            }
            SchedulingAlgorithm::Priority => ReadyQueues::Priority(PriorityQueue::default()),
            SchedulingAlgorithm::Multilevel => ReadyQueues::Multilevel(LevelQueues::default()),
        }
    }

    fn push_back(&mut self, pcb: Pcb) {
        match self {
            ReadyQueues::Fifo(queue) => queue.push_back(pcb),
            ReadyQueues::Priority(queue) => queue.push(pcb),
            ReadyQueues::Multilevel(levels) => levels.get_mut(pcb.process_type).push_back(pcb),
        }
    }

    fn len(&self) -> usize {
        match self {
            ReadyQueues::Fifo(queue) => queue.len(),
            ReadyQueues::Priority(queue) => queue.entries.len(),
            ReadyQueues::Multilevel(levels) => levels.foreground.len() + levels.background.len(),
        }
    }

    fn iter(&self) -> Box<dyn Iterator<Item = &Pcb> + '_> {
        match self {
            ReadyQueues::Fifo(queue) => Box::new(queue.iter()),
            ReadyQueues::Priority(queue) => Box::new(queue.entries.values()),
            ReadyQueues::Multilevel(levels) => {
                Box::new(levels.foreground.iter().chain(levels.background.iter()))
            }
        }
    }
}

/// Scheduler for one simulated CPU
#[derive(Debug)]
pub struct Scheduler {
    config: SchedulerConfig,
    ready: ReadyQueues,
    running: Option<Pcb>,
    current_level: ProcessType,
    level_time: u64,
    current_ticks: u64,
    /// Audit log for scheduling events (test-only)
    audit_log: Vec<ScheduleEvent>,
}

impl Scheduler {
    /// Creates a scheduler with default timing for `algorithm`
    pub fn new(algorithm: SchedulingAlgorithm) -> Self {
        Self::with_config(SchedulerConfig::new(algorithm))
    }

    /// Creates a scheduler with custom configuration
    pub fn with_config(config: SchedulerConfig) -> Self {
        Self {
            ready: ReadyQueues::for_algorithm(config.algorithm),
            config,
            running: None,
            current_level: ProcessType::Foreground,
            level_time: 0,
            current_ticks: 0,
            audit_log: Vec::new(),
        }
    }

    /// Admits a newly arrived process
    ///
    /// An idle CPU runs it at once. Under priority scheduling it preempts a
    /// running process it strictly outranks; otherwise it waits its turn.
    pub fn admit(&mut self, pcb: Pcb) {
        match self.running.as_ref() {
            None => {
                // Nothing is ready while idle, so the arrival is picked next.
                // Going through selection keeps the multilevel active level in step.
                self.ready.push_back(pcb);
                self.dispatch_next();
            }
            Some(running) if self.config.algorithm.is_priority() && pcb.outranks(running) => {
                self.preempt_running(PreemptionReason::HigherPriority);
                self.dispatch(pcb);
            }
            Some(_) => self.ready.push_back(pcb),
        }
    }

    /// Selects and removes the next process to run
    ///
    /// Returns `None` when the idle process should run.
    pub fn choose_next_process(&mut self) -> Option<Pcb> {
        match &mut self.ready {
            ReadyQueues::Fifo(queue) => queue.pop_front(),
            ReadyQueues::Priority(queue) => queue.pop_min(),
            ReadyQueues::Multilevel(_) => self.choose_multilevel(),
        }
    }

    fn choose_multilevel(&mut self) -> Option<Pcb> {
        let active = self.current_level;
        let ReadyQueues::Multilevel(levels) = &mut self.ready else {
            return None;
        };

        if let Some(pcb) = levels.get_mut(active).pop_front() {
            return Some(pcb);
        }
        if let Some(pcb) = levels.get_mut(active.other()).pop_front() {
            self.switch_level();
            return Some(pcb);
        }
        self.level_time = 0;
        None
    }

    fn switch_level(&mut self) {
        self.current_level = self.current_level.other();
        self.level_time = 0;
        debug!(level = %self.current_level, "multilevel level switched");
        self.audit_log.push(ScheduleEvent::LevelSwitched {
            level: self.current_level,
            timestamp_ticks: self.current_ticks,
        });
    }

    /// Runs whatever selection picks, or goes idle
    pub fn dispatch_next(&mut self) {
        match self.choose_next_process() {
            Some(pcb) => self.dispatch(pcb),
            None => {
                debug!("no runnable process, idling");
                self.running = None;
            }
        }
    }

    fn dispatch(&mut self, mut pcb: Pcb) {
        pcb.reset_time();
        debug!(pid = %pcb.pid, "process dispatched");
        self.audit_log.push(ScheduleEvent::ProcessSelected {
            pid: pcb.pid,
            timestamp_ticks: self.current_ticks,
        });
        self.running = Some(pcb);
    }

    /// Moves the running process to the tail of its ready structure
    fn preempt_running(&mut self, reason: PreemptionReason) {
        if let Some(mut pcb) = self.running.take() {
            if reason == PreemptionReason::QuantumExpired {
                pcb.reset_time();
            }
            debug!(pid = %pcb.pid, ?reason, "process preempted");
            self.audit_log.push(ScheduleEvent::ProcessPreempted {
                pid: pcb.pid,
                reason,
                timestamp_ticks: self.current_ticks,
            });
            self.ready.push_back(pcb);
        }
    }

    /// Hands the running process to a blocking operation
    ///
    /// If `operation` keeps the PCB, the next process is dispatched and
    /// `true` is returned. Does nothing while idle.
    pub fn run_blocking<F>(&mut self, operation: F) -> bool
    where
        F: FnOnce(Pcb) -> Acquire,
    {
        let Some(pcb) = self.running.take() else {
            return false;
        };
        let pid = pcb.pid;
        match operation(pcb) {
            Acquire::Proceeds(pcb) => {
                self.running = Some(pcb);
                false
            }
            Acquire::Blocked => {
                debug!(%pid, "process blocked");
                self.audit_log.push(ScheduleEvent::ProcessBlocked {
                    pid,
                    timestamp_ticks: self.current_ticks,
                });
                self.dispatch_next();
                true
            }
        }
    }

    /// Makes a woken process runnable
    ///
    /// Under priority scheduling it replaces a running process it strictly
    /// outranks. Otherwise it joins the ready structure.
    pub fn wake(&mut self, pcb: Pcb) {
        debug!(pid = %pcb.pid, "process woken");
        self.audit_log.push(ScheduleEvent::ProcessWoken {
            pid: pcb.pid,
            timestamp_ticks: self.current_ticks,
        });
        self.admit(pcb);
    }

    /// Removes the running process for good and dispatches the next one
    ///
    /// Returns the exited PCB, or `None` if the CPU was idle.
    pub fn exit_running(&mut self) -> Option<Pcb> {
        let pcb = self.running.take()?;
        debug!(pid = %pcb.pid, "process exited");
        self.audit_log.push(ScheduleEvent::ProcessExited {
            pid: pcb.pid,
            timestamp_ticks: self.current_ticks,
        });
        self.dispatch_next();
        Some(pcb)
    }

    /// Changes the running process's priority
    ///
    /// Under priority scheduling, a ready process that now strictly outranks
    /// it takes the CPU. Does nothing while idle.
    pub fn set_running_priority(&mut self, priority: Priority) {
        let Some(running) = self.running.as_mut() else {
            return;
        };
        running.priority = priority;

        if let ReadyQueues::Priority(queue) = &self.ready {
            let should_yield = queue
                .peek_min()
                .is_some_and(|head| head.priority.outranks(priority));
            if should_yield {
                self.preempt_running(PreemptionReason::HigherPriority);
                self.dispatch_next();
            }
        }
    }

    /// Accounts one timer interrupt of `tick` time units
    pub fn on_timer(&mut self, tick: u64) {
        self.current_ticks += tick;
        let Some(running) = self.running.as_mut() else {
            return;
        };

        match self.config.algorithm {
            SchedulingAlgorithm::Fcfs | SchedulingAlgorithm::Priority => {
                running.time_used += tick;
            }
            SchedulingAlgorithm::RoundRobin => {
                running.time_used += tick;
                if running.time_used >= self.config.quantum {
                    self.preempt_running(PreemptionReason::QuantumExpired);
                    self.dispatch_next();
                }
            }
            SchedulingAlgorithm::Multilevel => self.multilevel_tick(tick),
        }
    }

    fn multilevel_tick(&mut self, tick: u64) {
        let serving_foreground = self.current_level == ProcessType::Foreground;
        self.level_time += tick;

        let Some(running) = self.running.as_mut() else {
            return;
        };
        if serving_foreground {
            running.time_used += tick;
        }
        let quantum_expired = serving_foreground && running.time_used >= self.config.quantum;

        if self.level_time >= self.config.level_switch_threshold {
            if self.other_level_has_work() {
                self.yield_level(quantum_expired);
                return;
            }
            self.level_time = 0;
        }

        if quantum_expired {
            self.preempt_running(PreemptionReason::QuantumExpired);
            self.dispatch_next();
        }
    }

    fn other_level_has_work(&self) -> bool {
        match &self.ready {
            ReadyQueues::Multilevel(levels) => !levels.get(self.current_level.other()).is_empty(),
            _ => false,
        }
    }

    /// Hands the CPU to the other multilevel level
    ///
    /// A process whose quantum is spent goes to the tail of its queue; one
    /// cut short by the level budget goes back to the head so it resumes
    /// first when its level comes round again.
    fn yield_level(&mut self, quantum_expired: bool) {
        let ReadyQueues::Multilevel(levels) = &mut self.ready else {
            return;
        };
        if let Some(mut pcb) = self.running.take() {
            let pid = pcb.pid;
            let queue = levels.get_mut(pcb.process_type);
            if quantum_expired {
                pcb.reset_time();
                queue.push_back(pcb);
            } else {
                queue.push_front(pcb);
            }
            debug!(%pid, "process preempted by level switch");
            self.audit_log.push(ScheduleEvent::ProcessPreempted {
                pid,
                reason: PreemptionReason::LevelSwitch,
                timestamp_ticks: self.current_ticks,
            });
        }
        self.switch_level();
        self.dispatch_next();
    }

    /// Policy the kernel uses to pick a waiter to wake
    pub fn wake_policy(&self) -> WakePolicy {
        if self.config.algorithm.is_priority() {
            WakePolicy::HighestPriority
        } else {
            WakePolicy::LowestPid
        }
    }

    /// Returns the running PCB, `None` while idle
    pub fn running(&self) -> Option<&Pcb> {
        self.running.as_ref()
    }

    /// Returns the running PID, [`Pid::IDLE`] while idle
    pub fn running_pid(&self) -> Pid {
        self.running.as_ref().map_or(Pid::IDLE, |pcb| pcb.pid)
    }

    pub fn is_idle(&self) -> bool {
        self.running.is_none()
    }

    pub fn algorithm(&self) -> SchedulingAlgorithm {
        self.config.algorithm
    }

    /// Returns ready PIDs in the order they would be selected
    ///
    /// Under multilevel scheduling the foreground queue is listed first.
    pub fn ready_pids(&self) -> Vec<Pid> {
        self.ready.iter().map(|pcb| pcb.pid).collect()
    }

    /// Returns the ready PCBs in selection order
    pub fn ready_pcbs(&self) -> Vec<&Pcb> {
        self.ready.iter().collect()
    }

    /// Returns the PIDs queued on one multilevel level
    pub fn level_pids(&self, level: ProcessType) -> Vec<Pid> {
        match &self.ready {
            ReadyQueues::Multilevel(levels) => levels.get(level).iter().map(|pcb| pcb.pid).collect(),
            _ => Vec::new(),
        }
    }

    pub fn runnable_count(&self) -> usize {
        self.ready.len()
    }

    /// Returns true if `pid` is running or ready
    pub fn contains(&self, pid: Pid) -> bool {
        self.running_pid() == pid || self.ready.iter().any(|pcb| pcb.pid == pid)
    }

    pub fn current_level(&self) -> ProcessType {
        self.current_level
    }

    pub fn level_time(&self) -> u64 {
        self.level_time
    }

    pub fn current_ticks(&self) -> u64 {
        self.current_ticks
    }

    /// Returns a reference to the audit log
    ///
    /// Used in tests to verify scheduling behavior.
    pub fn audit_log(&self) -> &[ScheduleEvent] {
        &self.audit_log
    }

    /// Clears the audit log
    pub fn clear_audit_log(&mut self) {
        self.audit_log.clear();
    }
}
