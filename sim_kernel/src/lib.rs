//! # Simulated Kernel
//!
//! This crate provides the kernel side of the event-handling contract.
//!
//! ## Purpose
//!
//! The simulated kernel answers one question per event: which process runs
//! now? It does so by composing three parts:
//! - [`scheduler::Scheduler`]: running slot and ready structures
//! - [`sync`]: semaphores and mutexes holding blocked processes
//! - [`mmu::MemoryManager`]: best-fit physical memory with coalescing
//!
//! ## Philosophy
//!
//! **Deterministic and inspectable.**
//!
//! Time only moves on timer interrupts. There are no threads and no globals;
//! the kernel is one value passed by `&mut` to every handler, and all of its
//! state can be read back by tests.
//!
//! Handlers validate before they mutate. An `Err` leaves the kernel exactly
//! as it was.

pub mod config;
pub mod mmu;
pub mod pcb;
pub mod scheduler;
pub mod sync;
pub mod test_utils;

pub use config::KernelConfig;
pub use mmu::{MemoryEvent, MemoryManager};
pub use pcb::Pcb;
pub use scheduler::{PreemptionReason, ScheduleEvent, Scheduler, SchedulerConfig};
pub use sync::{Acquire, Mutex, Semaphore, WakePolicy};

use core_types::{MutexId, Pid, Priority, ProcessType, SemaphoreId};
use kernel_api::{KernelError, KernelEvent, KernelEvents, MemoryError};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Simulated kernel state
///
/// Unlike a real kernel, this state is directly accessible for testing.
#[derive(Debug)]
pub struct SimulatedKernel {
    config: KernelConfig,
    /// Running process and ready structures
    scheduler: Scheduler,
    /// Semaphores by driver-assigned id
    semaphores: HashMap<SemaphoreId, Semaphore>,
    /// Mutexes by driver-assigned id
    mutexes: HashMap<MutexId, Mutex>,
    /// Physical memory
    memory: MemoryManager,
}

impl SimulatedKernel {
    /// Creates a kernel with kernel space already reserved
    pub fn new(config: KernelConfig) -> Result<Self, KernelError> {
        config.validate()?;
        let memory = MemoryManager::with_kernel_block(
            config.memory_size,
            config.kernel_reserved,
            config.logical_base,
        )?;
        info!(
            algorithm = %config.algorithm,
            memory_size = config.memory_size,
            kernel_reserved = config.kernel_reserved,
            "simulated kernel started"
        );

        Ok(Self {
            scheduler: Scheduler::with_config(SchedulerConfig::from(&config)),
            semaphores: HashMap::new(),
            mutexes: HashMap::new(),
            memory,
            config,
        })
    }

    /// Applies one decoded event
    pub fn handle_event(&mut self, event: &KernelEvent) -> Result<Pid, KernelError> {
        let outcome = event.apply(self);
        if let Err(err) = &outcome {
            warn!(event = event.name(), error = %err, "event rejected");
        }
        outcome
    }

    /// Returns the running PID, [`Pid::IDLE`] while idle
    pub fn running_pid(&self) -> Pid {
        self.scheduler.running_pid()
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn memory(&self) -> &MemoryManager {
        &self.memory
    }

    pub fn semaphore(&self, id: SemaphoreId) -> Option<&Semaphore> {
        self.semaphores.get(&id)
    }

    pub fn semaphores(&self) -> impl Iterator<Item = (&SemaphoreId, &Semaphore)> {
        self.semaphores.iter()
    }

    pub fn mutex(&self, id: MutexId) -> Option<&Mutex> {
        self.mutexes.get(&id)
    }

    pub fn mutexes(&self) -> impl Iterator<Item = (&MutexId, &Mutex)> {
        self.mutexes.iter()
    }

    /// Returns true if `pid` is running, ready or blocked
    ///
    /// Every resident process holds exactly one memory reservation, so
    /// residency is read from the memory manager.
    pub fn is_resident(&self, pid: Pid) -> bool {
        pid.is_user() && self.memory.is_reserved(pid)
    }

    /// Returns the PIDs of all resident processes, in ascending order
    pub fn resident_pids(&self) -> Vec<Pid> {
        let mut pids: Vec<Pid> = self
            .memory
            .reservations()
            .into_iter()
            .map(|(pid, _)| pid)
            .filter(|pid| pid.is_user())
            .collect();
        pids.sort();
        pids
    }

    /// Translates a logical address of `pid` to a physical one
    pub fn translate(&self, logical_address: u64, pid: Pid) -> Option<u64> {
        self.memory.translate(logical_address, pid)
    }

    /// Releases every mutex still held by the exited `pid`
    ///
    /// A mutex with waiters passes to the one the wake policy selects, as on
    /// an unlock. PIDs can be reused once a process exits, so ownership must
    /// not outlive the process.
    fn release_mutexes_of(&mut self, pid: Pid) {
        let policy = self.scheduler.wake_policy();
        let mut held: Vec<MutexId> = self
            .mutexes
            .iter()
            .filter(|(_, mutex)| mutex.is_owned_by(pid))
            .map(|(&id, _)| id)
            .collect();
        held.sort();

        for id in held {
            let Some(mutex) = self.mutexes.get_mut(&id) else {
                continue;
            };
            match mutex.hand_off(policy) {
                Some(successor) => {
                    debug!(
                        from = %pid,
                        to = %successor.pid,
                        %id,
                        "mutex of exited process handed off"
                    );
                    self.scheduler.wake(successor);
                }
                None => {
                    debug!(%pid, %id, "mutex of exited process released");
                    mutex.release();
                }
            }
        }
    }

    fn running_or(&self, operation: &'static str) -> Result<Pid, KernelError> {
        match self.scheduler.running() {
            Some(pcb) => Ok(pcb.pid),
            None => Err(KernelError::IdleProcess(operation)),
        }
    }
}

impl KernelEvents for SimulatedKernel {
    fn process_arrived(
        &mut self,
        pid: Pid,
        priority: Priority,
        process_type: ProcessType,
        memory_needed: u64,
    ) -> Result<Pid, KernelError> {
        if !pid.is_user() {
            return Err(KernelError::InvalidPid(pid));
        }
        if self.is_resident(pid) {
            return Err(KernelError::PidInUse(pid));
        }

        let range = self
            .memory
            .reserve(memory_needed, pid)
            .map_err(|source| match source {
                MemoryError::Exhausted { .. } => KernelError::OutOfMemory { pid, source },
                other => KernelError::Memory(other),
            })?;

        info!(%pid, %priority, %process_type, %range, "process arrived");
        self.scheduler.admit(Pcb::new(pid, priority, process_type));
        Ok(self.running_pid())
    }

    fn syscall_exit(&mut self) -> Result<Pid, KernelError> {
        let pid = self.running_or("exit")?;
        let range = self.memory.free(pid)?;
        self.scheduler.exit_running();
        info!(%pid, %range, "process exited");
        self.release_mutexes_of(pid);
        Ok(self.running_pid())
    }

    fn syscall_set_priority(&mut self, new_priority: Priority) -> Result<Pid, KernelError> {
        let pid = self.running_or("set_priority")?;
        debug!(%pid, priority = %new_priority, "priority changed");
        self.scheduler.set_running_priority(new_priority);
        Ok(self.running_pid())
    }

    fn syscall_init_semaphore(
        &mut self,
        semaphore_id: SemaphoreId,
        initial_value: i64,
    ) -> Result<Pid, KernelError> {
        self.running_or("sem_init")?;
        if self.semaphores.contains_key(&semaphore_id) {
            return Err(KernelError::SemaphoreExists(semaphore_id));
        }
        if initial_value < 0 {
            return Err(KernelError::InvalidSemaphoreValue {
                semaphore: semaphore_id,
                value: initial_value,
            });
        }
        self.semaphores.insert(semaphore_id, Semaphore::new(initial_value));
        debug!(id = %semaphore_id, initial_value, "semaphore created");
        Ok(self.running_pid())
    }

    fn syscall_semaphore_p(&mut self, semaphore_id: SemaphoreId) -> Result<Pid, KernelError> {
        let pid = self.running_or("sem_p")?;
        let semaphore = self
            .semaphores
            .get_mut(&semaphore_id)
            .ok_or(KernelError::UnknownSemaphore(semaphore_id))?;

        if self.scheduler.run_blocking(|pcb| semaphore.acquire_by(pcb)) {
            debug!(%pid, id = %semaphore_id, "blocked on semaphore");
        }
        Ok(self.running_pid())
    }

    fn syscall_semaphore_v(&mut self, semaphore_id: SemaphoreId) -> Result<Pid, KernelError> {
        self.running_or("sem_v")?;
        let policy = self.scheduler.wake_policy();
        let semaphore = self
            .semaphores
            .get_mut(&semaphore_id)
            .ok_or(KernelError::UnknownSemaphore(semaphore_id))?;

        semaphore.release();
        if let Some(waiter) = semaphore.take_waiter(policy) {
            debug!(pid = %waiter.pid, id = %semaphore_id, "semaphore waiter released");
            self.scheduler.wake(waiter);
        }
        Ok(self.running_pid())
    }

    fn syscall_init_mutex(&mut self, mutex_id: MutexId) -> Result<Pid, KernelError> {
        self.running_or("mutex_init")?;
        if self.mutexes.contains_key(&mutex_id) {
            return Err(KernelError::MutexExists(mutex_id));
        }
        self.mutexes.insert(mutex_id, Mutex::new());
        debug!(id = %mutex_id, "mutex created");
        Ok(self.running_pid())
    }

    fn syscall_mutex_lock(&mut self, mutex_id: MutexId) -> Result<Pid, KernelError> {
        let pid = self.running_or("lock")?;
        let mutex = self
            .mutexes
            .get_mut(&mutex_id)
            .ok_or(KernelError::UnknownMutex(mutex_id))?;

        if self.scheduler.run_blocking(|pcb| mutex.lock_by(pcb)) {
            debug!(%pid, id = %mutex_id, "blocked on mutex");
        }
        Ok(self.running_pid())
    }

    fn syscall_mutex_unlock(&mut self, mutex_id: MutexId) -> Result<Pid, KernelError> {
        let pid = self.running_or("unlock")?;
        let policy = self.scheduler.wake_policy();
        let mutex = self
            .mutexes
            .get_mut(&mutex_id)
            .ok_or(KernelError::UnknownMutex(mutex_id))?;

        if !mutex.is_owned_by(pid) {
            warn!(%pid, id = %mutex_id, owner = ?mutex.owner(), "unlock by non-owner");
            return Err(KernelError::NotMutexOwner { mutex: mutex_id, pid });
        }

        match mutex.hand_off(policy) {
            Some(successor) => {
                debug!(from = %pid, to = %successor.pid, id = %mutex_id, "mutex handed off");
                self.scheduler.wake(successor);
            }
            None => mutex.release(),
        }
        Ok(self.running_pid())
    }

    fn timer_interrupt(&mut self) -> Result<Pid, KernelError> {
        self.scheduler.on_timer(self.config.timer_tick);
        Ok(self.running_pid())
    }
}
