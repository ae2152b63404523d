/*!
 * Process Table
 *
 * In-memory stand-in for the host's task list. Lookups run under DashMap's
 * per-shard read lock and take the strong reference before that lock is
 * dropped, so a concurrent `exit` (which needs the shard's write lock to
 * reap) can never free a task between lookup and acquisition.
 */

use super::handle::{RefAccounting, Task, TaskRef};
use super::traits::ProcessRegistry;
use crate::core::errors::DeviceError;
use crate::core::types::{DeviceResult, Pid};
use ahash::RandomState;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

pub struct ProcessTable {
    tasks: DashMap<Pid, Arc<Task>, RandomState>,
    next_pid: AtomicU32,
    accounting: Arc<RefAccounting>,
}

impl ProcessTable {
    pub fn new() -> Self {
        Self {
            tasks: DashMap::with_hasher(RandomState::new()),
            next_pid: AtomicU32::new(1),
            accounting: Arc::new(RefAccounting::default()),
        }
    }

    /// Start a task with the next free pid
    pub fn spawn(&self, comm: impl Into<String>) -> Pid {
        let comm = comm.into();
        loop {
            let pid = self.next_pid.fetch_add(1, Ordering::Relaxed);
            if let Entry::Vacant(slot) = self.tasks.entry(pid) {
                slot.insert(Arc::new(Task::new(pid, comm)));
                info!(pid, "task spawned");
                return pid;
            }
        }
    }

    /// Start a task under a caller-chosen pid
    pub fn spawn_with_pid(&self, pid: Pid, comm: impl Into<String>) -> DeviceResult<Pid> {
        match self.tasks.entry(pid) {
            Entry::Occupied(_) => Err(DeviceError::PidInUse(pid)),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(Task::new(pid, comm.into())));
                info!(pid, "task spawned");
                Ok(pid)
            }
        }
    }

    /// Terminate and reap a task
    ///
    /// Outstanding `TaskRef`s keep the object alive and observe it as dead.
    pub fn exit(&self, pid: Pid) -> bool {
        match self.tasks.remove(&pid) {
            Some((_, task)) => {
                task.mark_dead();
                info!(pid, comm = task.comm(), usage = task.usage(), "task exited");
                true
            }
            None => {
                debug!(pid, "exit of unknown task ignored");
                false
            }
        }
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.tasks.contains_key(&pid)
    }

    /// Outstanding references to a live task
    pub fn usage(&self, pid: Pid) -> Option<usize> {
        self.tasks.get(&pid).map(|task| task.usage())
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// References handed out since creation
    pub fn resolves(&self) -> u64 {
        self.accounting.resolves.load(Ordering::Relaxed)
    }

    /// References put back since creation
    pub fn releases(&self) -> u64 {
        self.accounting.releases.load(Ordering::Relaxed)
    }

    /// References currently held anywhere
    pub fn outstanding(&self) -> u64 {
        self.resolves().saturating_sub(self.releases())
    }
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessRegistry for ProcessTable {
    fn resolve(&self, pid: Pid) -> DeviceResult<TaskRef> {
        let task = self.tasks.get(&pid).ok_or(DeviceError::NotFound(pid))?;
        Ok(TaskRef::acquire(task.value(), &self.accounting))
    }
}
