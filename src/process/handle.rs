/*!
 * Task Handles
 *
 * A `TaskRef` is an owned, counted reference to a task object. Creating one
 * bumps the task's usage count; dropping it puts the count back. There is no
 * `Clone`: every reference comes from a registry lookup and is released
 * exactly once, on whichever path drops it.
 */

use super::types::TaskState;
use crate::core::types::Pid;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::trace;

/// Task object owned by the process table
pub struct Task {
    pid: Pid,
    comm: String,
    state: AtomicU8,
    usage: AtomicUsize,
}

impl Task {
    pub(crate) fn new(pid: Pid, comm: String) -> Self {
        Self {
            pid,
            comm,
            state: AtomicU8::new(TaskState::Running as u8),
            usage: AtomicUsize::new(0),
        }
    }

    #[inline]
    pub fn pid(&self) -> Pid {
        self.pid
    }

    #[inline]
    pub fn comm(&self) -> &str {
        &self.comm
    }

    #[inline]
    pub fn state(&self) -> TaskState {
        TaskState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Outstanding `TaskRef`s for this task
    #[inline]
    pub fn usage(&self) -> usize {
        self.usage.load(Ordering::Acquire)
    }

    pub(crate) fn mark_dead(&self) {
        self.state.store(TaskState::Dead as u8, Ordering::Release);
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("pid", &self.pid)
            .field("comm", &self.comm)
            .field("state", &self.state())
            .field("usage", &self.usage())
            .finish()
    }
}

/// Table-wide reference accounting
#[derive(Debug, Default)]
pub(crate) struct RefAccounting {
    pub(crate) resolves: AtomicU64,
    pub(crate) releases: AtomicU64,
}

/// Owned reference to a task
///
/// Keeps the task object valid for as long as it exists, even after the
/// process has exited and been reaped from the table.
pub struct TaskRef {
    task: Arc<Task>,
    accounting: Arc<RefAccounting>,
}

impl TaskRef {
    /// Take a counted reference. Callers must hold the table's read-side
    /// lock for `task` so it cannot be reaped in between.
    pub(crate) fn acquire(task: &Arc<Task>, accounting: &Arc<RefAccounting>) -> Self {
        task.usage.fetch_add(1, Ordering::AcqRel);
        accounting.resolves.fetch_add(1, Ordering::Relaxed);
        trace!(pid = task.pid, "task reference acquired");
        Self {
            task: Arc::clone(task),
            accounting: Arc::clone(accounting),
        }
    }

    #[inline]
    pub fn pid(&self) -> Pid {
        self.task.pid()
    }

    #[inline]
    pub fn comm(&self) -> &str {
        self.task.comm()
    }

    #[inline]
    pub fn state(&self) -> TaskState {
        self.task.state()
    }

    #[inline]
    pub fn is_dead(&self) -> bool {
        self.state() == TaskState::Dead
    }

    #[inline]
    pub fn task(&self) -> &Task {
        &self.task
    }

    /// Release the reference now rather than at end of scope
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for TaskRef {
    fn drop(&mut self) {
        self.task.usage.fetch_sub(1, Ordering::AcqRel);
        self.accounting.releases.fetch_add(1, Ordering::Relaxed);
        trace!(pid = self.task.pid, "task reference released");
    }
}

impl fmt::Debug for TaskRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TaskRef").field(&self.task).finish()
    }
}
