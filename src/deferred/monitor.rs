/*!
 * Monitor List
 *
 * Owned task references under a spin lock shared by the command context
 * (insert, teardown) and the timer callback (scan). Every removal path drops
 * the entry while the lock is held, which releases its `TaskRef` exactly
 * once.
 */

use crate::core::errors::DeviceError;
use crate::core::sync::{AtomicContext, SpinConfig, SpinLock};
use crate::core::types::{DeviceResult, Pid};
use crate::process::TaskRef;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

/// One observed process
#[derive(Debug)]
pub struct MonitorEntry {
    task: TaskRef,
}

impl MonitorEntry {
    #[inline]
    pub fn pid(&self) -> Pid {
        self.task.pid()
    }

    #[inline]
    pub fn comm(&self) -> &str {
        self.task.comm()
    }

    #[inline]
    pub fn is_dead(&self) -> bool {
        self.task.is_dead()
    }
}

pub struct MonitorList {
    entries: SpinLock<Vec<MonitorEntry>>,
    capacity: usize,
    pruned: AtomicU64,
    contended: AtomicU64,
}

impl MonitorList {
    /// `capacity` bounds the entry pool; inserts beyond it fail with
    /// `OutOfMemory`.
    pub fn new(capacity: usize, spin: SpinConfig) -> Self {
        Self {
            entries: SpinLock::with_config(Vec::new(), spin),
            capacity,
            pruned: AtomicU64::new(0),
            contended: AtomicU64::new(0),
        }
    }

    /// Append an entry for `task`
    ///
    /// On failure nothing is inserted and `task` is released.
    pub fn insert(&self, task: TaskRef) -> DeviceResult<()> {
        let pid = task.pid();
        let mut entries = self.entries.lock();
        if entries.len() >= self.capacity {
            return Err(DeviceError::OutOfMemory(format!(
                "monitor pool exhausted ({} entries)",
                self.capacity
            )));
        }
        entries
            .try_reserve(1)
            .map_err(|e| DeviceError::OutOfMemory(e.to_string()))?;
        entries.push(MonitorEntry { task });
        debug!(pid, monitored = entries.len(), "task added to monitor list");
        Ok(())
    }

    /// Drop every entry whose task is dead
    ///
    /// Returns the number pruned, or `None` if the lock stayed contended for
    /// the whole spin budget; the caller retries on its next period.
    pub fn scan_and_prune(&self, ctx: &AtomicContext) -> Option<usize> {
        let mut entries = match self.entries.lock_atomic(ctx) {
            Ok(entries) => entries,
            Err(e) => {
                self.contended.fetch_add(1, Ordering::Relaxed);
                warn!(error = %e, "monitor list contended, scan skipped");
                return None;
            }
        };

        let before = entries.len();
        entries.retain(|entry| {
            if entry.is_dead() {
                info!("task {} ({}) is dead", entry.comm(), entry.pid());
                false
            } else {
                true
            }
        });
        let pruned = before - entries.len();

        self.pruned.fetch_add(pruned as u64, Ordering::Relaxed);
        Some(pruned)
    }

    /// Remove and release every entry
    pub fn drain_all(&self) -> usize {
        let mut entries = self.entries.lock();
        let released = entries.len();
        entries.clear();
        entries.shrink_to_fit();
        released
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn pids(&self) -> Vec<Pid> {
        self.entries.lock().iter().map(MonitorEntry::pid).collect()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries pruned as dead since creation
    pub fn pruned_total(&self) -> u64 {
        self.pruned.load(Ordering::Relaxed)
    }

    pub fn contended_scans(&self) -> u64 {
        self.contended.load(Ordering::Relaxed)
    }
}
