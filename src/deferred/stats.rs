/*!
 * Deferred Work Statistics
 * Serializable snapshots of controller, executor and teardown state
 */

use super::mode::TimerMode;
use crate::core::types::Pid;
use serde::{Deserialize, Serialize};

/// Executor counters at a point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorStats {
    /// Executions queued
    pub submitted: u64,
    /// Submissions folded into an outstanding execution
    pub coalesced: u64,
    pub completed: u64,
    pub failed: u64,
    /// Submissions skipped because the executor lock stayed contended
    pub contended: u64,
    /// Queued or running right now
    pub pending: bool,
}

/// Controller snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerStats {
    pub mode: TimerMode,
    pub firings: u64,
    pub timer_pending: bool,
    pub monitored: Vec<Pid>,
    pub pruned_total: u64,
    /// Monitor scans skipped because the list lock stayed contended
    pub contended_scans: u64,
    pub executor: ExecutorStats,
}

/// What teardown found and released
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeardownReport {
    pub timer_was_pending: bool,
    pub work_was_pending: bool,
    pub entries_released: usize,
}
