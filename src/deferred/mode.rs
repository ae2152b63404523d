/*!
 * Timer Mode
 * Selects what the timer callback does on each firing
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Behavior selected for the next timer firing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum TimerMode {
    /// No timer effect configured
    None = 0,
    /// Fire once and only log
    OneShot = 1,
    /// Fire once and hand blocking work to the executor
    DeferredBlocking = 2,
    /// Fire every period and prune dead monitored tasks
    ProcessMonitor = 3,
}

impl TimerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerMode::None => "none",
            TimerMode::OneShot => "one_shot",
            TimerMode::DeferredBlocking => "deferred_blocking",
            TimerMode::ProcessMonitor => "process_monitor",
        }
    }

    #[inline]
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => TimerMode::OneShot,
            2 => TimerMode::DeferredBlocking,
            3 => TimerMode::ProcessMonitor,
            _ => TimerMode::None,
        }
    }
}

impl fmt::Display for TimerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mode flag shared between the command and timer contexts
///
/// Single writer (command context), relaxed reads. A stale read only picks
/// a different branch of the callback, never breaks an invariant.
#[derive(Debug)]
pub struct AtomicMode(AtomicU8);

impl AtomicMode {
    pub const fn new(mode: TimerMode) -> Self {
        Self(AtomicU8::new(mode as u8))
    }

    #[inline(always)]
    pub fn load(&self) -> TimerMode {
        TimerMode::from_u8(self.0.load(Ordering::Relaxed))
    }

    #[inline(always)]
    pub fn store(&self, mode: TimerMode) {
        self.0.store(mode as u8, Ordering::Relaxed);
    }
}

impl Default for AtomicMode {
    fn default() -> Self {
        Self::new(TimerMode::None)
    }
}
