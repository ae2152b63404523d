/*!
 * Deferred Work Traits
 * Seams between the timer, its callback, and blocking work
 */

use crate::core::errors::WorkError;
use crate::core::sync::AtomicContext;
use std::time::Duration;

/// What the timer should do after a callback returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rearm {
    /// Stay disarmed
    Done,
    /// Fire again this long after now
    After(Duration),
}

/// Timer callback, run in the non-blocking timer context
///
/// Implementations must not block: no sleeping, no parking locks, no I/O.
/// The only lock they can take is a `SpinLock` via `lock_atomic(ctx)`.
pub trait TimerCallback: Send + Sync + 'static {
    fn on_fire(&self, ctx: &AtomicContext) -> Rearm;
}

/// Long-running procedure executed off the timer path
pub trait BlockingWork: Send + Sync + 'static {
    /// Run to completion; may block the calling thread
    fn run(&self) -> Result<(), WorkError>;

    /// Name for logs
    fn name(&self) -> &'static str {
        "blocking_work"
    }
}
