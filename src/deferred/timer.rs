/*!
 * Deferred Timer
 *
 * A single re-armable timer backed by one tokio task. The callback runs
 * synchronously inside that task and reports whether it wants to fire
 * again; the periodic case is the loop in `run_timer`, not a callback that
 * reschedules itself.
 *
 * Arming replaces the pending deadline. Abort only lands at a task's sleep,
 * so a replaced task whose callback is mid-firing keeps running until the
 * callback returns. Replaced tasks stay in the slot until they finish and
 * `cancel` awaits every one of them: no callback runs after it returns.
 */

use super::traits::{Rearm, TimerCallback};
use crate::core::sync::AtomicContext;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

#[derive(Default)]
struct TimerSlot {
    task: Option<JoinHandle<()>>,
    // Aborted but possibly still inside the callback
    retired: Vec<JoinHandle<()>>,
    disabled: bool,
}

/// One-deadline timer driving a `TimerCallback`
pub struct DeferredTimer {
    runtime: Handle,
    callback: Arc<dyn TimerCallback>,
    // Command context only; the callback never touches the slot
    slot: Mutex<TimerSlot>,
}

impl DeferredTimer {
    /// Create a timer on the current tokio runtime
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn new(callback: Arc<dyn TimerCallback>) -> Self {
        Self::with_runtime(Handle::current(), callback)
    }

    pub fn with_runtime(runtime: Handle, callback: Arc<dyn TimerCallback>) -> Self {
        Self {
            runtime,
            callback,
            slot: Mutex::new(TimerSlot::default()),
        }
    }

    /// Schedule a firing `delay` from now, replacing any pending deadline
    ///
    /// Returns `true` if a pending deadline was replaced. Ignored once the
    /// timer has been shut down.
    pub fn arm(&self, delay: Duration) -> bool {
        let mut slot = self.slot.lock();
        if slot.disabled {
            warn!(delay_ms = delay.as_millis() as u64, "arm after shutdown ignored");
            return false;
        }

        slot.retired.retain(|task| !task.is_finished());
        let replaced = match slot.task.take() {
            Some(task) if !task.is_finished() => {
                task.abort();
                slot.retired.push(task);
                true
            }
            _ => false,
        };

        let callback = Arc::clone(&self.callback);
        slot.task = Some(self.runtime.spawn(run_timer(callback, delay)));
        debug!(delay_ms = delay.as_millis() as u64, replaced, "timer armed");
        replaced
    }

    /// Synchronously cancel the timer
    ///
    /// Returns once no callback is running or will run, including callbacks
    /// of deadlines that were replaced while firing. Returns `true` if a
    /// deadline was pending. Cancelling an idle timer is a no-op.
    pub async fn cancel(&self) -> bool {
        let (task, retired) = {
            let mut slot = self.slot.lock();
            (slot.task.take(), std::mem::take(&mut slot.retired))
        };

        let was_pending = task.as_ref().is_some_and(|task| !task.is_finished());
        let waited = retired.len();
        for task in task.into_iter().chain(retired) {
            task.abort();
            if let Err(e) = task.await {
                if e.is_panic() {
                    error!(error = %e, "timer callback panicked");
                }
            }
        }
        debug!(was_pending, retired = waited, "timer cancelled");
        was_pending
    }

    /// Refuse further arming, then cancel synchronously
    pub async fn shutdown(&self) -> bool {
        self.slot.lock().disabled = true;
        self.cancel().await
    }

    /// Abort without waiting; for drop paths that cannot await
    pub fn abort(&self) {
        let mut slot = self.slot.lock();
        slot.disabled = true;
        let task = slot.task.take();
        for task in task.into_iter().chain(slot.retired.drain(..)) {
            task.abort();
        }
    }

    /// Whether a deadline is pending or a callback is running
    pub fn is_pending(&self) -> bool {
        let slot = self.slot.lock();
        slot.task.as_ref().is_some_and(|task| !task.is_finished())
            || slot.retired.iter().any(|task| !task.is_finished())
    }
}

async fn run_timer(callback: Arc<dyn TimerCallback>, first: Duration) {
    let mut delay = first;
    loop {
        tokio::time::sleep(delay).await;

        let rearm = {
            let ctx = AtomicContext::enter();
            callback.on_fire(&ctx)
        };

        match rearm {
            Rearm::Done => break,
            Rearm::After(next) => delay = next,
        }
    }
}
