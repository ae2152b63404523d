/*!
 * Deferred Executor
 *
 * Runs one blocking procedure on tokio's blocking pool, away from the timer
 * callback. At most one execution is queued or running at a time; a submit
 * that arrives while one is outstanding is coalesced into it.
 *
 * The submitter gets control back before the work runs, so failures cannot
 * be returned to it. They are logged and counted instead.
 */

use super::stats::ExecutorStats;
use super::traits::BlockingWork;
use crate::core::errors::WorkError;
use crate::core::sync::{AtomicContext, SpinConfig, SpinLock};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// The default procedure: sleep, then report
pub struct SleepyIo {
    duration: Duration,
}

impl SleepyIo {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }
}

impl BlockingWork for SleepyIo {
    fn run(&self) -> Result<(), WorkError> {
        std::thread::sleep(self.duration);
        info!(
            "Yawn! I've been sleeping for {} seconds.",
            self.duration.as_secs_f64()
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "sleepy_io"
    }
}

/// Lock-free executor counters
#[repr(C, align(64))]
#[derive(Default)]
struct ExecutorCounters {
    submitted: AtomicU64,
    coalesced: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    contended: AtomicU64,
}

/// Coalescing work item for blocking procedures
pub struct DeferredExecutor {
    runtime: Handle,
    work: Arc<dyn BlockingWork>,
    // Shared with the timer callback, which only enters via `lock_atomic`
    inflight: SpinLock<Option<JoinHandle<()>>>,
    counters: Arc<ExecutorCounters>,
}

impl DeferredExecutor {
    /// Create an executor on the current tokio runtime
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn new(work: Arc<dyn BlockingWork>) -> Self {
        Self::with_runtime(Handle::current(), work, SpinConfig::default())
    }

    pub fn with_runtime(runtime: Handle, work: Arc<dyn BlockingWork>, spin: SpinConfig) -> Self {
        Self {
            runtime,
            work,
            inflight: SpinLock::with_config(None, spin),
            counters: Arc::new(ExecutorCounters::default()),
        }
    }

    /// Queue the procedure unless it is already queued or running
    ///
    /// Called from the timer callback. Returns immediately: `true` if a new
    /// execution was queued, `false` if the request was coalesced or the
    /// state lock stayed contended past the spin budget.
    pub fn submit(&self, ctx: &AtomicContext) -> bool {
        let mut inflight = match self.inflight.lock_atomic(ctx) {
            Ok(inflight) => inflight,
            Err(e) => {
                self.counters.contended.fetch_add(1, Ordering::Relaxed);
                warn!(work = self.work.name(), error = %e, "executor contended, submission skipped");
                return false;
            }
        };
        if inflight.as_ref().is_some_and(|task| !task.is_finished()) {
            self.counters.coalesced.fetch_add(1, Ordering::Relaxed);
            debug!(work = self.work.name(), "work already pending, submission coalesced");
            return false;
        }

        self.counters.submitted.fetch_add(1, Ordering::Relaxed);
        let work = Arc::clone(&self.work);
        let counters = Arc::clone(&self.counters);
        *inflight = Some(
            self.runtime
                .spawn_blocking(move || execute(work.as_ref(), &counters)),
        );
        debug!(work = self.work.name(), "work queued");
        true
    }

    /// Wait for any queued or running execution to finish
    ///
    /// Returns `true` if there was outstanding work.
    pub async fn drain(&self) -> bool {
        let task = self.inflight.lock().take();
        let Some(task) = task else {
            return false;
        };

        let was_pending = !task.is_finished();
        if let Err(e) = task.await {
            error!(work = self.work.name(), error = %e, "deferred work did not complete");
        }
        was_pending
    }

    pub fn is_pending(&self) -> bool {
        self.inflight
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    pub fn stats(&self) -> ExecutorStats {
        ExecutorStats {
            submitted: self.counters.submitted.load(Ordering::Relaxed),
            coalesced: self.counters.coalesced.load(Ordering::Relaxed),
            completed: self.counters.completed.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            contended: self.counters.contended.load(Ordering::Relaxed),
            pending: self.is_pending(),
        }
    }
}

fn execute(work: &dyn BlockingWork, counters: &ExecutorCounters) {
    let started = Instant::now();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| work.run()))
        .unwrap_or_else(|payload| Err(WorkError::Panicked(panic_message(payload.as_ref()))));

    match outcome {
        Ok(()) => {
            counters.completed.fetch_add(1, Ordering::Relaxed);
            debug!(
                work = work.name(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "deferred work completed"
            );
        }
        Err(e) => {
            counters.failed.fetch_add(1, Ordering::Relaxed);
            error!(work = work.name(), error = %e, "deferred work failed");
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
