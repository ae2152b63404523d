/*!
 * Deferred Controller
 *
 * The device state machine. One timer, one mode flag, one blocking work
 * item and one monitor list, driven by four control commands:
 *
 * - `arm(delay)`: fire once after `delay` and only log
 * - `cancel()`: stop the timer synchronously
 * - `arm_deferred(delay)`: fire once and hand blocking work to the executor
 * - `monitor(pid, period)`: watch a task and prune it once it has died,
 *   firing every `period` until cancelled
 *
 * Teardown order is timer, then executor, then monitor list. With the timer
 * gone nothing can submit work or scan the list while they are drained.
 */

use super::config::DeviceConfig;
use super::executor::{DeferredExecutor, SleepyIo};
use super::mode::{AtomicMode, TimerMode};
use super::monitor::MonitorList;
use super::stats::{ControllerStats, TeardownReport};
use super::timer::DeferredTimer;
use super::traits::{BlockingWork, Rearm, TimerCallback};
use crate::core::errors::DeviceError;
use crate::core::sync::AtomicContext;
use crate::core::types::{DeviceResult, Pid};
use crate::process::ProcessRegistry;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

/// State reachable from the timer callback
struct DeviceState {
    mode: AtomicMode,
    period_nanos: AtomicU64,
    firings: AtomicU64,
    executor: DeferredExecutor,
    monitored: MonitorList,
}

impl DeviceState {
    fn period(&self) -> Duration {
        Duration::from_nanos(self.period_nanos.load(Ordering::Relaxed))
    }

    fn set_period(&self, period: Duration) {
        let nanos = u64::try_from(period.as_nanos()).unwrap_or(u64::MAX);
        self.period_nanos.store(nanos, Ordering::Relaxed);
    }
}

impl TimerCallback for DeviceState {
    fn on_fire(&self, ctx: &AtomicContext) -> Rearm {
        let firing = self.firings.fetch_add(1, Ordering::Relaxed) + 1;
        let mode = self.mode.load();
        let thread = std::thread::current();
        info!(
            thread = thread.name().unwrap_or("<unnamed>"),
            mode = %mode,
            firing,
            "timer fired"
        );

        match mode {
            TimerMode::None | TimerMode::OneShot => Rearm::Done,
            TimerMode::DeferredBlocking => {
                self.executor.submit(ctx);
                Rearm::Done
            }
            TimerMode::ProcessMonitor => {
                if let Some(pruned) = self.monitored.scan_and_prune(ctx) {
                    debug!(pruned, "monitor scan complete");
                }
                Rearm::After(self.period())
            }
        }
    }
}

/// Shared deferred-work device state
///
/// One instance per loaded device, shared by every open session through an
/// `Arc`. Call [`shutdown`](Self::shutdown) before dropping it.
pub struct DeferredController {
    state: Arc<DeviceState>,
    timer: DeferredTimer,
    registry: Arc<dyn ProcessRegistry>,
    torn_down: AtomicBool,
}

impl DeferredController {
    /// Controller with the default sleeping procedure
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn new(config: &DeviceConfig, registry: Arc<dyn ProcessRegistry>) -> Self {
        Self::with_work(config, registry, Arc::new(SleepyIo::new(config.blocking_io)))
    }

    /// Controller running `work` for `arm_deferred`
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn with_work(
        config: &DeviceConfig,
        registry: Arc<dyn ProcessRegistry>,
        work: Arc<dyn BlockingWork>,
    ) -> Self {
        let runtime = Handle::current();
        let state = Arc::new(DeviceState {
            mode: AtomicMode::new(TimerMode::None),
            period_nanos: AtomicU64::new(0),
            firings: AtomicU64::new(0),
            executor: DeferredExecutor::with_runtime(runtime.clone(), work, config.spin),
            monitored: MonitorList::new(config.max_monitored, config.spin),
        });
        state.set_period(config.monitor_period);

        let callback: Arc<dyn TimerCallback> = state.clone();
        let timer = DeferredTimer::with_runtime(runtime, callback);

        info!(
            monitor_period_ms = config.monitor_period.as_millis() as u64,
            max_monitored = config.max_monitored,
            "deferred controller initialized"
        );

        Self {
            state,
            timer,
            registry,
            torn_down: AtomicBool::new(false),
        }
    }

    /// Fire once after `delay`, doing nothing but log
    ///
    /// Ignored after teardown.
    pub fn arm(&self, delay: Duration) {
        self.arm_with_mode(TimerMode::OneShot, delay);
    }

    /// Stop the timer; returns once no callback is running or will run
    ///
    /// Returns `true` if a deadline was pending.
    pub async fn cancel(&self) -> bool {
        self.timer.cancel().await
    }

    /// Fire once after `delay` and queue the blocking procedure
    ///
    /// Ignored after teardown.
    pub fn arm_deferred(&self, delay: Duration) {
        self.arm_with_mode(TimerMode::DeferredBlocking, delay);
    }

    fn arm_with_mode(&self, mode: TimerMode, delay: Duration) {
        if self.is_torn_down() {
            warn!(mode = %mode, "arm after teardown ignored");
            return;
        }
        self.state.mode.store(mode);
        if self.is_torn_down() {
            // Lost the race with shutdown; leave it idle
            self.state.mode.store(TimerMode::None);
            return;
        }
        self.timer.arm(delay);
    }

    /// Watch `pid` and scan for dead tasks every `period`
    ///
    /// On failure the controller is left untouched: no entry, no mode
    /// change, no timer. Fails with `Unloaded` after teardown.
    pub fn monitor(&self, pid: Pid, period: Duration) -> DeviceResult<()> {
        if self.is_torn_down() {
            return Err(DeviceError::Unloaded);
        }
        let task = self.registry.resolve(pid)?;
        self.state.monitored.insert(task)?;
        self.state.set_period(period);
        self.state.mode.store(TimerMode::ProcessMonitor);

        // Shutdown may have drained the list between the check and the insert
        if self.is_torn_down() {
            self.state.monitored.drain_all();
            self.state.mode.store(TimerMode::None);
            return Err(DeviceError::Unloaded);
        }

        self.timer.arm(period);
        info!(pid, period_ms = period.as_millis() as u64, "process monitor armed");
        Ok(())
    }

    /// Race-free teardown: cancel the timer, drain the executor, then
    /// release every monitored task
    ///
    /// Safe to call more than once.
    pub async fn shutdown(&self) -> TeardownReport {
        self.torn_down.store(true, Ordering::SeqCst);

        let timer_was_pending = self.timer.shutdown().await;
        let work_was_pending = self.state.executor.drain().await;
        let entries_released = self.state.monitored.drain_all();
        self.state.mode.store(TimerMode::None);

        let report = TeardownReport {
            timer_was_pending,
            work_was_pending,
            entries_released,
        };
        info!(
            timer_was_pending,
            work_was_pending, entries_released, "deferred controller torn down"
        );
        report
    }

    fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }

    pub fn mode(&self) -> TimerMode {
        self.state.mode.load()
    }

    /// Timer firings since creation
    pub fn firings(&self) -> u64 {
        self.state.firings.load(Ordering::Relaxed)
    }

    pub fn is_timer_pending(&self) -> bool {
        self.timer.is_pending()
    }

    pub fn is_work_pending(&self) -> bool {
        self.state.executor.is_pending()
    }

    pub fn monitored_len(&self) -> usize {
        self.state.monitored.len()
    }

    pub fn monitored_pids(&self) -> Vec<Pid> {
        self.state.monitored.pids()
    }

    pub fn stats(&self) -> ControllerStats {
        ControllerStats {
            mode: self.mode(),
            firings: self.firings(),
            timer_pending: self.is_timer_pending(),
            monitored: self.monitored_pids(),
            pruned_total: self.state.monitored.pruned_total(),
            contended_scans: self.state.monitored.contended_scans(),
            executor: self.state.executor.stats(),
        }
    }
}

impl Drop for DeferredController {
    fn drop(&mut self) {
        if self.is_torn_down() {
            return;
        }
        // Cannot await here: abort the timer and release references directly
        self.timer.abort();
        let released = self.state.monitored.drain_all();
        warn!(released, "deferred controller dropped without shutdown");
    }
}
