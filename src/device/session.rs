/*!
 * Device and Control Sessions
 *
 * The control surface the device-file layer sits on. Loading the device
 * creates the shared controller; each open yields a session bound to it.
 * Opening and closing sessions never touches controller state.
 */

use super::ioctl::IoctlCommand;
use crate::core::errors::DeviceError;
use crate::core::types::{DeviceResult, Pid};
use crate::deferred::{BlockingWork, DeferredController, DeviceConfig, TeardownReport};
use crate::monitoring::CommandSpan;
use crate::process::ProcessRegistry;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Instrument};
use uuid::Uuid;

/// A loaded deferred-work device
pub struct Device {
    controller: Arc<DeferredController>,
    monitor_period: Duration,
    open_sessions: Arc<AtomicUsize>,
}

impl Device {
    /// Load the device with the default blocking procedure
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn load(config: DeviceConfig, registry: Arc<dyn ProcessRegistry>) -> Self {
        info!("deferred device loading");
        let controller = DeferredController::new(&config, registry);
        Self::from_controller(controller, config.monitor_period)
    }

    /// Load the device with a custom blocking procedure
    pub fn with_work(
        config: DeviceConfig,
        registry: Arc<dyn ProcessRegistry>,
        work: Arc<dyn BlockingWork>,
    ) -> Self {
        info!("deferred device loading");
        let controller = DeferredController::with_work(&config, registry, work);
        Self::from_controller(controller, config.monitor_period)
    }

    fn from_controller(controller: DeferredController, monitor_period: Duration) -> Self {
        Self {
            controller: Arc::new(controller),
            monitor_period,
            open_sessions: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Open a control session attached to the shared controller
    pub fn open(&self) -> ControlSession {
        let session = ControlSession {
            id: Uuid::new_v4(),
            controller: Arc::clone(&self.controller),
            monitor_period: self.monitor_period,
            open_sessions: Arc::clone(&self.open_sessions),
        };
        let open = self.open_sessions.fetch_add(1, Ordering::AcqRel) + 1;
        info!(session = %session.id, open, "Device opened");
        session
    }

    pub fn controller(&self) -> &Arc<DeferredController> {
        &self.controller
    }

    pub fn open_sessions(&self) -> usize {
        self.open_sessions.load(Ordering::Acquire)
    }

    /// Unload: tear the controller down
    pub async fn unload(self) -> TeardownReport {
        let open = self.open_sessions();
        if open > 0 {
            warn!(open, "unloading with open sessions");
        }
        let report = self.controller.shutdown().await;
        info!("deferred device unloaded");
        report
    }
}

/// One open handle on the device
pub struct ControlSession {
    id: Uuid,
    controller: Arc<DeferredController>,
    monitor_period: Duration,
    open_sessions: Arc<AtomicUsize>,
}

impl ControlSession {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn controller(&self) -> &DeferredController {
        &self.controller
    }

    /// Numeric control dispatch
    ///
    /// `arg` is a delay in seconds for `TIMER_SET`/`TIMER_ALLOC`, ignored for
    /// `TIMER_CANCEL`, and a pid for `TIMER_MON`.
    pub async fn ioctl(&self, cmd: u32, arg: u64) -> DeviceResult<()> {
        let command = IoctlCommand::try_from(cmd).map_err(|e| {
            warn!(session = %self.id, cmd, "unknown control command");
            e
        })?;

        let span = CommandSpan::new(self.id, command.name(), arg);
        let result = self
            .dispatch(command, arg)
            .instrument(span.span().clone())
            .await;
        match &result {
            Ok(()) => span.record_ok(),
            Err(e) => span.record_errno(e.errno()),
        }
        result
    }

    async fn dispatch(&self, command: IoctlCommand, arg: u64) -> DeviceResult<()> {
        info!(session = %self.id, command = %command, arg, "control command");
        match command {
            IoctlCommand::TimerSet => self.arm(Duration::from_secs(arg)),
            IoctlCommand::TimerCancel => {
                self.cancel().await;
            }
            IoctlCommand::TimerAlloc => self.arm_deferred(Duration::from_secs(arg)),
            IoctlCommand::TimerMon => {
                let pid = Pid::try_from(arg)
                    .map_err(|_| DeviceError::InvalidArgument(format!("pid {arg} out of range")))?;
                self.monitor(pid)?;
            }
        }
        Ok(())
    }

    pub fn arm(&self, delay: Duration) {
        self.controller.arm(delay);
    }

    pub async fn cancel(&self) -> bool {
        self.controller.cancel().await
    }

    pub fn arm_deferred(&self, delay: Duration) {
        self.controller.arm_deferred(delay);
    }

    /// Monitor `pid` at the device's configured period
    pub fn monitor(&self, pid: Pid) -> DeviceResult<()> {
        self.controller.monitor(pid, self.monitor_period)
    }

    /// Close the session
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for ControlSession {
    fn drop(&mut self) {
        let open = self.open_sessions.fetch_sub(1, Ordering::AcqRel).saturating_sub(1);
        info!(session = %self.id, open, "Device released");
    }
}
