/*!
 * Deferred Work Device Library
 * Timer-driven deferred work, blocking work offload and process monitoring
 */

pub mod core;
pub mod deferred;
pub mod device;
pub mod monitoring;
pub mod process;

// Re-exports
pub use crate::core::errors::{ConfigError, DeviceError, WorkError};
pub use crate::core::types::{DeviceResult, Pid};
pub use deferred::{
    BlockingWork, ControllerStats, DeferredController, DeviceConfig, SleepyIo, TeardownReport,
    TimerMode,
};
pub use device::{ControlSession, Device, IoctlCommand};
pub use monitoring::init_tracing;
pub use process::{ProcessRegistry, ProcessTable, TaskRef};
