/*!
 * Deferred Work Module
 *
 * Timer-driven deferred work: the timer, the coalescing executor for
 * blocking procedures, the monitored-process list and the controller that
 * ties them together.
 */

pub mod config;
pub mod controller;
pub mod executor;
pub mod mode;
pub mod monitor;
pub mod stats;
pub mod timer;
pub mod traits;

// Re-export for convenience
pub use config::DeviceConfig;
pub use controller::DeferredController;
pub use executor::{DeferredExecutor, SleepyIo};
pub use mode::{AtomicMode, TimerMode};
pub use monitor::{MonitorEntry, MonitorList};
pub use stats::{ControllerStats, ExecutorStats, TeardownReport};
pub use timer::DeferredTimer;
pub use traits::{BlockingWork, Rearm, TimerCallback};
