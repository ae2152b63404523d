/*!
 * Device Module
 * Control surface consumed by the device-file layer
 */

pub mod ioctl;
pub mod session;

// Re-export for convenience
pub use ioctl::{IoctlCommand, TIMER_ALLOC, TIMER_CANCEL, TIMER_MON, TIMER_SET};
pub use session::{ControlSession, Device};
