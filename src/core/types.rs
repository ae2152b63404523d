/*!
 * Core Types
 * Common types used across the device
 */

/// Process ID type
pub type Pid = u32;

/// Common result type for control commands
pub type DeviceResult<T> = Result<T, super::errors::DeviceError>;
