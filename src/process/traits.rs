/*!
 * Process Traits
 * Handle resolution abstractions
 */

use super::handle::TaskRef;
use crate::core::types::{DeviceResult, Pid};

/// Resolves process identifiers to owned task references
pub trait ProcessRegistry: Send + Sync {
    /// Look up `pid` and take a counted reference to it
    ///
    /// Fails with `DeviceError::NotFound` when no such process exists.
    fn resolve(&self, pid: Pid) -> DeviceResult<TaskRef>;
}
