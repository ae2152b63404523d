/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use crate::core::types::Pid;
use miette::Diagnostic;
use nix::errno::Errno;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by the control commands of the deferred-work device
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum DeviceError {
    #[error("Process {0} not found")]
    #[diagnostic(
        code(device::not_found),
        help("The process may have terminated or never existed. Check PID validity.")
    )]
    NotFound(Pid),

    #[error("Out of memory: {0}")]
    #[diagnostic(
        code(device::out_of_memory),
        help("The monitor entry pool is exhausted. Wait for monitored processes to exit.")
    )]
    OutOfMemory(String),

    #[error("Invalid control command: {0:#x}")]
    #[diagnostic(
        code(device::invalid_command),
        help("Use one of TIMER_SET, TIMER_CANCEL, TIMER_ALLOC or TIMER_MON.")
    )]
    InvalidCommand(u32),

    #[error("Invalid argument: {0}")]
    #[diagnostic(
        code(device::invalid_argument),
        help("Delays are in seconds; process IDs must fit in 32 bits.")
    )]
    InvalidArgument(String),

    #[error("PID {0} is already in use")]
    #[diagnostic(
        code(device::pid_in_use),
        help("Pick a free PID or let the process table allocate one.")
    )]
    PidInUse(Pid),

    #[error("Device has been unloaded")]
    #[diagnostic(
        code(device::unloaded),
        help("The controller was torn down. Load the device again before issuing commands.")
    )]
    Unloaded,
}

impl DeviceError {
    /// Negative errno value for the ioctl return convention
    pub fn errno(&self) -> i32 {
        let errno = match self {
            DeviceError::NotFound(_) => Errno::ESRCH,
            DeviceError::OutOfMemory(_) => Errno::ENOMEM,
            DeviceError::InvalidCommand(_) => Errno::ENOTTY,
            DeviceError::InvalidArgument(_) => Errno::EINVAL,
            DeviceError::PidInUse(_) => Errno::EEXIST,
            DeviceError::Unloaded => Errno::ENODEV,
        };
        -(errno as i32)
    }
}

/// Failure of a blocking procedure run by the deferred executor
///
/// The submitter has already returned by the time the work runs, so these
/// are only ever logged and counted.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum WorkError {
    #[error("Blocking I/O failed: {0}")]
    #[diagnostic(code(work::io_failed))]
    Io(String),

    #[error("Blocking work panicked: {0}")]
    #[diagnostic(
        code(work::panicked),
        help("The work procedure must not panic. Check the logs for the panic payload.")
    )]
    Panicked(String),
}

/// Configuration loading errors
#[derive(Error, Debug, Diagnostic)]
pub enum ConfigError {
    #[error("Invalid configuration JSON: {0}")]
    #[diagnostic(code(config::parse))]
    Parse(#[from] serde_json::Error),

    #[error("Invalid value for {key}: {value:?}")]
    #[diagnostic(
        code(config::invalid_env),
        help("Numeric environment overrides must be plain unsigned integers.")
    )]
    InvalidEnv { key: &'static str, value: String },
}
