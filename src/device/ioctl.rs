/*!
 * Control Command Codes
 *
 * Numeric ioctl codes for the four control commands, encoded the Linux way
 * (direction, size, type, number) under the `'k'` type.
 */

use crate::core::errors::DeviceError;
use std::fmt;

const IOC_NONE: u32 = 0;
const IOC_WRITE: u32 = 1;
const IOC_TYPE: u32 = b'k' as u32;
const ARG_SIZE: u32 = std::mem::size_of::<u64>() as u32;

const fn ioc(dir: u32, nr: u32, size: u32) -> u32 {
    (dir << 30) | (size << 16) | (IOC_TYPE << 8) | nr
}

pub const TIMER_SET: u32 = ioc(IOC_WRITE, 1, ARG_SIZE);
pub const TIMER_CANCEL: u32 = ioc(IOC_NONE, 2, 0);
pub const TIMER_ALLOC: u32 = ioc(IOC_WRITE, 3, ARG_SIZE);
pub const TIMER_MON: u32 = ioc(IOC_WRITE, 4, ARG_SIZE);

/// Decoded control command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoctlCommand {
    /// Arm a one-shot timer; argument is the delay in seconds
    TimerSet,
    /// Cancel the timer; no argument
    TimerCancel,
    /// Arm a timer that defers blocking work; argument is the delay in seconds
    TimerAlloc,
    /// Monitor a process; argument is the pid
    TimerMon,
}

impl IoctlCommand {
    pub const fn code(self) -> u32 {
        match self {
            IoctlCommand::TimerSet => TIMER_SET,
            IoctlCommand::TimerCancel => TIMER_CANCEL,
            IoctlCommand::TimerAlloc => TIMER_ALLOC,
            IoctlCommand::TimerMon => TIMER_MON,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            IoctlCommand::TimerSet => "TIMER_SET",
            IoctlCommand::TimerCancel => "TIMER_CANCEL",
            IoctlCommand::TimerAlloc => "TIMER_ALLOC",
            IoctlCommand::TimerMon => "TIMER_MON",
        }
    }
}

impl TryFrom<u32> for IoctlCommand {
    type Error = DeviceError;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        match code {
            TIMER_SET => Ok(IoctlCommand::TimerSet),
            TIMER_CANCEL => Ok(IoctlCommand::TimerCancel),
            TIMER_ALLOC => Ok(IoctlCommand::TimerAlloc),
            TIMER_MON => Ok(IoctlCommand::TimerMon),
            other => Err(DeviceError::InvalidCommand(other)),
        }
    }
}

impl fmt::Display for IoctlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
