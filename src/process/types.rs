/*!
 * Process Types
 * Common types for the process table
 */

use serde::{Deserialize, Serialize};

/// Task run state as observed by monitors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum TaskState {
    /// Task is alive
    Running = 0,
    /// Task has exited; the object lives on while references are held
    Dead = 1,
}

impl TaskState {
    #[inline]
    pub(crate) fn from_u8(raw: u8) -> Self {
        match raw {
            0 => TaskState::Running,
            _ => TaskState::Dead,
        }
    }
}
