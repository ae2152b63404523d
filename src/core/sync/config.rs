/*!
 * Synchronization Configuration
 *
 * Spin budgets for the spin-style locks
 */

use serde::{Deserialize, Serialize};

/// Spin budget configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpinConfig {
    /// Maximum spin iterations when acquiring from atomic (timer) context
    pub atomic_spins: u32,
    /// Spin iterations before a command-context acquirer starts yielding
    pub yield_after: u32,
}

impl Default for SpinConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl SpinConfig {
    /// Balanced defaults
    pub const fn standard() -> Self {
        Self {
            atomic_spins: 1_000,
            yield_after: 64,
        }
    }

    /// Configuration for tight latency budgets (callback gives up quickly)
    pub const fn low_latency() -> Self {
        Self {
            atomic_spins: 100,
            yield_after: 16,
        }
    }
}
