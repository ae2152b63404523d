/*!
 * Synchronization Primitives
 *
 * Locks that may be taken from the non-blocking timer context. Ordinary
 * command-context state uses `parking_lot` directly; anything the timer
 * callback touches goes through [`SpinLock`].
 */

mod config;
mod spinlock;

pub use config::SpinConfig;
pub use spinlock::{AtomicContext, SpinLock, SpinLockGuard, TryLockError};
