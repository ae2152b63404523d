/*!
 * Spin Locks for Atomic Context
 *
 * A spin-style lock that is safe to take from the timer callback. It never
 * parks the calling thread. Command-context callers spin and then yield;
 * atomic-context callers spin a bounded number of times and give up.
 *
 * The atomic-context entry point requires an [`AtomicContext`] token, which
 * only the timer can construct. Code on the callback path therefore cannot
 * reach a blocking acquisition by accident: it has no `parking_lot` lock to
 * take and `SpinLock::lock_atomic` is the only way in.
 */

use super::config::SpinConfig;
use std::marker::PhantomData;
use thiserror::Error;

/// RAII guard; the lock is released when it goes out of scope
pub type SpinLockGuard<'a, T> = spin::MutexGuard<'a, T>;

/// Why an atomic-context acquisition did not succeed
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TryLockError {
    #[error("lock still contended after {0} spins")]
    WouldBlock(u32),
}

/// Proof that the caller runs in the non-blocking timer context
///
/// Not `Send`: the token cannot outlive the firing that created it or move
/// to another thread.
pub struct AtomicContext {
    _not_send: PhantomData<*const ()>,
}

impl AtomicContext {
    pub(crate) fn enter() -> Self {
        Self {
            _not_send: PhantomData,
        }
    }
}

/// Spin-style mutual exclusion shared between command and timer contexts
pub struct SpinLock<T> {
    inner: spin::Mutex<T>,
    config: SpinConfig,
}

impl<T> SpinLock<T> {
    pub const fn new(value: T) -> Self {
        Self::with_config(value, SpinConfig::standard())
    }

    pub const fn with_config(value: T, config: SpinConfig) -> Self {
        Self {
            inner: spin::Mutex::new(value),
            config,
        }
    }

    /// Acquire from command context
    ///
    /// Spins, then yields the thread between attempts. Never parks.
    pub fn lock(&self) -> SpinLockGuard<'_, T> {
        let mut spins = 0u32;
        loop {
            if let Some(guard) = self.inner.try_lock() {
                return guard;
            }
            if spins < self.config.yield_after {
                std::hint::spin_loop();
            } else {
                std::thread::yield_now();
            }
            spins = spins.saturating_add(1);
        }
    }

    /// Single acquisition attempt
    #[inline]
    pub fn try_lock(&self) -> Option<SpinLockGuard<'_, T>> {
        self.inner.try_lock()
    }

    /// Acquire from the timer callback: try, or wait briefly
    ///
    /// Spins at most `atomic_spins` times and never yields or parks.
    pub fn lock_atomic(&self, _ctx: &AtomicContext) -> Result<SpinLockGuard<'_, T>, TryLockError> {
        let budget = self.config.atomic_spins;
        for _ in 0..=budget {
            if let Some(guard) = self.inner.try_lock() {
                return Ok(guard);
            }
            std::hint::spin_loop();
        }
        Err(TryLockError::WouldBlock(budget))
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }

    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

impl<T: Default> Default for SpinLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
