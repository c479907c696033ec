/*!
 * Shared search state
 *
 * One value per run, shared between the coordinator and every worker
 * through an `Arc`. The flag and counter are lock-free; the password slot
 * is guarded by a mutex held only for the claim itself.
 */

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Cancellation flag, attempt counter and discovered-password slot
#[derive(Debug, Default)]
pub struct SearchState {
    cancelled: AtomicBool,
    attempts: AtomicU64,
    found: Mutex<Option<String>>,
}

impl SearchState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the cancellation flag. Returns true for the call that raised it.
    pub fn cancel(&self) -> bool {
        !self.cancelled.swap(true, Ordering::AcqRel)
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    #[inline]
    pub fn add_attempts(&self, count: u64) {
        if count > 0 {
            self.attempts.fetch_add(count, Ordering::Relaxed);
        }
    }

    /// Approximate number of candidates tested so far
    #[inline]
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    /// First writer wins. Returns false if a password was already claimed.
    pub fn claim(&self, password: &str) -> bool {
        let mut slot = self.found.lock();
        if slot.is_some() {
            return false;
        }
        *slot = Some(password.to_string());
        true
    }

    pub fn found(&self) -> Option<String> {
        self.found.lock().clone()
    }
}
