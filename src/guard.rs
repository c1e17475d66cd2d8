use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::BookError;

/// Mutual exclusion for guarded entry points.
///
/// An entry point takes a [`GuardLease`] before touching state; any nested
/// attempt while the lease is alive fails with [`BookError::ReentrantCall`]
/// instead of waiting.
#[derive(Debug, Default)]
pub struct ReentrancyGuard {
    locked: AtomicBool,
}

impl ReentrancyGuard {
    pub fn new() -> Self {
        Self {
            locked: AtomicBool::new(false),
        }
    }

    pub fn enter(&self) -> Result<GuardLease<'_>, BookError> {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .map_err(|_| BookError::ReentrantCall)?;
        Ok(GuardLease { guard: self })
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }
}

/// Releases the guard when dropped, on success and error paths alike.
#[derive(Debug)]
pub struct GuardLease<'a> {
    guard: &'a ReentrancyGuard,
}

impl Drop for GuardLease<'_> {
    fn drop(&mut self) {
        self.guard.locked.store(false, Ordering::Release);
    }
}
