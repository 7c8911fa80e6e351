//! Single-slot freshness hand-off
//!
//! The world keeps exactly one fused state; this flag records whether it
//! changed since a consumer last took it. Slow consumers see only the newest
//! state, never a backlog.

use std::sync::atomic::{AtomicBool, Ordering};

/// Dirty flag with atomic test-and-clear
#[derive(Debug, Default)]
pub struct FreshnessMailbox {
    dirty: AtomicBool,
}

impl FreshnessMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the slot as holding an unseen state
    pub fn publish(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    pub fn is_fresh(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Clear the flag, returning whether it was set
    pub fn take(&self) -> bool {
        self.dirty.swap(false, Ordering::AcqRel)
    }

    /// Run `read` only if the slot was fresh, clearing it
    pub fn take_with<T>(&self, read: impl FnOnce() -> T) -> Option<T> {
        self.take().then(read)
    }

    pub fn clear(&self) {
        self.dirty.store(false, Ordering::Release);
    }
}
