//! Cooperative cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cancellation flag for one write session.
///
/// Checked between chunks only: a chunk write in flight always completes or
/// fails before cancellation takes effect, so the device is never left with
/// a torn chunk. Each session owns its own handle; concurrent sessions on
/// other devices are unaffected.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_is_visible_through_clones() {
        let handle = CancelHandle::new();
        let shared = handle.clone();
        assert!(!shared.is_cancelled());
        handle.cancel();
        assert!(shared.is_cancelled());
    }
}
