//! Cooperative cancellation for `Program::play`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cloneable flag that asks a running `play` loop to stop.
///
/// The loop only looks at the flag between steps, so a step in progress
/// always completes.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    requested: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop. Calling this more than once has no further effect.
    pub fn stop(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    pub(crate) fn clear(&self) {
        self.requested.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_is_shared_and_idempotent() {
        let handle = StopHandle::new();
        let other = handle.clone();
        assert!(!handle.is_stop_requested());

        other.stop();
        other.stop();
        assert!(handle.is_stop_requested());

        handle.clear();
        assert!(!other.is_stop_requested());
    }
}
