use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Monotonic generation counter shared by one overlay.
///
/// Bumped on navigation, teardown, and every new top-level generation
/// request. A background pass captures the value when it starts and commits
/// only if the value is unchanged when it finishes.
#[derive(Debug, Clone, Default)]
pub struct PassToken {
    value: Arc<AtomicU64>,
}

impl PassToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u64 {
        self.value.load(Ordering::Acquire)
    }

    /// Invalidate every captured value; returns the new one.
    pub fn bump(&self) -> u64 {
        self.value.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn is_current(&self, captured: u64) -> bool {
        self.current() == captured
    }
}
