use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Mutual-exclusion flag for one class of background work.
///
/// Callers that find the flag taken return early instead of queuing.
#[derive(Debug, Clone, Default)]
pub struct BusyFlag {
    inner: Arc<AtomicBool>,
}

impl BusyFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the flag, or `None` if another caller holds it.
    pub fn try_acquire(&self) -> Option<BusyGuard> {
        self.inner
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard {
                inner: Arc::clone(&self.inner),
            })
    }

    pub fn is_busy(&self) -> bool {
        self.inner.load(Ordering::Acquire)
    }
}

/// Clears its flag when dropped, on every exit path.
#[derive(Debug)]
pub struct BusyGuard {
    inner: Arc<AtomicBool>,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.inner.store(false, Ordering::Release);
    }
}
