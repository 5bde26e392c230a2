use std::future::Future;
use std::time::{Duration, Instant};

/// Result of a bounded wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Ready { attempts: u32 },
    TimedOut { attempts: u32 },
}

impl WaitOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, WaitOutcome::Ready { .. })
    }
}

/// Poll `probe` every `interval` until it returns true or `timeout` elapses.
///
/// Always terminates: the last sleep is cut to the remaining time and the
/// probe runs once more at the deadline.
pub async fn wait_until<F, Fut>(timeout: Duration, interval: Duration, mut probe: F) -> WaitOutcome
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + timeout;
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        if probe().await {
            return WaitOutcome::Ready { attempts };
        }
        if Instant::now() >= deadline {
            return WaitOutcome::TimedOut { attempts };
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        tokio::time::sleep(interval.min(remaining)).await;
    }
}
