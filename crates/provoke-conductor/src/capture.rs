use crate::surface::PlayerSurface;
use crate::wait_until::wait_until;
use provoke_core::{Frame, ProvokeError, Settings};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub const READY_TIMEOUT: Duration = Duration::from_secs(4);
pub const READY_POLL: Duration = Duration::from_millis(100);

/// How many frames to take, how far apart, and how long to wait for the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapturePlan {
    pub count: usize,
    pub interval: Duration,
    pub ready_timeout: Duration,
}

impl CapturePlan {
    pub fn from_settings(settings: &Settings) -> Self {
        let settings = settings.clone().sanitized();
        Self {
            count: settings.max_frames,
            interval: Duration::from_secs(settings.frame_interval_sec),
            ready_timeout: READY_TIMEOUT,
        }
    }
}

/// Capture `plan.count` frames `plan.interval` apart.
///
/// Waits (bounded) for the player to become ready first. If it never does, or
/// no frame can be captured, the static thumbnail stands in; without one the
/// call fails with `CaptureFailure`. A capture that fails after some frames
/// were taken keeps the frames gathered so far.
pub async fn capture_frames(
    surface: &dyn PlayerSurface,
    plan: CapturePlan,
    cancel: &CancellationToken,
) -> Result<Vec<Frame>, ProvokeError> {
    let count = plan.count.max(1);
    let interval = plan.interval;
    let ready = wait_until(plan.ready_timeout, READY_POLL, move || surface.is_ready()).await;
    if !ready.is_ready() {
        warn!(?ready, "player not ready for capture");
        return thumbnail_or_fail(surface, "video is not ready").await;
    }

    let mut frames = Vec::with_capacity(count);
    for i in 0..count {
        match surface.capture_frame().await {
            Ok(frame) => frames.push(frame),
            Err(e) => {
                warn!(error = %e, captured = frames.len(), "frame capture failed");
                break;
            }
        }
        if i + 1 < count {
            tokio::select! {
                _ = cancel.cancelled() => return Err(ProvokeError::Superseded),
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }

    if frames.is_empty() {
        return thumbnail_or_fail(surface, "no frame could be captured").await;
    }
    debug!(count = frames.len(), "captured frames");
    Ok(frames)
}

/// One frame for chat or observation, with the same thumbnail fallback.
pub async fn capture_one(surface: &dyn PlayerSurface) -> Result<Frame, ProvokeError> {
    match surface.capture_frame().await {
        Ok(frame) => Ok(frame),
        Err(e) => {
            debug!(error = %e, "single capture failed");
            let mut frames = thumbnail_or_fail(surface, "no frame could be captured").await?;
            frames
                .pop()
                .ok_or_else(|| ProvokeError::CaptureFailure("no frame could be captured".into()))
        }
    }
}

async fn thumbnail_or_fail(
    surface: &dyn PlayerSurface,
    reason: &str,
) -> Result<Vec<Frame>, ProvokeError> {
    match surface.thumbnail().await {
        Some(thumb) => {
            debug!(reason, "using thumbnail instead of captured frames");
            Ok(vec![thumb])
        }
        None => Err(ProvokeError::CaptureFailure(reason.to_string())),
    }
}
