//! Sparse observations feeding the rolling context summary.

use crate::capture::capture_one;
use crate::overlay::{Overlay, VideoSession};
use crate::prompt::frame_note_prompt;
use crate::surface::PlayerSurface;
use provoke_context::SummaryOutcome;
use provoke_core::{Provocation, ProvokeError, TranscriptLine};
use provoke_model::{generate_text, GenerateRequest, GenerationConfig, Part};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Transcript span preceding the playback position that makes up one note.
pub const TRANSCRIPT_WINDOW_MS: u64 = 15_000;
const FRAME_NOTE_MAX_TOKENS: u32 = 128;

/// Text of the lines starting within the window that ends at `now_ms`.
pub fn transcript_window(lines: &[TranscriptLine], now_ms: u64) -> Option<String> {
    let from = now_ms.saturating_sub(TRANSCRIPT_WINDOW_MS);
    let text = lines
        .iter()
        .filter(|l| l.start_offset_ms >= from && l.start_offset_ms <= now_ms)
        .map(|l| l.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    (!text.is_empty()).then_some(text)
}

impl Overlay {
    /// Record one observation at the current position, then resummarize.
    ///
    /// Returns `Ok(None)` when nothing was recorded: an observation was
    /// already in flight, there was nothing to note, or the session closed.
    pub async fn observe(
        &self,
        session: &VideoSession,
        surface: &dyn PlayerSurface,
    ) -> Result<Option<SummaryOutcome>, ProvokeError> {
        let Some(_busy) = session.observing.try_acquire() else {
            return Ok(None);
        };
        let now_ms = surface.current_time_ms().await?;
        let note = match transcript_window(&session.transcript_lines(), now_ms) {
            Some(note) => note,
            None if self.settings().input_mode.wants_frames() => {
                self.describe_frame(surface).await?
            }
            None => return Ok(None),
        };
        if note.trim().is_empty() || session.is_closed() {
            return Ok(None);
        }

        let video_id = &session.video().video_id;
        self.context().record_observation(video_id, now_ms, &note)?;
        let outcome = self
            .context()
            .resummarize(self.client(), &self.settings().model, video_id)
            .await?;
        debug!(video_id = %video_id, at_ms = now_ms, ?outcome, "observation recorded");
        Ok(Some(outcome))
    }

    async fn describe_frame(&self, surface: &dyn PlayerSurface) -> Result<String, ProvokeError> {
        let frame = capture_one(surface).await?;
        let request = GenerateRequest::user(
            vec![Part::text(frame_note_prompt()), Part::image(&frame)],
            GenerationConfig::text(FRAME_NOTE_MAX_TOKENS),
        );
        Ok(generate_text(self.client(), &self.settings().model, &request)
            .await?
            .trim()
            .to_string())
    }

    /// Seek event: reveal what is due at the new position and take an
    /// observation there.
    pub async fn on_seek(
        &self,
        session: &VideoSession,
        surface: &dyn PlayerSurface,
    ) -> Result<Vec<Provocation>, ProvokeError> {
        let now_ms = surface.current_time_ms().await?;
        let revealed = session.on_playback(now_ms);
        if let Err(e) = self.observe(session, surface).await {
            warn!(error = %e, "observation after seek failed");
        }
        Ok(revealed)
    }

    /// Period of the context loop, from `context_interval_sec`.
    pub fn context_interval(&self) -> Duration {
        Duration::from_secs(self.settings().context_interval_sec.max(1))
    }

    /// Observe every `context_interval()` until the session is closed.
    pub async fn run_context_loop(&self, session: Arc<VideoSession>, surface: &dyn PlayerSurface) {
        let interval = self.context_interval();
        let cancel = session.cancel_token();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {
                    if let Err(e) = self.observe(&session, surface).await {
                        warn!(error = %e, "context observation failed");
                    }
                }
            }
        }
        debug!(video_id = %session.video().video_id, "context loop stopped");
    }
}
