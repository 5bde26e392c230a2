use crate::capture::capture_one;
use crate::overlay::{Overlay, VideoSession};
use crate::prompt::chat_prompt;
use crate::surface::PlayerSurface;
use provoke_core::ProvokeError;
use provoke_model::{GenerateRequest, GenerationConfig, Part, StreamEvent};
use tokio::sync::mpsc;
use tracing::debug;

const CHAT_MAX_TOKENS: u32 = 1024;

impl Overlay {
    /// Answer a viewer question, streaming deltas to `events`.
    ///
    /// Shares the generation busy flag with deck generation: returns
    /// `Ok(None)` for a blank question or while a generation is in flight.
    pub async fn ask(
        &self,
        session: &VideoSession,
        question: &str,
        surface: Option<&dyn PlayerSurface>,
        events: mpsc::Sender<StreamEvent>,
    ) -> Result<Option<String>, ProvokeError> {
        let question = question.trim();
        if question.is_empty() {
            return Ok(None);
        }
        let Some(_busy) = session.generating.try_acquire() else {
            debug!("chat ignored while generating");
            return Ok(None);
        };

        let settings = self.settings();
        let mode = settings.input_mode;
        let frame = match surface {
            Some(surface) if mode.wants_frames() => match capture_one(surface).await {
                Ok(frame) => Some(frame),
                Err(e) => {
                    debug!(error = %e, "answering without a frame");
                    None
                }
            },
            _ => None,
        };
        let transcript = mode
            .wants_transcript()
            .then(|| session.transcript_text(settings.max_transcript_chars));

        let prompt = chat_prompt(question, mode, frame.is_some(), transcript.as_deref());
        let mut parts = vec![Part::text(prompt)];
        if let Some(frame) = &frame {
            parts.push(Part::image(frame));
        }
        let request = GenerateRequest::user(parts, GenerationConfig::text(CHAT_MAX_TOKENS));

        match self
            .client()
            .stream_generate(&settings.model, &request, events)
            .await
        {
            Ok(answer) => Ok(Some(answer.trim().to_string())),
            Err(e) => {
                self.report(&e).await;
                Err(e)
            }
        }
    }
}
