//! Session-scoped overlay state and the quick/deep generation orchestrator.

use crate::capture::{capture_frames, CapturePlan};
use crate::prompt::{deck_prompt, DeckPrompt};
use crate::status::{StatusSink, StderrStatus};
use crate::surface::PlayerSurface;
use crate::token::PassToken;
use provoke_context::ContextStore;
use provoke_core::{
    BusyFlag, CaptionTrack, Frame, InputMode, PassKind, Provocation, ProvokeError, Settings,
    TranscriptLine, VideoRef,
};
use provoke_deck::{items_from_output, normalize, normalize_deck, DeckSession};
use provoke_model::{
    generate_text, parse_with_repair, GenerateRequest, GenerationClient, GenerationConfig, Part,
};
use provoke_transcript::{build_transcript_text, fetch_transcript, pick_caption_track, CaptionHttp};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

// ── Session ──

/// State bound to one video. Dropped (and its token cancelled) on navigation.
pub struct VideoSession {
    video: VideoRef,
    cancel: CancellationToken,
    deck: Mutex<DeckSession>,
    transcript: Mutex<Vec<TranscriptLine>>,
    position_ms: AtomicU64,
    pub(crate) generating: BusyFlag,
    pub(crate) observing: BusyFlag,
}

impl VideoSession {
    fn new(video: VideoRef) -> Self {
        Self {
            video,
            cancel: CancellationToken::new(),
            deck: Mutex::new(DeckSession::new()),
            transcript: Mutex::new(Vec::new()),
            position_ms: AtomicU64::new(0),
            generating: BusyFlag::new(),
            observing: BusyFlag::new(),
        }
    }

    pub fn video(&self) -> &VideoRef {
        &self.video
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn is_generating(&self) -> bool {
        self.generating.is_busy()
    }

    pub fn set_transcript(&self, lines: Vec<TranscriptLine>) {
        *lock(&self.transcript) = lines;
    }

    pub fn transcript_lines(&self) -> Vec<TranscriptLine> {
        lock(&self.transcript).clone()
    }

    pub fn transcript_text(&self, max_chars: usize) -> String {
        build_transcript_text(&lock(&self.transcript), max_chars)
    }

    pub fn position_ms(&self) -> u64 {
        self.position_ms.load(Ordering::Acquire)
    }

    /// Playback tick: remember the position and reveal entries now due.
    pub fn on_playback(&self, current_ms: u64) -> Vec<Provocation> {
        self.position_ms.store(current_ms, Ordering::Release);
        lock(&self.deck).reveal_up_to(current_ms)
    }

    /// Seek to `ms`, resume playback, and reveal what became due.
    pub async fn jump_to(
        &self,
        surface: &dyn PlayerSurface,
        ms: u64,
    ) -> Result<Vec<Provocation>, ProvokeError> {
        surface.seek(ms).await?;
        surface.play().await?;
        Ok(self.on_playback(ms))
    }

    pub fn deck_entries(&self) -> Vec<Provocation> {
        lock(&self.deck).entries().to_vec()
    }

    pub fn revealed(&self) -> Vec<Provocation> {
        lock(&self.deck)
            .revealed_entries()
            .into_iter()
            .cloned()
            .collect()
    }

    fn replace_deck(&self, deck: Vec<Provocation>) -> usize {
        let at = self.position_ms();
        lock(&self.deck).replace_deck(deck, at)
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

// ── Generation types ──

/// Inputs for one generation request.
#[derive(Debug, Clone, Default)]
pub struct GenerationInputs {
    pub goal: String,
    pub frames: Vec<Frame>,
    /// Skip the deep pass.
    pub quick_only: bool,
}

/// Result of one pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PassOutput {
    pub pass: PassKind,
    pub deck: Vec<Provocation>,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeepOutcome {
    Skipped,
    Committed(PassOutput),
    /// A newer request or navigation moved the token on; the result was dropped.
    Superseded,
    /// The quick deck stays on screen.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationReport {
    /// Token value this request ran under.
    pub token: u64,
    pub quick: PassOutput,
    pub deep: DeepOutcome,
}

// ── Overlay ──

pub struct Overlay {
    client: Arc<dyn GenerationClient>,
    context: Arc<ContextStore>,
    settings: Settings,
    status: Arc<dyn StatusSink>,
    token: PassToken,
    current: Mutex<Option<Arc<VideoSession>>>,
}

impl Overlay {
    pub fn new(
        client: Arc<dyn GenerationClient>,
        context: Arc<ContextStore>,
        settings: Settings,
    ) -> Self {
        Self {
            client,
            context,
            settings: settings.sanitized(),
            status: Arc::new(StderrStatus),
            token: PassToken::new(),
            current: Mutex::new(None),
        }
    }

    pub fn with_status(mut self, status: Arc<dyn StatusSink>) -> Self {
        self.status = status;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn token(&self) -> &PassToken {
        &self.token
    }

    pub fn context(&self) -> &ContextStore {
        &self.context
    }

    pub(crate) fn client(&self) -> &dyn GenerationClient {
        self.client.as_ref()
    }

    pub fn current_session(&self) -> Option<Arc<VideoSession>> {
        lock(&self.current).clone()
    }

    /// Close the current session and invalidate every in-flight pass.
    pub fn teardown(&self) {
        if let Some(old) = lock(&self.current).take() {
            debug!(video_id = %old.video.video_id, "closing session");
            old.cancel.cancel();
        }
        self.token.bump();
    }

    /// Bind a fresh session to `video`, restoring its stored deck if any.
    pub fn navigate(&self, video: VideoRef) -> Result<Arc<VideoSession>, ProvokeError> {
        self.teardown();
        let record = self.context.ensure_record(&video)?;
        let session = Arc::new(VideoSession::new(video));
        if let Some(deck) = record.deck.filter(|d| !d.is_empty()) {
            session.replace_deck(normalize_deck(&deck));
            debug!(entries = session.deck_entries().len(), "restored stored deck");
        }
        *lock(&self.current) = Some(session.clone());
        info!(video_id = %session.video.video_id, token = self.token.current(), "session started");
        Ok(session)
    }

    pub(crate) async fn report(&self, err: &ProvokeError) {
        if err.is_user_visible() {
            self.status.status(&err.status_message()).await;
        }
    }

    pub(crate) async fn say(&self, message: &str) {
        self.status.status(message).await;
    }

    /// Load the preferred caption track of the page into the session.
    pub async fn refresh_transcript(
        &self,
        session: &VideoSession,
        surface: &dyn PlayerSurface,
        http: &dyn CaptionHttp,
    ) -> Result<usize, ProvokeError> {
        let tracks = surface.caption_tracks().await;
        let Some(track) = pick_caption_track(&tracks) else {
            self.say("No caption tracks found for this video.").await;
            return Ok(0);
        };
        self.load_transcript(session, http, track).await
    }

    pub async fn load_transcript(
        &self,
        session: &VideoSession,
        http: &dyn CaptionHttp,
        track: &CaptionTrack,
    ) -> Result<usize, ProvokeError> {
        match fetch_transcript(http, &track.locator_url).await {
            Ok(lines) => {
                let count = lines.len();
                session.set_transcript(lines);
                self.say(&format!("Transcript loaded ({count} lines).")).await;
                Ok(count)
            }
            Err(e) => {
                session.set_transcript(Vec::new());
                self.report(&e).await;
                Err(e)
            }
        }
    }

    /// Capture frames for a generation request when the input mode uses them.
    pub async fn capture_for_generation(
        &self,
        session: &VideoSession,
        surface: &dyn PlayerSurface,
    ) -> Result<Vec<Frame>, ProvokeError> {
        if !self.settings.input_mode.wants_frames() {
            return Ok(Vec::new());
        }
        let plan = CapturePlan::from_settings(&self.settings);
        capture_frames(surface, plan, &session.cancel).await
    }

    fn model_for(&self, pass: PassKind) -> &str {
        match pass {
            PassKind::Quick => &self.settings.model,
            PassKind::Deep => &self.settings.deep_model,
        }
    }

    fn build_request(
        &self,
        session: &VideoSession,
        inputs: &GenerationInputs,
        pass: PassKind,
    ) -> Result<GenerateRequest, ProvokeError> {
        let mode = self.settings.input_mode;
        let transcript = if mode.wants_transcript() {
            let text = session.transcript_text(self.settings.max_transcript_chars);
            if text.is_empty() {
                return Err(ProvokeError::CaptureFailure(
                    "transcript missing for this input mode; refresh the transcript or switch to video frames"
                        .into(),
                ));
            }
            Some(text)
        } else {
            None
        };
        if mode.wants_frames() && inputs.frames.is_empty() {
            return Err(ProvokeError::CaptureFailure("no video frames captured".into()));
        }

        let summary = self
            .context
            .load(&session.video.video_id)?
            .map(|r| r.summary)
            .unwrap_or_default();
        let prompt = deck_prompt(&DeckPrompt {
            requested_count: self.settings.requested_count(),
            goal: &inputs.goal,
            input_mode: mode,
            frames_attached: mode.wants_frames(),
            transcript: transcript.as_deref(),
            summary: &summary,
        });

        let mut parts = vec![Part::text(prompt)];
        if mode.wants_frames() {
            parts.extend(inputs.frames.iter().map(Part::image));
        }
        if mode == InputMode::YoutubeUrl {
            parts.push(Part::file_uri(session.video.url.clone()));
        }

        let grounded = pass == PassKind::Deep && self.settings.enable_search_grounding;
        let mut config = GenerationConfig::json();
        if grounded {
            // The endpoint rejects a JSON mime type together with tools.
            config.response_mime_type = None;
        }
        Ok(GenerateRequest::user(parts, config).with_search_grounding(grounded))
    }

    /// Run one pass: request, parse (with one repair), normalize.
    pub async fn run_pass(
        &self,
        session: &VideoSession,
        inputs: &GenerationInputs,
        pass: PassKind,
    ) -> Result<PassOutput, ProvokeError> {
        let request = self.build_request(session, inputs, pass)?;
        let model = self.model_for(pass);
        debug!(
            pass = pass.as_str(),
            model,
            images = request.image_count(),
            "running pass"
        );
        let raw = generate_text(self.client.as_ref(), model, &request).await?;
        let output = parse_with_repair(self.client.as_ref(), model, &raw).await?;
        let items = items_from_output(&output);
        let shown = items.len().min(self.settings.max_provocations);
        let deck = normalize(&items[..shown]);
        let summary = output
            .get("summary")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        Ok(PassOutput {
            pass,
            deck,
            summary,
        })
    }

    /// Persist and display `output` if `token` is still live.
    fn commit(
        &self,
        session: &VideoSession,
        output: &PassOutput,
        token: u64,
    ) -> Result<bool, ProvokeError> {
        if !self.token.is_current(token) || session.is_closed() {
            return Ok(false);
        }
        self.context.store_deck(
            &session.video,
            &output.deck,
            output.pass,
            output.summary.as_deref(),
        )?;
        let revealed = session.replace_deck(output.deck.clone());
        debug!(
            pass = output.pass.as_str(),
            entries = output.deck.len(),
            revealed,
            "deck committed"
        );
        Ok(true)
    }

    /// Quick pass, then (unless skipped) a deep pass whose result is dropped
    /// if the token moved while it ran.
    ///
    /// Returns `Ok(None)` when another generation on this session is in flight.
    pub async fn generate(
        &self,
        session: &VideoSession,
        inputs: GenerationInputs,
    ) -> Result<Option<GenerationReport>, ProvokeError> {
        let Some(busy) = session.generating.try_acquire() else {
            debug!("generation already in flight");
            return Ok(None);
        };
        let token = self.token.bump();
        self.say("Generating provocations…").await;

        let quick = match self.run_pass(session, &inputs, PassKind::Quick).await {
            Ok(quick) => quick,
            Err(e) => {
                self.report(&e).await;
                return Err(e);
            }
        };
        if !self.commit(session, &quick, token)? {
            return Err(ProvokeError::Superseded);
        }
        if quick.deck.is_empty() {
            self.say("No provocations returned. Try regenerating.").await;
        } else {
            self.say(&format!("{} provocations ready.", quick.deck.len()))
                .await;
        }
        drop(busy);

        if inputs.quick_only || self.settings.deep_model.is_empty() {
            return Ok(Some(GenerationReport {
                token,
                quick,
                deep: DeepOutcome::Skipped,
            }));
        }

        let captured = self.token.current();
        let deep = if captured != token {
            DeepOutcome::Superseded
        } else {
            self.deep_pass(session, &inputs, captured).await
        };
        Ok(Some(GenerationReport { token, quick, deep }))
    }

    async fn deep_pass(
        &self,
        session: &VideoSession,
        inputs: &GenerationInputs,
        captured: u64,
    ) -> DeepOutcome {
        match self.run_pass(session, inputs, PassKind::Deep).await {
            Ok(deep) if deep.deck.is_empty() => {
                warn!("deep pass returned no provocations; keeping quick deck");
                DeepOutcome::Failed("empty deck".into())
            }
            Ok(deep) => match self.commit(session, &deep, captured) {
                Ok(true) => {
                    info!(entries = deep.deck.len(), "deep pass committed");
                    DeepOutcome::Committed(deep)
                }
                Ok(false) => {
                    info!(captured, live = self.token.current(), "deep pass superseded");
                    DeepOutcome::Superseded
                }
                Err(e) => {
                    warn!(error = %e, "failed to store deep deck");
                    DeepOutcome::Failed(e.to_string())
                }
            },
            Err(e) => {
                warn!(error = %e, "deep pass failed; keeping quick deck");
                DeepOutcome::Failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::CollectStatus;
    use crate::surface::MockSurface;
    use pretty_assertions::assert_eq;
    use provoke_model::MockClient;
    use provoke_store::MemoryStore;
    use std::time::Duration;
    use tokio::sync::Notify;

    const QUICK: &str = r#"{"summary":"quick gist","provocations":[
        {"type":"Assumption","title":"Q1","prompt":"Who says so?","tStartMs":1000},
        {"type":"Ambiguity","title":"Q2","prompt":"Which sense?","tStartMs":30000}]}"#;
    const DEEP: &str = r#"{"summary":"deep gist","provocations":[
        {"type":"MissingEvidence","title":"D1","prompt":"Where is the data?","tStartMs":2000}]}"#;

    struct Fixture {
        client: Arc<MockClient>,
        context: Arc<ContextStore>,
        status: Arc<CollectStatus>,
        overlay: Overlay,
    }

    fn fixture(settings: Settings) -> Fixture {
        let client = Arc::new(MockClient::new());
        let context = Arc::new(ContextStore::new(Arc::new(MemoryStore::new())));
        let status = Arc::new(CollectStatus::new());
        let overlay = Overlay::new(client.clone(), context.clone(), settings)
            .with_status(status.clone());
        Fixture {
            client,
            context,
            status,
            overlay,
        }
    }

    fn transcript_settings() -> Settings {
        Settings {
            input_mode: InputMode::Transcript,
            ..Settings::default()
        }
    }

    fn with_transcript(session: &VideoSession) {
        session.set_transcript(vec![TranscriptLine {
            start_offset_ms: 0,
            text: "welcome to the show".into(),
        }]);
    }

    fn titles(deck: &[Provocation]) -> Vec<&str> {
        deck.iter().map(|p| p.title.as_str()).collect()
    }

    #[tokio::test]
    async fn quick_then_deep_commits_deep() {
        let f = fixture(transcript_settings());
        f.client.push_text(QUICK);
        f.client.push_text(DEEP);
        let session = f.overlay.navigate(VideoRef::new("abc")).unwrap();
        with_transcript(&session);
        session.on_playback(5_000);

        let report = f
            .overlay
            .generate(&session, GenerationInputs::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(titles(&report.quick.deck), vec!["Q1", "Q2"]);
        assert!(matches!(report.deep, DeepOutcome::Committed(_)));
        assert_eq!(titles(&session.deck_entries()), vec!["D1"]);
        assert_eq!(titles(&session.revealed()), vec!["D1"]);

        let record = f.context.load("abc").unwrap().unwrap();
        assert_eq!(record.deck_source, Some(PassKind::Deep));
        assert_eq!(record.summary, "deep gist");

        let requests = f.client.requests();
        assert_eq!(requests[0].0, "gemini-3-flash");
        assert_eq!(requests[1].0, "gemini-3-pro-preview");
        assert!(!requests[0].1.has_search_grounding());
        assert!(requests[1].1.has_search_grounding());
        assert!(requests[0].1.prompt_text().contains("welcome to the show"));
    }

    #[tokio::test]
    async fn superseded_deep_pass_is_dropped() {
        let f = fixture(transcript_settings());
        let gate = Arc::new(Notify::new());
        f.client.push_text(QUICK);
        f.client.push_gated(DEEP, gate.clone());
        let session = f.overlay.navigate(VideoRef::new("abc")).unwrap();
        with_transcript(&session);
        f.overlay.token().bump();

        let overlay = &f.overlay;
        let run = overlay.generate(&session, GenerationInputs::default());
        let interfere = async {
            let client = f.client.clone();
            let ready = crate::wait_until::wait_until(
                Duration::from_secs(2),
                Duration::from_millis(5),
                move || {
                    let client = client.clone();
                    async move { client.request_count() == 2 }
                },
            )
            .await;
            assert!(ready.is_ready());
            assert_eq!(overlay.token().bump(), 4);
            gate.notify_one();
        };
        let (report, ()) = tokio::join!(run, interfere);
        let report = report.unwrap().unwrap();

        assert_eq!(report.token, 3);
        assert_eq!(report.deep, DeepOutcome::Superseded);
        assert_eq!(titles(&session.deck_entries()), vec!["Q1", "Q2"]);
        let record = f.context.load("abc").unwrap().unwrap();
        assert_eq!(record.deck_source, Some(PassKind::Quick));
        assert_eq!(record.summary, "quick gist");
    }

    #[tokio::test]
    async fn deep_failure_keeps_quick_deck() {
        let f = fixture(transcript_settings());
        f.client.push_text(QUICK);
        f.client.push_failure("HTTP 503");
        let session = f.overlay.navigate(VideoRef::new("abc")).unwrap();
        with_transcript(&session);

        let report = f
            .overlay
            .generate(&session, GenerationInputs::default())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(report.deep, DeepOutcome::Failed(_)));
        assert_eq!(titles(&session.deck_entries()), vec!["Q1", "Q2"]);
        assert_eq!(
            f.context.load("abc").unwrap().unwrap().deck_source,
            Some(PassKind::Quick)
        );
    }

    #[tokio::test]
    async fn missing_transcript_fails_fast_with_status() {
        let f = fixture(transcript_settings());
        let session = f.overlay.navigate(VideoRef::new("abc")).unwrap();
        let err = f
            .overlay
            .generate(&session, GenerationInputs::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ProvokeError::CaptureFailure(_)));
        assert_eq!(f.client.request_count(), 0);
        assert!(f
            .status
            .messages()
            .iter()
            .any(|m| m.contains("transcript missing")));
        assert!(!session.is_generating());
    }

    #[tokio::test]
    async fn frames_mode_attaches_images_and_url_mode_attaches_link() {
        let f = fixture(Settings {
            max_frames: 2,
            frame_interval_sec: 1,
            ..Settings::default()
        });
        f.client.push_text(QUICK);
        let session = f.overlay.navigate(VideoRef::new("abc")).unwrap();
        let surface = MockSurface::new();
        let frames = f
            .overlay
            .capture_for_generation(&session, &surface)
            .await
            .unwrap();
        let inputs = GenerationInputs {
            frames,
            quick_only: true,
            ..GenerationInputs::default()
        };
        let report = f.overlay.generate(&session, inputs).await.unwrap().unwrap();
        assert_eq!(report.deep, DeepOutcome::Skipped);
        assert_eq!(f.client.requests()[0].1.image_count(), 2);

        let g = fixture(Settings {
            input_mode: InputMode::YoutubeUrl,
            ..Settings::default()
        });
        g.client.push_text(QUICK);
        let session = g.overlay.navigate(VideoRef::new("xyz")).unwrap();
        let inputs = GenerationInputs {
            quick_only: true,
            ..GenerationInputs::default()
        };
        g.overlay.generate(&session, inputs).await.unwrap().unwrap();
        let body = serde_json::to_string(&g.client.requests()[0].1).unwrap();
        assert!(body.contains("https://www.youtube.com/watch?v=xyz"));
    }

    #[tokio::test]
    async fn display_cap_limits_deck() {
        let f = fixture(Settings {
            max_provocations: 3,
            ..transcript_settings()
        });
        let items: Vec<String> = (0..5)
            .map(|i| format!(r#"{{"title":"T{i}","prompt":"why {i}?","tStartMs":{}}}"#, i * 1000))
            .collect();
        f.client
            .push_text(format!(r#"{{"provocations":[{}]}}"#, items.join(",")));
        let session = f.overlay.navigate(VideoRef::new("abc")).unwrap();
        with_transcript(&session);
        let inputs = GenerationInputs {
            quick_only: true,
            ..GenerationInputs::default()
        };
        let report = f.overlay.generate(&session, inputs).await.unwrap().unwrap();
        assert_eq!(titles(&report.quick.deck), vec!["T0", "T1", "T2"]);
    }

    #[tokio::test]
    async fn navigate_restores_stored_deck_and_cancels_old_session() {
        let f = fixture(transcript_settings());
        f.client.push_text(QUICK);
        let first = f.overlay.navigate(VideoRef::new("abc")).unwrap();
        with_transcript(&first);
        let inputs = GenerationInputs {
            quick_only: true,
            ..GenerationInputs::default()
        };
        f.overlay.generate(&first, inputs).await.unwrap().unwrap();

        let before = f.overlay.token().current();
        let other = f.overlay.navigate(VideoRef::new("zzz")).unwrap();
        assert!(first.is_closed());
        assert!(other.deck_entries().is_empty());
        assert!(f.overlay.token().current() > before);

        let again = f.overlay.navigate(VideoRef::new("abc")).unwrap();
        assert_eq!(titles(&again.deck_entries()), vec!["Q1", "Q2"]);
        assert!(again.revealed().is_empty());
        assert_eq!(titles(&again.on_playback(1_000)), vec!["Q1"]);
    }

    #[tokio::test]
    async fn jump_seeks_plays_and_reveals() {
        let f = fixture(transcript_settings());
        f.client.push_text(QUICK);
        let session = f.overlay.navigate(VideoRef::new("abc")).unwrap();
        with_transcript(&session);
        let inputs = GenerationInputs {
            quick_only: true,
            ..GenerationInputs::default()
        };
        f.overlay.generate(&session, inputs).await.unwrap();

        let surface = MockSurface::new();
        let revealed = session.jump_to(&surface, 30_000).await.unwrap();
        assert_eq!(titles(&revealed), vec!["Q1", "Q2"]);
        assert_eq!(surface.seeks(), vec![30_000]);
        assert!(surface.is_playing());
    }

    struct Json3Http;

    #[async_trait::async_trait]
    impl CaptionHttp for Json3Http {
        async fn get(&self, _url: &str) -> Result<provoke_transcript::CaptionBody, ProvokeError> {
            Ok(provoke_transcript::CaptionBody {
                text: r#"{"events":[{"tStartMs":0,"segs":[{"utf8":"hi"}]},{"tStartMs":1500,"segs":[{"utf8":"there"}]}]}"#.into(),
                content_type: "application/json".into(),
            })
        }
    }

    fn track(url: &str) -> CaptionTrack {
        CaptionTrack {
            locator_url: url.into(),
            language_code: "en".into(),
            display_name: "English".into(),
            kind: None,
        }
    }

    #[tokio::test]
    async fn refresh_transcript_loads_preferred_track() {
        let f = fixture(transcript_settings());
        let session = f.overlay.navigate(VideoRef::new("abc")).unwrap();
        let surface = MockSurface::new();
        surface.set_tracks(vec![track("https://www.youtube.com/api/timedtext?v=abc&lang=en")]);

        let count = f
            .overlay
            .refresh_transcript(&session, &surface, &Json3Http)
            .await
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(session.transcript_lines()[1].text, "there");
        assert!(f
            .status
            .messages()
            .contains(&"Transcript loaded (2 lines).".to_string()));
    }

    #[tokio::test]
    async fn blocked_track_clears_transcript_and_reports() {
        let f = fixture(transcript_settings());
        let session = f.overlay.navigate(VideoRef::new("abc")).unwrap();
        with_transcript(&session);
        let err = f
            .overlay
            .load_transcript(&session, &Json3Http, &track("https://evil.example/api/timedtext"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProvokeError::BlockedSource { .. }));
        assert!(session.transcript_lines().is_empty());
        assert_eq!(
            f.status.messages().last().map(String::as_str),
            Some("Blocked non-YouTube caption URL")
        );
    }
}
