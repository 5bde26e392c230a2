use provoke_core::{CaptionTrack, Frame, ProvokeError};
use std::sync::Mutex;

/// Capabilities of the host page's player.
#[async_trait::async_trait]
pub trait PlayerSurface: Send + Sync {
    async fn current_time_ms(&self) -> Result<u64, ProvokeError>;
    /// Metadata loaded and a frame is decodable.
    async fn is_ready(&self) -> bool;
    async fn seek(&self, ms: u64) -> Result<(), ProvokeError>;
    async fn play(&self) -> Result<(), ProvokeError>;
    async fn pause(&self) -> Result<(), ProvokeError>;
    async fn capture_frame(&self) -> Result<Frame, ProvokeError>;
    /// Static poster image, when the page has one.
    async fn thumbnail(&self) -> Option<Frame>;
    async fn caption_tracks(&self) -> Vec<CaptionTrack>;
}

#[derive(Debug, Default)]
struct MockState {
    time_ms: u64,
    ready: bool,
    playing: bool,
    capture_fails: bool,
    captures: u32,
    seeks: Vec<u64>,
    thumbnail: Option<Frame>,
    tracks: Vec<CaptionTrack>,
}

/// In-memory player for tests. Captured frames carry the capture count as
/// their single data byte.
#[derive(Debug, Default)]
pub struct MockSurface {
    state: Mutex<MockState>,
}

impl MockSurface {
    /// A ready player at offset 0.
    pub fn new() -> Self {
        let surface = Self::default();
        surface.lock().ready = true;
        surface
    }

    pub fn set_time(&self, ms: u64) {
        self.lock().time_ms = ms;
    }

    pub fn set_ready(&self, ready: bool) {
        self.lock().ready = ready;
    }

    pub fn fail_captures(&self, fail: bool) {
        self.lock().capture_fails = fail;
    }

    pub fn set_thumbnail(&self, frame: Frame) {
        self.lock().thumbnail = Some(frame);
    }

    pub fn set_tracks(&self, tracks: Vec<CaptionTrack>) {
        self.lock().tracks = tracks;
    }

    pub fn seeks(&self) -> Vec<u64> {
        self.lock().seeks.clone()
    }

    pub fn is_playing(&self) -> bool {
        self.lock().playing
    }

    pub fn captures(&self) -> u32 {
        self.lock().captures
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait::async_trait]
impl PlayerSurface for MockSurface {
    async fn current_time_ms(&self) -> Result<u64, ProvokeError> {
        Ok(self.lock().time_ms)
    }

    async fn is_ready(&self) -> bool {
        self.lock().ready
    }

    async fn seek(&self, ms: u64) -> Result<(), ProvokeError> {
        let mut state = self.lock();
        state.seeks.push(ms);
        state.time_ms = ms;
        Ok(())
    }

    async fn play(&self) -> Result<(), ProvokeError> {
        self.lock().playing = true;
        Ok(())
    }

    async fn pause(&self) -> Result<(), ProvokeError> {
        self.lock().playing = false;
        Ok(())
    }

    async fn capture_frame(&self) -> Result<Frame, ProvokeError> {
        let mut state = self.lock();
        if state.capture_fails || !state.ready {
            return Err(ProvokeError::CaptureFailure(
                "no capturable video frame".into(),
            ));
        }
        state.captures += 1;
        Ok(Frame::jpeg(vec![state.captures as u8]).at(state.time_ms))
    }

    async fn thumbnail(&self) -> Option<Frame> {
        self.lock().thumbnail.clone()
    }

    async fn caption_tracks(&self) -> Vec<CaptionTrack> {
        self.lock().tracks.clone()
    }
}
