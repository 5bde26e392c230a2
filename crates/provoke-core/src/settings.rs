use serde::{Deserialize, Serialize};

/// Storage key of the settings record.
pub const SETTINGS_KEY: &str = "provocations_settings_v1";

/// What the generation passes are fed with.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    #[serde(rename = "frames")]
    Frames,
    #[serde(rename = "transcript")]
    Transcript,
    #[serde(rename = "frames+transcript")]
    FramesAndTranscript,
    /// The watch URL itself is sent as a remote media reference.
    #[serde(rename = "youtube_url")]
    YoutubeUrl,
}

impl InputMode {
    pub fn wants_frames(&self) -> bool {
        matches!(self, InputMode::Frames | InputMode::FramesAndTranscript)
    }

    pub fn wants_transcript(&self) -> bool {
        matches!(self, InputMode::Transcript | InputMode::FramesAndTranscript)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InputMode::Frames => "frames",
            InputMode::Transcript => "transcript",
            InputMode::FramesAndTranscript => "frames+transcript",
            InputMode::YoutubeUrl => "youtube_url",
        }
    }
}

/// User settings. Read-only from the core's perspective.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub provider: String,
    /// Quick-pass model.
    pub model: String,
    pub deep_model: String,
    pub api_key: String,
    pub enable_search_grounding: bool,
    pub input_mode: InputMode,
    pub frame_interval_sec: u64,
    pub max_frames: usize,
    pub max_provocations: usize,
    pub max_transcript_chars: usize,
    pub context_interval_sec: u64,
    pub max_stored_videos: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-3-flash".to_string(),
            deep_model: "gemini-3-pro-preview".to_string(),
            api_key: String::new(),
            enable_search_grounding: true,
            input_mode: InputMode::Frames,
            frame_interval_sec: 5,
            max_frames: 6,
            max_provocations: 12,
            max_transcript_chars: 12_000,
            context_interval_sec: 15,
            max_stored_videos: 25,
        }
    }
}

impl Settings {
    /// Clamp numeric fields into their accepted ranges.
    pub fn sanitized(mut self) -> Self {
        self.frame_interval_sec = self.frame_interval_sec.clamp(1, 30);
        self.max_frames = self.max_frames.clamp(1, 12);
        self.max_provocations = self.max_provocations.clamp(3, 30);
        self.max_transcript_chars = self.max_transcript_chars.clamp(2_000, 50_000);
        self.context_interval_sec = self.context_interval_sec.max(1);
        self.max_stored_videos = self.max_stored_videos.max(1);
        self.model = self.model.trim().to_string();
        self.deep_model = self.deep_model.trim().to_string();
        self.api_key = self.api_key.trim().to_string();
        self
    }

    /// Parse a stored settings value; unknown or malformed content yields defaults.
    pub fn from_value(value: Option<serde_json::Value>) -> Self {
        value
            .and_then(|v| serde_json::from_value::<Settings>(v).ok())
            .unwrap_or_default()
            .sanitized()
    }

    /// Apply `PROVOKE_API_KEY` / `GEMINI_API_KEY` and `PROVOKE_MODEL` overrides.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let key = lookup("PROVOKE_API_KEY")
            .or_else(|| lookup("GEMINI_API_KEY"))
            .filter(|k| !k.trim().is_empty());
        if let Some(key) = key {
            self.api_key = key.trim().to_string();
        }
        if let Some(model) = lookup("PROVOKE_MODEL").filter(|m| !m.trim().is_empty()) {
            self.model = model.trim().to_string();
        }
        self
    }

    /// Item count requested from the model. Capped lower than the display limit.
    pub fn requested_count(&self) -> usize {
        self.max_provocations.clamp(3, 10)
    }

    /// Copy safe to print: the API key is masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.api_key.is_empty() {
            let tail: String = copy
                .api_key
                .chars()
                .rev()
                .take(4)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            copy.api_key = format!("****{tail}");
        }
        copy
    }
}
