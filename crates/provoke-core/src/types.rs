use base64::Engine;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::ProvokeError;

/// Maximum characters kept for a provocation's kind label.
pub const KIND_MAX_CHARS: usize = 40;
/// Maximum characters kept for a provocation title.
pub const TITLE_MAX_CHARS: usize = 180;
/// Maximum characters kept for a provocation body.
pub const BODY_MAX_CHARS: usize = 900;
/// Maximum characters kept for a provocation excerpt.
pub const EXCERPT_MAX_CHARS: usize = 360;

/// Observations retained per context record (most recent wins).
pub const MAX_OBSERVATIONS: usize = 50;

/// One caption line, as produced by every caption parser.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptLine {
    pub start_offset_ms: u64,
    pub text: String,
}

/// A deck entry: a short challenge attached to a moment of the video.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Provocation {
    pub id: String,
    pub kind: String,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub excerpt: String,
    pub start_offset_ms: u64,
}

/// Which generation pass produced a deck (or is being run).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PassKind {
    Quick,
    Deep,
}

impl PassKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PassKind::Quick => "quick",
            PassKind::Deep => "deep",
        }
    }
}

/// A sparse sampled note about what was happening at a playback offset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub start_offset_ms: u64,
    pub note: String,
}

/// Per-video persisted context: rolling observations plus a regenerated summary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContextRecord {
    pub video_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_summary_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub observations: Vec<Observation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deck: Option<Vec<Provocation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deck_source: Option<PassKind>,
}

impl ContextRecord {
    pub fn new(video: &VideoRef, now: OffsetDateTime) -> Self {
        Self {
            video_id: video.video_id.clone(),
            title: video.title.clone(),
            url: video.url.clone(),
            created_at: now,
            updated_at: now,
            last_summary_at: None,
            summary: String::new(),
            observations: Vec::new(),
            deck: None,
            deck_source: None,
        }
    }

    /// Append an observation, keeping only the most recent [`MAX_OBSERVATIONS`].
    pub fn push_observation(&mut self, obs: Observation, now: OffsetDateTime) {
        self.observations.push(obs);
        if self.observations.len() > MAX_OBSERVATIONS {
            let excess = self.observations.len() - MAX_OBSERVATIONS;
            self.observations.drain(..excess);
        }
        self.updated_at = now;
    }
}

/// Identity of the video a session is bound to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct VideoRef {
    pub video_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
}

impl VideoRef {
    pub fn new(video_id: impl Into<String>) -> Self {
        let video_id = video_id.into();
        let url = format!("https://www.youtube.com/watch?v={video_id}");
        Self {
            video_id,
            title: String::new(),
            url,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}

/// A caption track advertised by the host page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CaptionTrack {
    pub locator_url: String,
    #[serde(default)]
    pub language_code: String,
    #[serde(default)]
    pub display_name: String,
    /// `Some("asr")` for auto-generated tracks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// An encoded still image captured from the player (or its thumbnail).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub mime_type: String,
    pub data: Vec<u8>,
    pub offset_ms: Option<u64>,
}

impl Frame {
    pub fn jpeg(data: Vec<u8>) -> Self {
        Self {
            mime_type: "image/jpeg".to_string(),
            data,
            offset_ms: None,
        }
    }

    pub fn at(mut self, offset_ms: u64) -> Self {
        self.offset_ms = Some(offset_ms);
        self
    }

    /// Decode a `data:<mime>;base64,<payload>` URL.
    pub fn from_data_url(data_url: &str) -> Result<Self, ProvokeError> {
        let rest = data_url
            .strip_prefix("data:")
            .ok_or_else(|| ProvokeError::CaptureFailure("not a data URL".into()))?;
        let (meta, payload) = rest
            .split_once(',')
            .ok_or_else(|| ProvokeError::CaptureFailure("data URL has no payload".into()))?;
        let mime_type = meta
            .strip_suffix(";base64")
            .ok_or_else(|| ProvokeError::CaptureFailure("data URL is not base64".into()))?;
        if !mime_type.starts_with("image/") {
            return Err(ProvokeError::CaptureFailure(format!(
                "unexpected frame format: {mime_type}"
            )));
        }
        let data = base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| ProvokeError::CaptureFailure(format!("invalid base64 frame: {e}")))?;
        Ok(Self {
            mime_type: mime_type.to_string(),
            data,
            offset_ms: None,
        })
    }

    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }
}
