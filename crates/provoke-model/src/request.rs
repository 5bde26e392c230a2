//! Wire shapes for the generation endpoint.
//!
//! This is the only place that knows the endpoint's field naming. Outgoing
//! payloads are camelCase; incoming payloads also accept the snake_case
//! spellings some API variants emit.

use provoke_core::Frame;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Request ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
    #[serde(
        default,
        alias = "generation_config",
        skip_serializing_if = "Option::is_none"
    )]
    pub generation_config: Option<GenerationConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,
}

impl GenerateRequest {
    /// A single user turn made of `parts`.
    pub fn user(parts: Vec<Part>, config: GenerationConfig) -> Self {
        Self {
            contents: vec![Content {
                role: "user".to_string(),
                parts,
            }],
            generation_config: Some(config),
            tools: Vec::new(),
        }
    }

    /// A single text-only user turn.
    pub fn prompt(text: impl Into<String>, config: GenerationConfig) -> Self {
        Self::user(vec![Part::text(text)], config)
    }

    /// Attach the search grounding tool.
    pub fn with_search_grounding(mut self, enabled: bool) -> Self {
        if enabled && !self.has_search_grounding() {
            self.tools.push(Tool::google_search());
        }
        self
    }

    pub fn has_search_grounding(&self) -> bool {
        self.tools.iter().any(|t| t.google_search.is_some())
    }

    /// Concatenated text of every part, for logging and test assertions.
    pub fn prompt_text(&self) -> String {
        self.contents
            .iter()
            .flat_map(|c| c.parts.iter())
            .filter_map(|p| match p {
                Part::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn image_count(&self) -> usize {
        self.contents
            .iter()
            .flat_map(|c| c.parts.iter())
            .filter(|p| matches!(p, Part::InlineData { .. }))
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// One ordered content part: text, inline image bytes, or a remote media reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData", alias = "inline_data")]
        inline_data: Blob,
    },
    FileData {
        #[serde(rename = "fileData", alias = "file_data")]
        file_data: FileRef,
    },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    pub fn image(frame: &Frame) -> Self {
        Part::InlineData {
            inline_data: Blob {
                mime_type: frame.mime_type.clone(),
                data: frame.to_base64(),
            },
        }
    }

    /// A remote media reference (e.g. a watch-page URL).
    pub fn file_uri(uri: impl Into<String>) -> Self {
        Part::FileData {
            file_data: FileRef {
                file_uri: uri.into(),
                mime_type: None,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    #[serde(alias = "mime_type")]
    pub mime_type: String,
    /// Base64 payload.
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRef {
    #[serde(alias = "file_uri")]
    pub file_uri: String,
    #[serde(default, alias = "mime_type", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f64,
    #[serde(alias = "max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(
        default,
        alias = "response_mime_type",
        skip_serializing_if = "Option::is_none"
    )]
    pub response_mime_type: Option<String>,
}

impl GenerationConfig {
    /// Structured-output mode used for decks and repairs.
    pub fn json() -> Self {
        Self {
            temperature: 0.2,
            max_output_tokens: 2048,
            response_mime_type: Some("application/json".to_string()),
        }
    }

    /// Free-text mode used for chat answers and summaries.
    pub fn text(max_output_tokens: u32) -> Self {
        Self {
            temperature: 0.2,
            max_output_tokens,
            response_mime_type: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    #[serde(
        default,
        rename = "googleSearch",
        alias = "google_search",
        skip_serializing_if = "Option::is_none"
    )]
    pub google_search: Option<Value>,
}

impl Tool {
    pub fn google_search() -> Self {
        Self {
            google_search: Some(Value::Object(Default::default())),
        }
    }
}

// ── Response ──

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<CandidatePart>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidatePart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl GenerateResponse {
    /// A response whose first candidate carries `text`.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            candidates: vec![Candidate {
                content: Some(CandidateContent {
                    parts: vec![CandidatePart {
                        text: Some(text.into()),
                    }],
                }),
            }],
        }
    }

    /// Concatenated non-empty text parts of the first candidate; other candidates are ignored.
    pub fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .filter(|t| !t.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}
