use thiserror::Error;

/// Failure taxonomy shared by every Provoke crate.
#[derive(Debug, Error)]
pub enum ProvokeError {
    /// The caption URL is not on the allow-list. Never retried.
    #[error("blocked caption source: {url}")]
    BlockedSource { url: String },
    /// Model text could not be turned into a JSON object, even after repair.
    #[error("model returned malformed output ({} chars)", raw.chars().count())]
    MalformedOutput { raw: String },
    #[error("capture failed: {0}")]
    CaptureFailure(String),
    #[error("transport failure: {0}")]
    TransportFailure(String),
    /// A newer session or request invalidated this result.
    #[error("superseded by a newer pass")]
    Superseded,
    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl ProvokeError {
    /// Whether the overlay should render this as a status message.
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, ProvokeError::Superseded)
    }

    /// Short status line for the overlay.
    pub fn status_message(&self) -> String {
        match self {
            ProvokeError::BlockedSource { .. } => "Blocked non-YouTube caption URL".to_string(),
            ProvokeError::MalformedOutput { .. } => {
                "The model returned output that could not be parsed. Try regenerating.".to_string()
            }
            other => other.to_string(),
        }
    }
}
