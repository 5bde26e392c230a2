//! Privileged request handler: settings lookup and proxied model calls.

use provoke_core::{ProvokeError, Settings};
use provoke_model::{GeminiClient, GenerateRequest, GenerationClient};
use provoke_store::{load_settings, KvStore};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

const WATCH_PREFIXES: &[&str] = &["https://www.youtube.com/watch", "https://m.youtube.com/watch"];

/// Messages accepted by [`Background::handle`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum BackgroundRequest {
    #[serde(rename = "provocations:getSettings")]
    GetSettings,
    #[serde(rename = "provocations:generate")]
    Generate(GenerateRequest),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackgroundResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<Settings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BackgroundResponse {
    fn settings(settings: Settings) -> Self {
        Self {
            ok: true,
            settings: Some(settings),
            data: None,
            error: None,
        }
    }

    fn data(data: Value) -> Self {
        Self {
            ok: true,
            settings: None,
            data: Some(data),
            error: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            settings: None,
            data: None,
            error: Some(message.into()),
        }
    }
}

pub fn is_watch_page(sender_url: &str) -> bool {
    WATCH_PREFIXES.iter().any(|p| sender_url.starts_with(p))
}

/// Owns the API key; page code never sees it.
pub struct Background {
    store: Arc<dyn KvStore>,
    dev_settings: Option<PathBuf>,
    client: Option<Arc<dyn GenerationClient>>,
}

impl Background {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            dev_settings: None,
            client: None,
        }
    }

    /// Settings file that takes precedence over stored settings.
    pub fn with_dev_settings(mut self, path: impl Into<PathBuf>) -> Self {
        self.dev_settings = Some(path.into());
        self
    }

    /// Use `client` instead of building a Gemini client from the stored key.
    pub fn with_client(mut self, client: Arc<dyn GenerationClient>) -> Self {
        self.client = Some(client);
        self
    }

    fn settings(&self) -> Settings {
        load_settings(self.store.as_ref(), self.dev_settings.as_deref())
    }

    pub async fn handle(&self, message: &Value, sender_url: &str) -> BackgroundResponse {
        let request = match serde_json::from_value::<BackgroundRequest>(message.clone()) {
            Ok(request) => request,
            Err(e) => {
                debug!(error = %e, "rejected background message");
                return BackgroundResponse::error("Unknown message type");
            }
        };
        match request {
            BackgroundRequest::GetSettings => BackgroundResponse::settings(self.settings().redacted()),
            BackgroundRequest::Generate(body) => match self.generate(&body, sender_url).await {
                Ok(data) => BackgroundResponse::data(data),
                Err(message) => BackgroundResponse::error(message),
            },
        }
    }

    async fn generate(&self, body: &GenerateRequest, sender_url: &str) -> Result<Value, String> {
        if !is_watch_page(sender_url) {
            warn!(sender_url, "generate request from outside a watch page");
            return Err("Generate requests are only allowed from YouTube watch pages.".into());
        }
        let settings = self.settings();
        if settings.provider != "gemini" {
            return Err(format!("Unsupported provider: {}", settings.provider));
        }
        let response = match &self.client {
            Some(client) => client.generate(&settings.model, body).await,
            None => match GeminiClient::new(settings.api_key.clone()) {
                Ok(client) => client.generate(&settings.model, body).await,
                Err(e) => Err(e),
            },
        }
        .map_err(|e| match e {
            ProvokeError::TransportFailure(message) => message,
            other => other.to_string(),
        })?;
        serde_json::to_value(response).map_err(|e| e.to_string())
    }
}
