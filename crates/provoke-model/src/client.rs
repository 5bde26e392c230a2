use crate::request::{GenerateRequest, GenerateResponse};
use crate::stream::{SseLines, StreamAccumulator, StreamEvent};
use provoke_core::ProvokeError;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// The generation endpoint. Implemented by [`GeminiClient`] and by
/// [`MockClient`](crate::MockClient) for tests.
#[async_trait::async_trait]
pub trait GenerationClient: Send + Sync {
    async fn generate(
        &self,
        model: &str,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse, ProvokeError>;

    /// Stream a response, sending deltas to `events` and finishing with
    /// [`StreamEvent::Done`]. Returns the full text.
    ///
    /// The default implementation issues one non-streaming call and emits its
    /// text as a single delta.
    async fn stream_generate(
        &self,
        model: &str,
        request: &GenerateRequest,
        events: mpsc::Sender<StreamEvent>,
    ) -> Result<String, ProvokeError> {
        let text = self.generate(model, request).await?.text();
        if !text.is_empty() {
            let _ = events.send(StreamEvent::Delta(text.clone())).await;
        }
        let _ = events.send(StreamEvent::Done).await;
        Ok(text)
    }
}

/// Client for the Gemini `generateContent` REST API.
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProvokeError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ProvokeError::TransportFailure(
                "missing API key; set it in settings or PROVOKE_API_KEY".into(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ProvokeError::TransportFailure(e.to_string()))?;
        Ok(Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, model: &str, method: &str) -> Result<String, ProvokeError> {
        if model.trim().is_empty() {
            return Err(ProvokeError::TransportFailure(
                "missing model name; set it in settings".into(),
            ));
        }
        Ok(format!("{}/models/{}:{method}", self.base_url, model.trim()))
    }

    async fn post(
        &self,
        url: &str,
        query: &[(&str, &str)],
        request: &GenerateRequest,
    ) -> Result<reqwest::Response, ProvokeError> {
        let resp = self
            .client
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .query(query)
            .json(request)
            .send()
            .await
            .map_err(|e| ProvokeError::TransportFailure(e.to_string()))?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body: Option<serde_json::Value> = resp.json().await.ok();
        let message = body
            .as_ref()
            .and_then(|b| b.get("error"))
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
        Err(ProvokeError::TransportFailure(format!(
            "Gemini error: {message}"
        )))
    }
}

#[async_trait::async_trait]
impl GenerationClient for GeminiClient {
    async fn generate(
        &self,
        model: &str,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse, ProvokeError> {
        let url = self.endpoint(model, "generateContent")?;
        debug!(model, tools = request.tools.len(), "generateContent");
        let resp = self.post(&url, &[], request).await?;
        resp.json::<GenerateResponse>()
            .await
            .map_err(|e| ProvokeError::TransportFailure(format!("invalid response body: {e}")))
    }

    async fn stream_generate(
        &self,
        model: &str,
        request: &GenerateRequest,
        events: mpsc::Sender<StreamEvent>,
    ) -> Result<String, ProvokeError> {
        let url = self.endpoint(model, "streamGenerateContent")?;
        debug!(model, "streamGenerateContent");
        let mut resp = self.post(&url, &[("alt", "sse")], request).await?;

        let mut lines = SseLines::default();
        let mut acc = StreamAccumulator::new();
        while let Some(chunk) = resp
            .chunk()
            .await
            .map_err(|e| ProvokeError::TransportFailure(e.to_string()))?
        {
            for data in lines.feed(&chunk) {
                forward_frame(&data, &mut acc, &events).await;
            }
        }
        if let Some(data) = lines.finish() {
            forward_frame(&data, &mut acc, &events).await;
        }
        let _ = events.send(StreamEvent::Done).await;
        Ok(acc.into_text())
    }
}

async fn forward_frame(data: &str, acc: &mut StreamAccumulator, events: &mpsc::Sender<StreamEvent>) {
    let Ok(frame) = serde_json::from_str::<GenerateResponse>(data) else {
        debug!(frame = data, "skipping unparsable stream frame");
        return;
    };
    if let Some(delta) = acc.push(&frame.text()) {
        let _ = events.send(StreamEvent::Delta(delta)).await;
    }
}

/// Run a request and return the first candidate's text.
pub async fn generate_text(
    client: &dyn GenerationClient,
    model: &str,
    request: &GenerateRequest,
) -> Result<String, ProvokeError> {
    Ok(client.generate(model, request).await?.text())
}
