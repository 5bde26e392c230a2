use crate::client::GenerationClient;
use crate::request::{GenerateRequest, GenerateResponse};
use provoke_core::ProvokeError;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

enum Reply {
    Text(String),
    Fail(String),
    /// Held until the gate is notified.
    Gated(String, Arc<Notify>),
}

/// Scripted [`GenerationClient`]: replies are consumed in order and every
/// request is recorded together with the model it was sent to.
#[derive(Default)]
pub struct MockClient {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<(String, GenerateRequest)>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_text(&self, text: impl Into<String>) {
        self.push(Reply::Text(text.into()));
    }

    pub fn push_failure(&self, message: impl Into<String>) {
        self.push(Reply::Fail(message.into()));
    }

    /// Queue a reply that is released only after `gate` is notified.
    pub fn push_gated(&self, text: impl Into<String>, gate: Arc<Notify>) {
        self.push(Reply::Gated(text.into(), gate));
    }

    pub fn requests(&self) -> Vec<(String, GenerateRequest)> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn push(&self, reply: Reply) {
        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(reply);
    }
}

#[async_trait::async_trait]
impl GenerationClient for MockClient {
    async fn generate(
        &self,
        model: &str,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse, ProvokeError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((model.to_string(), request.clone()));
        let reply = self
            .replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        match reply {
            Some(Reply::Text(text)) => Ok(GenerateResponse::from_text(text)),
            Some(Reply::Fail(message)) => Err(ProvokeError::TransportFailure(message)),
            Some(Reply::Gated(text, gate)) => {
                gate.notified().await;
                Ok(GenerateResponse::from_text(text))
            }
            None => Err(ProvokeError::TransportFailure(
                "mock client has no scripted reply".into(),
            )),
        }
    }
}
