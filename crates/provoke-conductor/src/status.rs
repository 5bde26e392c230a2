/// Where inline status lines for the overlay go.
#[async_trait::async_trait]
pub trait StatusSink: Send + Sync {
    async fn status(&self, message: &str);
}

/// Prints to stderr.
pub struct StderrStatus;

#[async_trait::async_trait]
impl StatusSink for StderrStatus {
    async fn status(&self, message: &str) {
        eprintln!("[provoke] {message}");
    }
}

/// Collects messages in memory (for testing).
#[derive(Default)]
pub struct CollectStatus {
    messages: std::sync::Mutex<Vec<String>>,
}

impl CollectStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait::async_trait]
impl StatusSink for CollectStatus {
    async fn status(&self, message: &str) {
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message.to_string());
    }
}
