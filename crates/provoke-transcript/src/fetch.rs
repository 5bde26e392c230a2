use crate::allow::{is_allowed_caption_url, with_format};
use crate::parse::{parse_json3, parse_markup, parse_vtt};
use provoke_core::{ProvokeError, TranscriptLine};
use std::time::Duration;
use tracing::{debug, warn};

const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Body and content type of a caption response.
#[derive(Debug, Clone, Default)]
pub struct CaptionBody {
    pub text: String,
    pub content_type: String,
}

impl CaptionBody {
    fn looks_like_json(&self) -> bool {
        self.content_type.contains("application/json") || self.text.trim_start().starts_with('{')
    }
}

/// HTTP GET for caption URLs. Implemented by [`ReqwestCaptionHttp`] and by test mocks.
#[async_trait::async_trait]
pub trait CaptionHttp: Send + Sync {
    async fn get(&self, url: &str) -> Result<CaptionBody, ProvokeError>;
}

/// Caption fetcher backed by a shared `reqwest` client.
pub struct ReqwestCaptionHttp {
    client: reqwest::Client,
}

impl ReqwestCaptionHttp {
    pub fn new() -> Result<Self, ProvokeError> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent("Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36")
            .build()
            .map_err(|e| ProvokeError::TransportFailure(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl CaptionHttp for ReqwestCaptionHttp {
    async fn get(&self, url: &str) -> Result<CaptionBody, ProvokeError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ProvokeError::TransportFailure(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ProvokeError::TransportFailure(format!(
                "caption fetch returned HTTP {status}"
            )));
        }
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let text = resp
            .text()
            .await
            .map_err(|e| ProvokeError::TransportFailure(e.to_string()))?;
        Ok(CaptionBody { text, content_type })
    }
}

/// Fetch a caption track and parse it into ordered lines.
///
/// Formats are tried in order of reliability: structured events (`fmt=json3`),
/// cue text (`fmt=vtt`), then the bare default markup. The first format that
/// yields at least one line wins. Transport errors on the first two attempts
/// fall through; only the final attempt's error surfaces.
pub async fn fetch_transcript(
    http: &dyn CaptionHttp,
    track_url: &str,
) -> Result<Vec<TranscriptLine>, ProvokeError> {
    if !is_allowed_caption_url(track_url) {
        return Err(ProvokeError::BlockedSource {
            url: track_url.to_string(),
        });
    }

    match http.get(&with_format(track_url, Some("json3"))?).await {
        Ok(body) if body.looks_like_json() => match parse_json3(&body.text) {
            Ok(lines) if !lines.is_empty() => return Ok(lines),
            Ok(_) => debug!("json3 captions had no lines"),
            Err(e) => debug!(error = %e, "json3 captions did not parse"),
        },
        Ok(body) => debug!(content_type = %body.content_type, "json3 request returned non-JSON"),
        Err(e) => warn!(error = %e, "json3 caption fetch failed"),
    }

    match http.get(&with_format(track_url, Some("vtt"))?).await {
        Ok(body) => {
            let lines = parse_vtt(&body.text);
            if !lines.is_empty() {
                return Ok(lines);
            }
            debug!("vtt captions had no lines");
        }
        Err(e) => warn!(error = %e, "vtt caption fetch failed"),
    }

    let body = http.get(&with_format(track_url, None)?).await?;
    let lines = parse_markup(&body.text);
    debug!(count = lines.len(), "parsed timedtext markup");
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves canned bodies keyed by the `fmt` parameter (`""` for none).
    struct MockCaptionHttp {
        bodies: HashMap<&'static str, Result<CaptionBody, String>>,
        requested: Mutex<Vec<String>>,
    }

    impl MockCaptionHttp {
        fn new() -> Self {
            Self {
                bodies: HashMap::new(),
                requested: Mutex::new(Vec::new()),
            }
        }

        fn serve(mut self, fmt: &'static str, content_type: &str, text: &str) -> Self {
            self.bodies.insert(
                fmt,
                Ok(CaptionBody {
                    text: text.to_string(),
                    content_type: content_type.to_string(),
                }),
            );
            self
        }

        fn fail(mut self, fmt: &'static str) -> Self {
            self.bodies.insert(fmt, Err("connection reset".to_string()));
            self
        }

        fn requested(&self) -> Vec<String> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl CaptionHttp for MockCaptionHttp {
        async fn get(&self, url: &str) -> Result<CaptionBody, ProvokeError> {
            self.requested.lock().unwrap().push(url.to_string());
            let fmt = ["json3", "vtt"]
                .into_iter()
                .find(|f| url.contains(&format!("fmt={f}")))
                .unwrap_or("");
            match self.bodies.get(fmt) {
                Some(Ok(body)) => Ok(body.clone()),
                Some(Err(e)) => Err(ProvokeError::TransportFailure(e.clone())),
                None => Ok(CaptionBody::default()),
            }
        }
    }

    const URL: &str = "https://www.youtube.com/api/timedtext?v=abc&lang=en";

    #[tokio::test]
    async fn blocked_url_is_not_fetched() {
        let http = MockCaptionHttp::new();
        let err = fetch_transcript(&http, "https://evil.example/api/timedtext")
            .await
            .unwrap_err();
        assert!(matches!(err, ProvokeError::BlockedSource { .. }));
        assert!(http.requested().is_empty());
    }

    #[tokio::test]
    async fn json3_wins_when_present() {
        let http = MockCaptionHttp::new().serve(
            "json3",
            "application/json; charset=UTF-8",
            r#"{"events":[{"tStartMs":10,"segs":[{"utf8":"hi"}]}]}"#,
        );
        let lines = fetch_transcript(&http, URL).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(http.requested().len(), 1);
    }

    #[tokio::test]
    async fn non_json_falls_through_to_vtt() {
        let http = MockCaptionHttp::new()
            .serve("json3", "text/html", "<html>consent</html>")
            .serve("vtt", "text/vtt", "WEBVTT\n\n00:01.000 --> 00:02.000\ncue one");
        let lines = fetch_transcript(&http, URL).await.unwrap();
        assert_eq!(lines[0].text, "cue one");
        assert_eq!(lines[0].start_offset_ms, 1_000);
        assert_eq!(http.requested().len(), 2);
    }

    #[tokio::test]
    async fn falls_through_to_markup() {
        let http = MockCaptionHttp::new()
            .serve("json3", "text/xml", "<transcript/>")
            .serve("vtt", "text/vtt", "WEBVTT\n\n")
            .serve("", "text/xml", r#"<transcript><text start="4.2">from xml</text></transcript>"#);
        let lines = fetch_transcript(&http, URL).await.unwrap();
        assert_eq!(lines[0].start_offset_ms, 4_200);
        assert_eq!(lines[0].text, "from xml");
        let requested = http.requested();
        assert_eq!(requested.len(), 3);
        assert!(requested[0].contains("fmt=json3"));
        assert!(requested[1].contains("fmt=vtt"));
        assert!(!requested[2].contains("fmt="));
    }

    #[tokio::test]
    async fn transport_errors_fall_through_until_last() {
        let http = MockCaptionHttp::new()
            .fail("json3")
            .fail("vtt")
            .serve("", "text/xml", r#"<transcript><text start="1">ok</text></transcript>"#);
        let lines = fetch_transcript(&http, URL).await.unwrap();
        assert_eq!(lines.len(), 1);
    }

    #[tokio::test]
    async fn final_transport_error_surfaces() {
        let http = MockCaptionHttp::new().fail("json3").fail("vtt").fail("");
        let err = fetch_transcript(&http, URL).await.unwrap_err();
        assert!(matches!(err, ProvokeError::TransportFailure(_)));
        assert_eq!(http.requested().len(), 3);
    }
}
