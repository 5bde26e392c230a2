/// What the display layer receives while a streamed answer arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Text not yet shown.
    Delta(String),
    Done,
}

/// Turns stream frames into incremental deltas.
///
/// A frame may carry the full text so far or only the newest piece. A frame
/// that extends the accumulated text is treated as full text; one equal to it
/// is a repeat; anything else is appended as a delta. This is a heuristic: a
/// delta that happens to begin with everything accumulated so far is
/// indistinguishable from a full-text frame.
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    text: String,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one frame's text; returns the part not yet emitted, if any.
    pub fn push(&mut self, frame: &str) -> Option<String> {
        if frame.is_empty() {
            return None;
        }
        if !self.text.is_empty() && frame.starts_with(self.text.as_str()) {
            let delta = frame[self.text.len()..].to_string();
            self.text = frame.to_string();
            return (!delta.is_empty()).then_some(delta);
        }
        self.text.push_str(frame);
        Some(frame.to_string())
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

/// Incremental reader of server-sent-event lines from raw byte chunks.
#[derive(Debug, Default)]
pub(crate) struct SseLines {
    buf: Vec<u8>,
}

impl SseLines {
    /// Append a chunk and return the `data:` payloads of every completed line.
    pub(crate) fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut out = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            if let Some(data) = sse_data(&String::from_utf8_lossy(&line)) {
                out.push(data);
            }
        }
        out
    }

    /// Payload of a trailing line with no newline, if the stream ended mid-line.
    pub(crate) fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buf);
        sse_data(&String::from_utf8_lossy(&rest))
    }
}

fn sse_data(line: &str) -> Option<String> {
    let line = line.trim_end_matches(['\r', '\n']);
    let data = line.strip_prefix("data:")?.trim_start();
    if data.is_empty() || data == "[DONE]" {
        return None;
    }
    Some(data.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_text_frames_emit_suffixes() {
        let mut acc = StreamAccumulator::new();
        assert_eq!(acc.push("Hel").as_deref(), Some("Hel"));
        assert_eq!(acc.push("Hello").as_deref(), Some("lo"));
        assert_eq!(acc.push("Hello, world").as_deref(), Some(", world"));
        assert_eq!(acc.text(), "Hello, world");
    }

    #[test]
    fn delta_frames_are_appended() {
        let mut acc = StreamAccumulator::new();
        acc.push("The ");
        assert_eq!(acc.push("answer").as_deref(), Some("answer"));
        assert_eq!(acc.push(" is 42").as_deref(), Some(" is 42"));
        assert_eq!(acc.into_text(), "The answer is 42");
    }

    #[test]
    fn repeated_and_empty_frames_emit_nothing() {
        let mut acc = StreamAccumulator::new();
        acc.push("abc");
        assert_eq!(acc.push("abc"), None);
        assert_eq!(acc.push(""), None);
        assert_eq!(acc.text(), "abc");
    }

    #[test]
    fn short_delta_that_prefixes_text_is_kept() {
        let mut acc = StreamAccumulator::new();
        acc.push("I think so. ");
        assert_eq!(acc.push("I").as_deref(), Some("I"));
        assert_eq!(acc.push(" agree.").as_deref(), Some(" agree."));
        assert_eq!(acc.text(), "I think so. I agree.");
    }

    #[test]
    fn sse_lines_split_across_chunks() {
        let mut lines = SseLines::default();
        assert!(lines.feed(b"data: {\"a\"").is_empty());
        let got = lines.feed(b":1}\r\n\r\n: keepalive\ndata: [DONE]\ndata: x");
        assert_eq!(got, vec!["{\"a\":1}".to_string()]);
        assert_eq!(lines.finish().as_deref(), Some("x"));
    }

    #[test]
    fn sse_lines_keep_multibyte_chars_intact() {
        let mut lines = SseLines::default();
        let bytes = "data: caf\u{e9}\n".as_bytes();
        let (a, b) = bytes.split_at(bytes.len() - 2);
        assert!(lines.feed(a).is_empty());
        assert_eq!(lines.feed(b), vec!["caf\u{e9}".to_string()]);
    }
}
