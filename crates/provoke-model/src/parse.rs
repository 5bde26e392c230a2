//! Recover one JSON object from noisy model text.

use crate::client::GenerationClient;
use crate::request::{GenerateRequest, GenerationConfig};
use provoke_core::ProvokeError;
use serde_json::Value;
use tracing::warn;

/// Extract and parse the JSON object embedded in `raw`.
///
/// Handles a surrounding code fence, leading or trailing prose, and literal
/// newlines inside string values. Fails with `MalformedOutput` when no object
/// can be recovered.
pub fn parse_structured_output(raw: &str) -> Result<Value, ProvokeError> {
    let cleaned = strip_fence(raw);
    let trimmed = raw.trim();

    // A fence marker may sit inside a string value of an unfenced object.
    recover(cleaned)
        .or_else(|| (cleaned != trimmed).then(|| recover(trimmed)).flatten())
        .ok_or_else(|| ProvokeError::MalformedOutput {
            raw: raw.to_string(),
        })
}

fn recover(s: &str) -> Option<Value> {
    first_object_span(s)
        .and_then(parse_object)
        .or_else(|| widest_object_span(s).and_then(parse_object))
}

/// Parse `raw`; on failure send one repair request through `client` and parse its answer.
pub async fn parse_with_repair(
    client: &dyn GenerationClient,
    model: &str,
    raw: &str,
) -> Result<Value, ProvokeError> {
    if let Ok(value) = parse_structured_output(raw) {
        return Ok(value);
    }
    warn!(raw = %raw, "model returned non-JSON output, requesting repair");

    let request = GenerateRequest::prompt(repair_prompt(raw), GenerationConfig::json());
    let repaired = client.generate(model, &request).await?.text();
    parse_structured_output(&repaired).map_err(|err| {
        warn!(raw = %repaired, "repair response was not JSON either");
        err
    })
}

pub fn repair_prompt(raw: &str) -> String {
    format!(
        r#"You will be given a model response that was SUPPOSED to be valid JSON but is malformed or truncated.

Task:
- Output ONLY valid JSON (no markdown fences) matching exactly this schema:
  {{ "provocations": [ {{ "type": string, "title": string, "prompt": string, "excerpt": string, "tStartMs": number }} ] }}
- Fix invalid JSON string issues (especially literal newlines inside strings) by escaping or removing them.
- If the input is truncated and you cannot recover, return: {{ "provocations": [] }}

Malformed input:
{raw}"#
    )
}

fn parse_object(span: &str) -> Option<Value> {
    serde_json::from_str::<Value>(&escape_raw_newlines(span))
        .ok()
        .filter(Value::is_object)
}

/// Inner content of the first fenced block, or the trimmed input when there is none.
fn strip_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(open) = trimmed.find("```") else {
        return trimmed;
    };
    let after = &trimmed[open + 3..];
    // Skip the info string (`json`, `JSON`, ...) up to the end of the fence line.
    let body = match after.find('\n') {
        Some(nl) if after[..nl].trim().chars().all(|c| c.is_ascii_alphanumeric()) => &after[nl + 1..],
        _ => after,
    };
    match body.find("```") {
        Some(close) => body[..close].trim(),
        None => body.trim(),
    }
}

/// From the first `{` to the brace that closes it, skipping braces inside strings.
fn first_object_span(s: &str) -> Option<&str> {
    let start = s.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in s[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

fn widest_object_span(s: &str) -> Option<&str> {
    let start = s.find('{')?;
    let end = s.rfind('}')?;
    (end > start).then(|| &s[start..=end])
}

/// Escape literal CR/LF that appear inside string literals. Text outside strings is untouched.
fn escape_raw_newlines(span: &str) -> String {
    let mut out = String::with_capacity(span.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut chars = span.chars().peekable();
    while let Some(c) = chars.next() {
        if !in_string {
            if c == '"' {
                in_string = true;
            }
            out.push(c);
            continue;
        }
        if escaped {
            escaped = false;
            out.push(c);
            continue;
        }
        match c {
            '\\' => {
                escaped = true;
                out.push(c);
            }
            '"' => {
                in_string = false;
                out.push(c);
            }
            '\r' => {
                if chars.peek() != Some(&'\n') {
                    out.push_str("\\n");
                }
            }
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockClient;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn bare_object() {
        assert_eq!(parse_structured_output(r#"{"a": 1}"#).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn fenced_object_with_prose_matches_bare() {
        let bare = r#"{"provocations": [{"title": "t", "tStartMs": 5}]}"#;
        let noisy = format!("Sure! Here you go:\n```json\n{bare}\n```\nLet me know if you need more.");
        assert_eq!(
            parse_structured_output(&noisy).unwrap(),
            parse_structured_output(bare).unwrap()
        );
    }

    #[test]
    fn trailing_prose_and_braces_in_strings() {
        let raw = r#"{"a": "curly } inside \" quote {"} and then {"b": 2}"#;
        assert_eq!(
            parse_structured_output(raw).unwrap(),
            json!({"a": "curly } inside \" quote {"})
        );
    }

    #[test]
    fn raw_newlines_inside_strings_are_repaired() {
        let raw = "{\"prompt\": \"line one\nline two\r\nline three\",\n \"n\": 1}";
        let value = parse_structured_output(raw).unwrap();
        assert_eq!(value["prompt"], "line one\nline two\nline three");
        assert_eq!(value["n"], 1);
    }

    #[test]
    fn nested_objects_and_stray_closing_brace() {
        let raw = r#"{"a": {"b": 1}, "c": [1, 2]} trailing"#;
        assert_eq!(parse_structured_output(raw).unwrap()["c"], json!([1, 2]));
        let unbalanced = r#"{"a": "x"}}"#;
        assert_eq!(parse_structured_output(unbalanced).unwrap(), json!({"a": "x"}));
    }

    #[test]
    fn backticks_inside_string_values() {
        let raw = r#"{"provocations": [{"title": "t", "prompt": "Is ```rm -rf``` ever fine?", "tStartMs": 0}]}"#;
        let value = parse_structured_output(raw).unwrap();
        assert_eq!(value["provocations"][0]["prompt"], "Is ```rm -rf``` ever fine?");

        let prose = format!("Here: {raw} done.");
        assert_eq!(parse_structured_output(&prose).unwrap(), value);
    }

    #[test]
    fn unterminated_fence_still_parses() {
        assert_eq!(parse_structured_output("```\n{\"a\": 1}").unwrap(), json!({"a": 1}));
    }

    #[test]
    fn no_object_is_malformed() {
        for raw in ["", "I cannot help with that.", "[1, 2, 3]", "{\"a\": "] {
            let err = parse_structured_output(raw).unwrap_err();
            assert!(matches!(err, ProvokeError::MalformedOutput { .. }), "{raw:?}");
        }
    }

    #[tokio::test]
    async fn repair_round_trip() {
        let client = MockClient::new();
        client.push_text(r#"{"provocations": []}"#);
        let value = parse_with_repair(&client, "m", "{\"provocations\": [ {\"title\": ")
            .await
            .unwrap();
        assert_eq!(value, json!({"provocations": []}));
        let requests = client.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].1.prompt_text().contains("Malformed input:"));
    }

    #[tokio::test]
    async fn repair_not_needed_for_valid_output() {
        let client = MockClient::new();
        parse_with_repair(&client, "m", "{}").await.unwrap();
        assert!(client.requests().is_empty());
    }

    #[tokio::test]
    async fn failed_repair_is_malformed() {
        let client = MockClient::new();
        client.push_text("still not json");
        let err = parse_with_repair(&client, "m", "nope").await.unwrap_err();
        assert!(matches!(err, ProvokeError::MalformedOutput { .. }));
    }
}
