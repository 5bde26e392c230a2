//! Caption format parsers. Each returns lines sorted by start offset, with
//! whitespace runs collapsed and empty lines dropped.

use provoke_core::text::collapse_whitespace;
use provoke_core::timestamp::fraction_to_millis;
use provoke_core::TranscriptLine;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use std::sync::OnceLock;

/// Parse the structured-events format: `{"events":[{"tStartMs":..,"segs":[{"utf8":..}]}]}`.
pub fn parse_json3(text: &str) -> Result<Vec<TranscriptLine>, serde_json::Error> {
    let data: Value = serde_json::from_str(text)?;
    let mut lines = Vec::new();
    let Some(events) = data.get("events").and_then(|e| e.as_array()) else {
        return Ok(lines);
    };
    for event in events {
        let Some(segs) = event.get("segs").and_then(|s| s.as_array()) else {
            continue;
        };
        let start = event
            .get("tStartMs")
            .and_then(|t| t.as_f64())
            .map(|t| t.max(0.0) as u64)
            .unwrap_or(0);
        let joined: String = segs
            .iter()
            .filter_map(|s| s.get("utf8").and_then(|u| u.as_str()))
            .collect();
        push_line(&mut lines, start, &joined);
    }
    Ok(sorted(lines))
}

fn cue_start_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:(\d+):)?(\d+):(\d+)\.(\d+)").expect("valid cue regex"))
}

fn inline_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("valid tag regex"))
}

/// Parse cue-text subtitles (WebVTT): blank-line separated blocks with a
/// `start --> end` row followed by text rows. Accepts `H:MM:SS.mmm` and `MM:SS.mmm`.
pub fn parse_vtt(text: &str) -> Vec<TranscriptLine> {
    let normalized = text.replace('\r', "");
    let mut lines = Vec::new();
    for block in normalized.split("\n\n") {
        let rows: Vec<&str> = block
            .split('\n')
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .collect();
        let Some(time_idx) = rows.iter().position(|r| r.contains("-->")) else {
            continue;
        };
        let start_raw = rows[time_idx].split("-->").next().unwrap_or("").trim();
        let Some(start) = cue_start_ms(start_raw) else {
            continue;
        };
        let cue = rows[time_idx + 1..].join(" ");
        let cue = inline_tag_re().replace_all(&cue, "");
        push_line(&mut lines, start, &cue);
    }
    sorted(lines)
}

fn cue_start_ms(raw: &str) -> Option<u64> {
    let caps = cue_start_re().captures(raw)?;
    let num = |i: usize| -> Option<u64> {
        caps.get(i)
            .map(|m| m.as_str().parse::<u64>().ok())
            .unwrap_or(Some(0))
    };
    let h = num(1)?;
    let m = num(2)?;
    let s = num(3)?;
    let ms = fraction_to_millis(caps.get(4)?.as_str())?;
    Some(((h * 60 + m) * 60 + s) * 1000 + ms)
}

/// Parse the default timedtext markup: `<text start="1.5" dur="2">..</text>` elements
/// (start in seconds, possibly fractional). Falls back to `<p t="1500">` elements
/// (start in milliseconds) when no `text` elements are present.
pub fn parse_markup(text: &str) -> Vec<TranscriptLine> {
    let document = Html::parse_document(text);
    let mut lines = Vec::new();

    if let Ok(selector) = Selector::parse("text") {
        for node in document.select(&selector) {
            let start = node
                .value()
                .attr("start")
                .and_then(|s| s.trim().parse::<f64>().ok())
                .filter(|s| s.is_finite())
                .map(|s| (s.max(0.0) * 1000.0).floor() as u64)
                .unwrap_or(0);
            let content: String = node.text().collect();
            push_line(&mut lines, start, &content);
        }
    }

    if lines.is_empty() {
        if let Ok(selector) = Selector::parse("p[t]") {
            for node in document.select(&selector) {
                let start = node
                    .value()
                    .attr("t")
                    .and_then(|t| t.trim().parse::<u64>().ok())
                    .unwrap_or(0);
                let content: String = node.text().collect();
                push_line(&mut lines, start, &content);
            }
        }
    }

    sorted(lines)
}

fn push_line(lines: &mut Vec<TranscriptLine>, start_offset_ms: u64, raw: &str) {
    let text = collapse_whitespace(raw);
    if !text.is_empty() {
        lines.push(TranscriptLine {
            start_offset_ms,
            text,
        });
    }
}

fn sorted(mut lines: Vec<TranscriptLine>) -> Vec<TranscriptLine> {
    lines.sort_by_key(|l| l.start_offset_ms);
    lines
}
