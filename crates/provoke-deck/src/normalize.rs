//! Turn loosely shaped model items into an ordered, deduplicated deck.

use provoke_core::hash::provocation_id;
use provoke_core::text::{clamp_text, collapse_whitespace};
use provoke_core::timestamp::parse_clock_ms;
use provoke_core::{
    Provocation, BODY_MAX_CHARS, EXCERPT_MAX_CHARS, KIND_MAX_CHARS, TITLE_MAX_CHARS,
};
use serde_json::{Map, Value};
use std::collections::HashSet;

const DEFAULT_KIND: &str = "Provocation";
/// Offsets past 100 hours are clamped; no video runs that long.
pub const MAX_START_OFFSET_MS: u64 = 100 * 3_600_000;

// Accepted field spellings, first match wins. The canonical name comes first
// so an already-normalized deck round-trips unchanged.
const ID_KEYS: &[&str] = &["id"];
const KIND_KEYS: &[&str] = &["kind", "type", "category"];
const TITLE_KEYS: &[&str] = &["title", "headline"];
const BODY_KEYS: &[&str] = &["body", "prompt", "text", "question"];
const EXCERPT_KEYS: &[&str] = &["excerpt", "quote"];
const START_KEYS: &[&str] = &[
    "startOffsetMs",
    "start_offset_ms",
    "tStartMs",
    "t_start_ms",
    "timestamp",
    "time",
];

/// The item array of a parsed model response: a bare array, or the
/// `provocations` / `items` / `deck` member of an object.
pub fn items_from_output(output: &Value) -> Vec<Value> {
    match output {
        Value::Array(items) => items.clone(),
        Value::Object(map) => ["provocations", "items", "deck"]
            .iter()
            .find_map(|k| map.get(*k).and_then(Value::as_array))
            .cloned()
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Normalize raw items into a deck sorted by start offset.
///
/// Text fields are clamped, timestamps coerced to milliseconds (default 0),
/// missing ids derived from `(offset, kind, title)`, items without a body
/// dropped, and duplicate ids collapsed to the first occurrence. Normalizing
/// a normalized deck returns it unchanged.
pub fn normalize(raw_items: &[Value]) -> Vec<Provocation> {
    let mut seen = HashSet::new();
    let mut deck: Vec<Provocation> = raw_items
        .iter()
        .filter_map(Value::as_object)
        .filter_map(normalize_item)
        .filter(|p| seen.insert(p.id.clone()))
        .collect();
    deck.sort_by_key(|p| p.start_offset_ms);
    deck
}

/// Normalize an existing deck (e.g. one loaded from storage).
pub fn normalize_deck(deck: &[Provocation]) -> Vec<Provocation> {
    let values: Vec<Value> = deck
        .iter()
        .filter_map(|p| serde_json::to_value(p).ok())
        .collect();
    normalize(&values)
}

fn normalize_item(item: &Map<String, Value>) -> Option<Provocation> {
    let body = clamp_text(&text_field(item, BODY_KEYS), BODY_MAX_CHARS);
    if body.is_empty() {
        return None;
    }
    let mut kind = clamp_text(&collapse_whitespace(&text_field(item, KIND_KEYS)), KIND_MAX_CHARS);
    if kind.is_empty() {
        kind = DEFAULT_KIND.to_string();
    }
    let title = clamp_text(&collapse_whitespace(&text_field(item, TITLE_KEYS)), TITLE_MAX_CHARS);
    let excerpt = clamp_text(&text_field(item, EXCERPT_KEYS), EXCERPT_MAX_CHARS);
    let start_offset_ms = field(item, START_KEYS)
        .and_then(coerce_ms)
        .unwrap_or(0)
        .min(MAX_START_OFFSET_MS);

    let id = text_field(item, ID_KEYS);
    let id = if id.trim().is_empty() {
        provocation_id(start_offset_ms, &kind, &title)
    } else {
        id.trim().to_string()
    };

    Some(Provocation {
        id,
        kind,
        title,
        body,
        excerpt,
        start_offset_ms,
    })
}

fn field<'a>(item: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| item.get(*k))
        .find(|v| !v.is_null())
}

fn text_field(item: &Map<String, Value>, keys: &[&str]) -> String {
    match field(item, keys) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// Milliseconds from a number or a string holding digits or a clock value.
fn coerce_ms(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.max(0.0) as u64)),
        Value::String(s) => {
            let s = s.trim();
            if s.contains(':') {
                parse_clock_ms(s)
            } else {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f.max(0.0) as u64)
            }
        }
        _ => None,
    }
}
