use provoke_core::timestamp::format_clock;
use provoke_core::{CaptionTrack, TranscriptLine};
use serde_json::Value;

/// Prefer an English, human-authored track; then any English track; then the first.
pub fn pick_caption_track(tracks: &[CaptionTrack]) -> Option<&CaptionTrack> {
    let english = |t: &&CaptionTrack| t.language_code.starts_with("en");
    tracks
        .iter()
        .filter(english)
        .find(|t| t.kind.as_deref().map_or(true, str::is_empty))
        .or_else(|| tracks.iter().find(english))
        .or_else(|| tracks.first())
}

/// Extract caption tracks from a player-response JSON document.
pub fn tracks_from_player_response(player: &Value) -> Vec<CaptionTrack> {
    let captions = player.get("captions");
    let list = captions
        .and_then(|c| c.get("playerCaptionsTracklistRenderer"))
        .or_else(|| captions.and_then(|c| c.get("playerCaptionsRenderer")))
        .and_then(|r| r.get("captionTracks"))
        .and_then(|t| t.as_array());
    let Some(list) = list else {
        return Vec::new();
    };

    list.iter()
        .filter_map(|t| {
            let locator_url = t.get("baseUrl")?.as_str()?.to_string();
            if locator_url.is_empty() {
                return None;
            }
            let language_code = t
                .get("languageCode")
                .and_then(|l| l.as_str())
                .unwrap_or_default()
                .to_string();
            let display_name = display_name(t.get("name")).unwrap_or_else(|| language_code.clone());
            let kind = t
                .get("kind")
                .and_then(|k| k.as_str())
                .map(str::to_string);
            Some(CaptionTrack {
                locator_url,
                language_code,
                display_name,
                kind,
            })
        })
        .collect()
}

fn display_name(name: Option<&Value>) -> Option<String> {
    let name = name?;
    if let Some(simple) = name.get("simpleText").and_then(|s| s.as_str()) {
        return Some(simple.to_string());
    }
    let runs = name.get("runs")?.as_array()?;
    let joined: String = runs
        .iter()
        .filter_map(|r| r.get("text").and_then(|t| t.as_str()))
        .collect();
    Some(joined)
}

/// Render `[m:ss] text` rows, stopping before the row that would exceed `max_chars`.
pub fn build_transcript_text(lines: &[TranscriptLine], max_chars: usize) -> String {
    let mut out = String::new();
    let mut used = 0;
    for line in lines {
        let row = format!("[{}] {}\n", format_clock(line.start_offset_ms), line.text);
        let len = row.chars().count();
        if used + len > max_chars {
            break;
        }
        used += len;
        out.push_str(&row);
    }
    out.trim().to_string()
}
