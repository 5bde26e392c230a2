/// Collapse every whitespace run to a single space and trim the ends.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Trim, then cut to at most `max_chars` characters, ending in `…` when cut.
///
/// Counts characters, not bytes. Clamping an already clamped string is a no-op.
pub fn clamp_text(s: &str, max_chars: usize) -> String {
    let s = s.trim();
    if max_chars == 0 {
        return String::new();
    }
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max_chars - 1).collect();
    out.push('…');
    out
}
