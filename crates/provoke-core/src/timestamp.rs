//! Millisecond timestamp parsing and formatting.
//!
//! Clock strings are `H:MM:SS` or `MM:SS`, optionally with a fractional
//! seconds part (`1:02.5`, `00:01:02.345`). Anything else parses to `None`.

/// Parse a colon-delimited clock string into milliseconds.
pub fn parse_clock_ms(s: &str) -> Option<u64> {
    let s = s.trim();
    let parts: Vec<&str> = s.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [m, sec] => (0, parse_digits(m)?, *sec),
        [h, m, sec] => {
            let minutes = parse_digits(m)?;
            if minutes >= 60 {
                return None;
            }
            (parse_digits(h)?, minutes, *sec)
        }
        _ => return None,
    };
    let (whole, frac) = match seconds.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (seconds, None),
    };
    let secs = parse_digits(whole)?;
    if secs >= 60 {
        return None;
    }
    let millis = match frac {
        Some(f) => fraction_to_millis(f)?,
        None => 0,
    };
    hours
        .checked_mul(60)?
        .checked_add(minutes)?
        .checked_mul(60)?
        .checked_add(secs)?
        .checked_mul(1000)?
        .checked_add(millis)
}

/// Format milliseconds as `M:SS`, or `H:MM:SS` from one hour up.
pub fn format_clock(ms: u64) -> String {
    let total = ms / 1000;
    let h = total / 3600;
    let m = (total % 3600) / 60;
    let s = total % 60;
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}

/// Milliseconds from a fractional-seconds digit string: `"5"` → 500, `"345"` → 345,
/// `"3456"` → 345 (truncated).
pub fn fraction_to_millis(frac: &str) -> Option<u64> {
    if frac.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let padded: String = frac.chars().chain("000".chars()).take(3).collect();
    padded.parse().ok()
}

fn parse_digits(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
