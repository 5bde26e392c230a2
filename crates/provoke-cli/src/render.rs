use provoke_core::timestamp::{format_clock, parse_clock_ms};
use provoke_core::Provocation;

/// Playback position from a clock string (`1:30`) or plain milliseconds.
pub fn parse_position(s: &str) -> anyhow::Result<u64> {
    let s = s.trim();
    if let Ok(ms) = s.parse::<u64>() {
        return Ok(ms);
    }
    parse_clock_ms(s).ok_or_else(|| anyhow::anyhow!("invalid position: {s:?} (use 1:30 or milliseconds)"))
}

pub fn print_deck(deck: &[Provocation], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(deck)?);
        return Ok(());
    }
    if deck.is_empty() {
        println!("(no provocations)");
        return Ok(());
    }
    for p in deck {
        print!("{}", format_entry(p));
    }
    Ok(())
}

pub fn format_entry(p: &Provocation) -> String {
    let mut out = format!(
        "[{}] {}: {}\n    {}\n",
        format_clock(p.start_offset_ms),
        p.kind,
        p.title,
        p.body
    );
    if !p.excerpt.is_empty() {
        out.push_str(&format!("    > {}\n", p.excerpt));
    }
    out
}
