use crate::render::{parse_position, print_deck};
use anyhow::Context;
use provoke_deck::{items_from_output, normalize, DeckSession};
use provoke_model::parse_structured_output;
use std::path::Path;

/// Execute `provoke deck <file> --at <position>`
pub fn execute(file: &Path, at: &str, json: bool) -> anyhow::Result<()> {
    let at_ms = parse_position(at)?;
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("read {}", file.display()))?;
    let output = parse_structured_output(&raw)?;
    let deck = normalize(&items_from_output(&output));
    let total = deck.len();

    let mut session = DeckSession::new();
    session.replace_deck(deck, at_ms);
    let revealed: Vec<_> = session.revealed_entries().into_iter().cloned().collect();
    print_deck(&revealed, json)?;
    if !json {
        match session.next_reveal_at() {
            Some(next) => eprintln!(
                "{} of {total} revealed; next at {}",
                revealed.len(),
                provoke_core::timestamp::format_clock(next)
            ),
            None => eprintln!("{} of {total} revealed", revealed.len()),
        }
    }
    Ok(())
}
