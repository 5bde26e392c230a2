use provoke_core::Provocation;
use std::collections::HashSet;

/// Reveal state for one deck instance.
///
/// Entries are revealed in deck order as playback reaches them. The scan
/// index only moves forward and the revealed set only grows, so seeking
/// backward never hides anything already shown. Only [`replace_deck`]
/// starts over.
///
/// [`replace_deck`]: DeckSession::replace_deck
#[derive(Debug, Clone, Default)]
pub struct DeckSession {
    entries: Vec<Provocation>,
    revealed: HashSet<String>,
    next_scan_index: usize,
}

impl DeckSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap in a new deck, resetting reveal state, then reveal everything due
    /// at `current_ms`. Returns how many entries were revealed.
    ///
    /// `deck` is expected to be normalized (sorted by start offset).
    pub fn replace_deck(&mut self, deck: Vec<Provocation>, current_ms: u64) -> usize {
        self.entries = deck;
        self.revealed.clear();
        self.next_scan_index = 0;
        self.reveal_up_to(current_ms).len()
    }

    /// Reveal entries whose start offset is at or before `current_ms`.
    /// Returns the newly revealed entries in deck order.
    pub fn reveal_up_to(&mut self, current_ms: u64) -> Vec<Provocation> {
        let mut newly = Vec::new();
        while let Some(entry) = self.entries.get(self.next_scan_index) {
            if entry.start_offset_ms > current_ms {
                break;
            }
            if self.revealed.insert(entry.id.clone()) {
                newly.push(entry.clone());
            }
            self.next_scan_index += 1;
        }
        newly
    }

    pub fn entries(&self) -> &[Provocation] {
        &self.entries
    }

    /// Entries revealed so far, in deck order.
    pub fn revealed_entries(&self) -> Vec<&Provocation> {
        let mut seen = HashSet::new();
        self.entries[..self.next_scan_index]
            .iter()
            .filter(|p| self.revealed.contains(&p.id) && seen.insert(p.id.as_str()))
            .collect()
    }

    pub fn is_revealed(&self, id: &str) -> bool {
        self.revealed.contains(id)
    }

    pub fn revealed_count(&self) -> usize {
        self.revealed.len()
    }

    pub fn next_scan_index(&self) -> usize {
        self.next_scan_index
    }

    /// Start offset of the next entry still waiting to be revealed.
    pub fn next_reveal_at(&self) -> Option<u64> {
        self.entries
            .get(self.next_scan_index)
            .map(|p| p.start_offset_ms)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
