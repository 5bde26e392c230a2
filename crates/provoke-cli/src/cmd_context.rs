use provoke_context::ContextStore;
use provoke_store::FileStore;
use std::sync::Arc;

fn open() -> ContextStore {
    ContextStore::new(Arc::new(FileStore::open_default()))
}

/// Execute `provoke context show <video-id>`
pub fn show(video_id: &str) -> anyhow::Result<()> {
    match open().load(video_id)? {
        Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
        None => println!("No context stored for {video_id}."),
    }
    Ok(())
}

/// Execute `provoke context list`
pub fn list() -> anyhow::Result<()> {
    let records = open().list()?;
    if records.is_empty() {
        println!("No context records.");
        return Ok(());
    }
    for r in &records {
        let deck = r.deck.as_ref().map_or(0, Vec::len);
        let source = r.deck_source.map_or("-", |s| s.as_str());
        println!(
            "{}  obs={:<3} deck={:<3} ({source})  {}",
            r.video_id,
            r.observations.len(),
            deck,
            if r.title.is_empty() { &r.url } else { &r.title }
        );
    }
    Ok(())
}

/// Execute `provoke context prune [--keep N]`
pub fn prune(keep: usize) -> anyhow::Result<()> {
    let removed = open().prune(keep.max(1))?;
    println!("Removed {removed} record(s).");
    Ok(())
}
