use provoke_store::{load_settings, FileStore};
use std::path::Path;

/// Execute `provoke settings`
pub fn execute(dev_settings: Option<&Path>) -> anyhow::Result<()> {
    let store = FileStore::open_default();
    let settings = load_settings(&store, dev_settings);
    println!("{}", serde_json::to_string_pretty(&settings.redacted())?);
    println!("store: {}", store.root().display());
    Ok(())
}
