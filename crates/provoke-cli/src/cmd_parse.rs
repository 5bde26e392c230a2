use anyhow::Context;
use provoke_model::parse_structured_output;
use std::path::Path;

/// Execute `provoke parse <file>`
pub fn execute(file: &Path) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("read {}", file.display()))?;
    let value = parse_structured_output(&raw)?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
