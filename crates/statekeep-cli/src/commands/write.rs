use std::path::Path;

use anyhow::Context;
use serde_json::Value;
use statekeep::Persister;
use tracing::info;

pub fn save(persister: &Persister, state_path: &Path) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(state_path)
        .with_context(|| format!("failed to read {}", state_path.display()))?;
    let state: Value = serde_json::from_str(&content)?;
    let written = persister.save(&state)?;
    info!(written, "state persisted");
    println!("✓ Wrote {written} key(s)");
    Ok(())
}

pub fn forget(persister: &Persister) -> anyhow::Result<()> {
    let removed = persister.forget()?;
    println!("✓ Removed {removed} key(s)");
    Ok(())
}
