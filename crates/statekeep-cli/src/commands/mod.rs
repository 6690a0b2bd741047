pub mod inspect;
pub mod write;

use std::path::Path;

use anyhow::{Context, bail};
use statekeep::{PersistSettings, Persister};
use tracing::debug;

/// Build a persister from a statekeep.toml file.
///
/// The file must name a `[storage] path`; in-memory storage would not
/// outlive the command.
pub fn load_persister(path: &Path) -> anyhow::Result<Persister> {
    if !path.is_file() {
        bail!(
            "config file {} not found; it must set [storage] path",
            path.display()
        );
    }
    let settings = PersistSettings::from_file(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let Some(db) = settings.storage_path() else {
        bail!("{} has no [storage] path; nothing would be persisted", path.display());
    };
    debug!(config = %path.display(), db = %db.display(), "opening storage");
    let config = settings
        .into_config()
        .with_context(|| format!("failed to open storage from {}", path.display()))?;
    Ok(Persister::new(config))
}
