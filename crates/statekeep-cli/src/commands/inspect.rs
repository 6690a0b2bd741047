use std::io::Write;

use statekeep::Persister;

pub fn keys(persister: &Persister, out: &mut impl Write) -> anyhow::Result<()> {
    for key in persister.storage_keys() {
        writeln!(out, "{key}")?;
    }
    Ok(())
}

pub fn show(persister: &Persister, out: &mut impl Write) -> anyhow::Result<()> {
    match persister.load()? {
        Some(state) => writeln!(out, "{}", serde_json::to_string_pretty(&state)?)?,
        None => eprintln!("no persisted state"),
    }
    Ok(())
}
