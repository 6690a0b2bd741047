use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "statekeep",
    about = "Inspect and maintain persisted application state",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Path to the statekeep.toml configuration (must set [storage] path)
    #[arg(short, long, global = true, default_value = "statekeep.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every storage key the configuration addresses
    Keys,
    /// Print the persisted state as it would be restored at startup
    Show,
    /// Persist a JSON state document as a transition would.
    ///
    /// Only the slices named under [keys] are written; with no [keys] the
    /// whole document is stored under the global key.
    Save {
        /// JSON file holding the full state tree
        #[arg(short, long)]
        state: PathBuf,
    },
    /// Remove every addressed key from storage
    Forget,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("statekeep=info".parse()?)
        )
        .init();

    let cli = Cli::parse();
    let persister = commands::load_persister(&cli.config)?;

    match cli.command {
        Commands::Keys => commands::inspect::keys(&persister, &mut std::io::stdout().lock()),
        Commands::Show => commands::inspect::show(&persister, &mut std::io::stdout().lock()),
        Commands::Save { state } => commands::write::save(&persister, &state),
        Commands::Forget => commands::write::forget(&persister),
    }
}
