use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "ontoci",
    about = "CI validator and versioning engine for ontology repositories",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Validate the repository and report required version bumps.
    ///
    /// Exits non-zero when any error-severity finding exists; warnings
    /// alone pass.
    Validate {
        /// Repository root.
        #[arg(long, default_value = ".")]
        root: PathBuf,
        /// Base revision for change detection (e.g. `origin/main`).
        #[arg(long)]
        base: Option<String>,
        /// Append a one-line JSON summary of the run to this file.
        #[arg(long)]
        summary: Option<PathBuf>,
        /// Pretty-print the JSON output.
        #[arg(long)]
        pretty: bool,
    },
    /// Write computed versions into entity files and `VERSION`, emit
    /// versioned artifacts, and consume `VERSION_OVERRIDES.json`.
    ApplyVersions {
        /// Repository root.
        #[arg(long, default_value = ".")]
        root: PathBuf,
        /// Base revision the merge is landing on.
        #[arg(long)]
        base: String,
        /// Pretty-print the JSON output.
        #[arg(long)]
        pretty: bool,
    },
}
