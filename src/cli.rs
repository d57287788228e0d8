//! Command-line surface.
use clap::Parser;
use std::path::PathBuf;

/// caravan - system setup and configuration made easy.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "caravan",
    about = "caravan - system setup and configuration made easy",
    version = option_env!("CARAVAN_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
)]
pub struct Cli {
    /// Handle all install (`run:`) directives
    #[arg(long)]
    pub run: bool,

    /// Handle all link directives
    #[arg(long)]
    pub link: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Preview changes without prompting or applying
    #[arg(short = 'd', long)]
    pub dry_run: bool,

    /// Directory layers and relative destinations are resolved against
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Layers manifest (default: <root>/caravan.layers)
    #[arg(long)]
    pub manifest: Option<PathBuf>,

    /// Where conflicting destinations are backed up (default: ./backups)
    #[arg(long)]
    pub backup_dir: Option<PathBuf>,
}
