//! Command-line arguments for `binshim-pack`

use std::path::PathBuf;

use clap::Parser;

/// Build per-platform npm packages from a binary release
#[derive(Parser, Debug, Clone)]
#[command(name = "binshim-pack")]
#[command(version, about = "Build per-platform npm packages from a binary release")]
pub struct Cli {
    /// Release version to package, e.g. 1.2.3
    #[arg(id = "release_version", value_name = "VERSION")]
    pub version: Option<String>,

    /// Path to configuration file (default: ./binshim.toml)
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Output directory for the platform packages
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Root package.json to rewrite
    #[arg(long)]
    pub manifest: Option<PathBuf>,

    /// Archive cache directory
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,
}

impl Cli {
    /// Version argument, if present and non-blank
    pub fn version(&self) -> Option<&str> {
        self.version
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }
}
