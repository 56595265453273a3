use clap::{Parser, Subcommand};

use binshim::setup::ProviderKind;

#[derive(Parser, Debug)]
#[command(name = "binshim-setup")]
#[command(version, about = "Configure the provider used by the wrapped tool")]
#[command(disable_help_subcommand = true)]
pub struct Args {
    /// Sub‑commands (interactive mode when omitted)
    #[command(subcommand)]
    pub sub: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Write a configuration without prompting
    Quick {
        /// Provider type
        #[arg(value_enum)]
        provider: ProviderKind,

        /// Provider endpoint URL
        endpoint: String,

        /// Deployment name (required for azure)
        deployment: Option<String>,
    },
    /// Print the stored configuration
    Show,
    /// Print shell `export` lines for the stored configuration
    Env,
    /// Print usage
    Help,
}
