//! binshim setup binary

mod cli;

use anyhow::{Context, Result};
use binshim::config::ShimConfig;
use binshim::launch::resolve::package_root;
use binshim::setup::{self, ToolConfig};
use clap::{CommandFactory, Parser};

fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    if let Err(e) = real_main() {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn real_main() -> Result<()> {
    let args = cli::Args::parse();

    // Package name decides the config directory; defaults are fine outside a package
    let shim = match package_root() {
        Ok(root) => ShimConfig::discover(None, &root)?,
        Err(_) => ShimConfig::default(),
    };

    match args.sub {
        Some(cli::Cmd::Quick {
            provider,
            endpoint,
            deployment,
        }) => {
            let cfg = ToolConfig::quick(provider, &endpoint, deployment.as_deref())?;
            let path = setup::config_path(&shim)?;
            cfg.save(&path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Saved {} configuration to {}", provider.as_str(), path.display());
        }
        Some(cli::Cmd::Show) => {
            let path = setup::config_path(&shim)?;
            match ToolConfig::load(&path)? {
                Some(cfg) => {
                    println!("# {}", path.display());
                    println!("{}", serde_json::to_string_pretty(&cfg)?);
                }
                None => println!("No configuration at {}; run `binshim-setup quick`", path.display()),
            }
        }
        Some(cli::Cmd::Env) => {
            let path = setup::config_path(&shim)?;
            let cfg = ToolConfig::load(&path)?
                .with_context(|| format!("No configuration at {}", path.display()))?;
            for line in cfg.env_lines(&shim.binary) {
                println!("{line}");
            }
        }
        Some(cli::Cmd::Help) => cli::Args::command().print_help()?,
        None => {
            cli::Args::command().print_help()?;
            println!("\nInteractive setup is not available; use `quick`.");
        }
    }
    Ok(())
}
