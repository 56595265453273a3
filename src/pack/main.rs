//! binshim package builder binary
//!
//! Thin wrapper over `binshim::pack`: parses arguments, runs the build and
//! prints a summary. Exit status is 1 only for usage and setup errors;
//! skipped platforms are reported but do not fail the run.

mod cli;

use std::io::Write;

use anyhow::{Context, Result};
use binshim::config::ShimConfig;
use binshim::pack::{BuildReport, PackageBuilder};
use clap::Parser;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = cli::Cli::parse();
    let Some(version) = cli.version().map(str::to_string) else {
        eprintln!("Usage: binshim-pack <version> [--config PATH] [--out DIR] [--manifest PATH]");
        eprintln!("Example: binshim-pack 1.2.3");
        std::process::exit(1);
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("FATAL: Failed to create Tokio runtime: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = rt.block_on(real_main(&cli, &version)) {
        log::error!("{e:#}");
        std::process::exit(1);
    }
}

async fn real_main(cli: &cli::Cli, version: &str) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to read working directory")?;
    let mut cfg = ShimConfig::discover(cli.config.as_deref(), &cwd)?;
    if let Some(out) = &cli.out {
        cfg.out_dir = out.clone();
    }
    if let Some(manifest) = &cli.manifest {
        cfg.root_manifest = manifest.clone();
    }
    if let Some(cache) = &cli.cache_dir {
        cfg.cache_dir = Some(cache.clone());
    }

    let builder = PackageBuilder::new(cfg)?;
    let report = builder
        .build_all(version)
        .await
        .with_context(|| format!("Failed to build packages for {version}"))?;

    print_summary(&report);
    Ok(())
}

fn print_summary(report: &BuildReport) {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);

    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true));
    let _ = writeln!(stdout, "\nPackages for {}", report.version);
    let _ = stdout.reset();

    for pkg in &report.built {
        let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)));
        let _ = write!(stdout, "  ✓ ");
        let _ = stdout.reset();
        let _ = writeln!(stdout, "{} ({})", pkg.name, pkg.dir.display());
    }
    for skipped in &report.skipped {
        let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)));
        let _ = write!(stdout, "  ⚠ ");
        let _ = stdout.reset();
        let _ = writeln!(stdout, "{} skipped: {}", skipped.target.key(), skipped.reason);
    }

    let _ = writeln!(
        stdout,
        "\nBuilt {} of {} platforms",
        report.built.len(),
        report.built.len() + report.skipped.len()
    );
}
