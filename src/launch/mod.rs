//! Binary launcher
//!
//! Resolves the platform binary installed next to the root package and runs
//! it as a transparent stand-in: arguments and stdio pass straight through,
//! the exit status is mirrored, and death-by-signal is re-delivered to the
//! launcher itself so shells see the same termination.

pub mod resolve;
#[cfg(unix)]
pub mod signals;

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use log::debug;

use crate::config::ShimConfig;
use crate::error::{Result, ShimError};
use crate::platform::PlatformTarget;
use resolve::{Resolved, Resolver};

/// How the child process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildOutcome {
    Exited(i32),
    Signaled(i32),
}

impl ChildOutcome {
    pub fn from_status(status: ExitStatus) -> Self {
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(sig) = status.signal() {
                return ChildOutcome::Signaled(sig);
            }
        }
        // An exit status without a code is treated as generic failure
        ChildOutcome::Exited(status.code().unwrap_or(1))
    }
}

/// Locate the binary for the running platform.
pub fn resolve_binary() -> Result<Resolved> {
    let root = resolve::package_root()?;
    resolve_binary_for(std::env::consts::OS, std::env::consts::ARCH, root)
}

/// Locate the binary for an `os`/`arch` pair (Rust names) under `root`.
pub fn resolve_binary_for(os: &str, arch: &str, root: PathBuf) -> Result<Resolved> {
    let cfg = ShimConfig::discover(None, &root)?;
    let Ok(target) = PlatformTarget::from_rust_consts(os, arch) else {
        return Err(ShimError::Resolution(resolve::unsupported_message(&cfg, os, arch)));
    };
    debug!("package root {} for {}", root.display(), target.key());
    Resolver::new(cfg, target, root).resolve()
}

/// Spawn `binary` with inherited stdio, relay signals, and wait for it.
pub fn exec(binary: &Path, args: &[OsString]) -> Result<ChildOutcome> {
    #[cfg(unix)]
    {
        if let Err(e) = signals::install() {
            log::error!("signals will not be forwarded: {e}");
        }
    }

    let mut child = Command::new(binary)
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|source| ShimError::Spawn {
            path: binary.to_path_buf(),
            source,
        })?;

    #[cfg(unix)]
    signals::set_child(child.id());

    let status = child.wait();

    #[cfg(unix)]
    signals::clear_child();

    Ok(ChildOutcome::from_status(status?))
}

/// Launcher entry point: never returns.
pub fn run(args: Vec<OsString>) -> ! {
    let resolved = match resolve_binary() {
        Ok(resolved) => resolved,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    match exec(resolved.path(), &args) {
        Ok(ChildOutcome::Exited(code)) => std::process::exit(code),
        Ok(ChildOutcome::Signaled(sig)) => {
            debug!("child terminated by signal {sig}");
            #[cfg(unix)]
            signals::reraise(sig);
            #[cfg(not(unix))]
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}
