//! Locating the installed platform binary
//!
//! Package managers disagree about where optional dependencies land (nested,
//! scoped, hoisted, workspace-linked), so resolution probes an ordered list
//! of candidate `bin/` directories and takes the first hit.

use std::io;
use std::path::{Path, PathBuf};

use log::debug;

use crate::config::ShimConfig;
use crate::error::{Result, ShimError};
use crate::fsutil;
use crate::platform::{PLATFORMS, PlatformTarget};

/// Overrides the package root derived from the launcher's location.
pub const PACKAGE_ROOT_ENV: &str = "BINSHIM_PACKAGE_ROOT";

/// How a binary was found in a candidate directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// The properly named executable was already there
    Canonical(PathBuf),
    /// A disguised file was renamed to the proper name
    Upgraded(PathBuf),
    /// A disguised file could not be renamed and is used where it is
    InPlace(PathBuf),
}

impl Resolved {
    pub fn path(&self) -> &Path {
        match self {
            Resolved::Canonical(p) | Resolved::Upgraded(p) | Resolved::InPlace(p) => p,
        }
    }
}

/// Binary lookup for one configuration and platform
#[derive(Debug, Clone)]
pub struct Resolver {
    cfg: ShimConfig,
    target: PlatformTarget,
    package_root: PathBuf,
}

impl Resolver {
    pub fn new(cfg: ShimConfig, target: PlatformTarget, package_root: PathBuf) -> Self {
        Self {
            cfg,
            target,
            package_root,
        }
    }

    pub fn target(&self) -> &PlatformTarget {
        &self.target
    }

    /// Candidate `bin/` directories in probe order, without duplicates.
    pub fn candidate_dirs(&self) -> Vec<PathBuf> {
        let scoped = self.cfg.platform_package_name(&self.target);
        let unscoped = self.cfg.unscoped_package_name(&self.target);
        let root = &self.package_root;

        let mut dirs = vec![
            root.join("node_modules").join(&unscoped).join("bin"),
            root.join("node_modules").join(&scoped).join("bin"),
        ];

        if let Some(node_modules) = enclosing_node_modules(root) {
            dirs.push(node_modules.join(&scoped).join("bin"));
        }

        // Node-style resolution: nearest ancestor node_modules holding the manifest
        if let Some(manifest) = root
            .ancestors()
            .map(|dir| dir.join("node_modules").join(&scoped).join("package.json"))
            .find(|p| p.is_file())
            && let Some(package_dir) = manifest.parent()
        {
            dirs.push(package_dir.join("bin"));
        }

        let mut unique = Vec::with_capacity(dirs.len());
        for dir in dirs {
            if !unique.contains(&dir) {
                unique.push(dir);
            }
        }
        unique
    }

    /// Probe every candidate directory and return the first binary found.
    pub fn resolve(&self) -> Result<Resolved> {
        let binary = self.target.binary_file_name(&self.cfg.binary);
        let disguised = self.cfg.disguised_file_name();
        let candidates = self.candidate_dirs();

        for dir in &candidates {
            debug!("probing {}", dir.display());
            if let Some(found) = probe_dir(dir, &binary, &disguised) {
                debug!("resolved {found:?}");
                return Ok(found);
            }
        }

        Err(ShimError::Resolution(not_found_message(
            &self.cfg,
            &self.target,
            &candidates,
        )))
    }
}

/// Look for `binary` in `dir`, upgrading a disguised copy if that is all there is.
pub fn probe_dir(dir: &Path, binary: &str, disguised: &str) -> Option<Resolved> {
    let proper = dir.join(binary);
    if proper.is_file() {
        return Some(Resolved::Canonical(proper));
    }

    let hidden = dir.join(disguised);
    if !hidden.is_file() {
        return None;
    }

    match upgrade_disguised(&hidden, &proper) {
        Ok(()) => Some(Resolved::Upgraded(proper)),
        // Another launcher may have won the rename race
        Err(_) if proper.is_file() => Some(Resolved::Canonical(proper)),
        Err(e) => {
            debug!("cannot rename {}: {e}; running it in place", hidden.display());
            let _ = fsutil::make_executable(&hidden);
            Some(Resolved::InPlace(hidden))
        }
    }
}

/// Rename a disguised binary to its executable name and mark it executable.
pub fn upgrade_disguised(disguised: &Path, proper: &Path) -> io::Result<()> {
    std::fs::rename(disguised, proper)?;
    if let Err(e) = fsutil::make_executable(proper) {
        debug!("chmod {} failed: {e}", proper.display());
    }
    Ok(())
}

/// The `node_modules` directory that contains the package at `root`, if any.
fn enclosing_node_modules(root: &Path) -> Option<PathBuf> {
    let mut parent = root.parent()?;
    if parent
        .file_name()
        .is_some_and(|name| name.to_string_lossy().starts_with('@'))
    {
        parent = parent.parent()?;
    }
    (parent.file_name()? == "node_modules").then(|| parent.to_path_buf())
}

/// Package root: `$BINSHIM_PACKAGE_ROOT`, else the parent of the launcher's directory.
pub fn package_root() -> Result<PathBuf> {
    if let Some(root) = std::env::var_os(PACKAGE_ROOT_ENV) {
        return Ok(PathBuf::from(root));
    }
    let exe = std::env::current_exe()?;
    let exe = exe.canonicalize().unwrap_or(exe);
    exe.parent()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .ok_or_else(|| {
            ShimError::Resolution(format!("cannot derive package root from {}", exe.display()))
        })
}

fn not_found_message(cfg: &ShimConfig, target: &PlatformTarget, searched: &[PathBuf]) -> String {
    let package = cfg.platform_package_name(target);
    diagnostic(
        cfg,
        &format!("no prebuilt `{}` binary found for {}.", cfg.binary, target.key()),
        &[
            format!("this platform is not supported (supported: {})", supported_list()),
            format!("the optional dependency {package} failed to install"),
            "your package manager skipped optional dependencies (--no-optional / --omit=optional)"
                .to_string(),
        ],
        &package,
        searched,
    )
}

/// Diagnostic for a host that has no entry in the platform table.
pub fn unsupported_message(cfg: &ShimConfig, os: &str, arch: &str) -> String {
    let pattern = if cfg.scope.is_empty() {
        format!("{}-<os>-<cpu>", cfg.package)
    } else {
        format!("{}/{}-<os>-<cpu>", cfg.scope, cfg.package)
    };
    diagnostic(
        cfg,
        &format!("no prebuilt `{}` binary is published for {os} {arch}.", cfg.binary),
        &[
            format!("this platform is not supported (supported: {})", supported_list()),
            "the process runs under an emulation layer that reports an unexpected os or cpu"
                .to_string(),
        ],
        &pattern,
        &[],
    )
}

fn supported_list() -> String {
    PLATFORMS.iter().map(PlatformTarget::key).collect::<Vec<_>>().join(", ")
}

fn diagnostic(
    cfg: &ShimConfig,
    headline: &str,
    causes: &[String],
    direct: &str,
    searched: &[PathBuf],
) -> String {
    let mut msg = format!("{headline}\n\nLikely causes:\n");
    for cause in causes {
        msg.push_str(&format!("  - {cause}\n"));
    }
    msg.push_str(&format!(
        "\nTo fix:\n  \
         - reinstall: npm install {}\n  \
         - or install the platform package directly: npm install {direct}\n  \
         - or download a release archive from {}/releases\n",
        cfg.package,
        cfg.repository.trim_end_matches('/'),
    ));
    if !searched.is_empty() {
        msg.push_str("\nSearched:\n");
        for dir in searched {
            msg.push_str(&format!("  - {}\n", dir.display()));
        }
    }
    msg
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linux() -> PlatformTarget {
        PlatformTarget::find("linux", "x64").unwrap()
    }

    fn write_file(path: &Path, body: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, body).unwrap();
    }

    #[test]
    fn candidates_cover_nested_scoped_and_hoisted() {
        let cfg = ShimConfig::default();
        let root = PathBuf::from("/proj/node_modules/tool");
        let dirs = Resolver::new(cfg, linux(), root).candidate_dirs();

        assert_eq!(
            dirs,
            vec![
                PathBuf::from("/proj/node_modules/tool/node_modules/tool-linux-x64/bin"),
                PathBuf::from("/proj/node_modules/tool/node_modules/@tool/tool-linux-x64/bin"),
                PathBuf::from("/proj/node_modules/@tool/tool-linux-x64/bin"),
            ]
        );
    }

    #[test]
    fn scoped_root_package_hoists_past_scope_dir() {
        assert_eq!(
            enclosing_node_modules(Path::new("/p/node_modules/@acme/tool")),
            Some(PathBuf::from("/p/node_modules"))
        );
        assert_eq!(enclosing_node_modules(Path::new("/p/checkout/tool")), None);
    }

    #[test]
    fn registry_fallback_finds_workspace_install() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("packages/tool");
        let pkg = tmp.path().join("node_modules/@tool/tool-linux-x64");
        write_file(&pkg.join("package.json"), "{}");
        write_file(&pkg.join("bin/tool"), "bin");

        let resolver = Resolver::new(ShimConfig::default(), linux(), root);
        assert!(resolver.candidate_dirs().contains(&pkg.join("bin")));
        assert_eq!(resolver.resolve().unwrap(), Resolved::Canonical(pkg.join("bin/tool")));
    }

    #[test]
    fn proper_name_beats_disguised() {
        let tmp = tempfile::tempdir().unwrap();
        write_file(&tmp.path().join("tool"), "real");
        write_file(&tmp.path().join("tool.dat"), "hidden");

        let found = probe_dir(tmp.path(), "tool", "tool.dat").unwrap();
        assert_eq!(found, Resolved::Canonical(tmp.path().join("tool")));
        assert_eq!(std::fs::read_to_string(tmp.path().join("tool.dat")).unwrap(), "hidden");
    }

    #[test]
    fn disguised_only_is_upgraded() {
        let tmp = tempfile::tempdir().unwrap();
        write_file(&tmp.path().join("tool.dat"), "hidden");

        let found = probe_dir(tmp.path(), "tool", "tool.dat").unwrap();
        let proper = tmp.path().join("tool");
        assert_eq!(found, Resolved::Upgraded(proper.clone()));
        assert!(fsutil::is_executable(&proper));
        assert!(!tmp.path().join("tool.dat").exists());

        // Second lookup sees the upgraded file
        assert_eq!(
            probe_dir(tmp.path(), "tool", "tool.dat"),
            Some(Resolved::Canonical(proper))
        );
    }

    #[test]
    fn failed_rename_runs_disguised_in_place() {
        let tmp = tempfile::tempdir().unwrap();
        write_file(&tmp.path().join("tool.dat"), "hidden");
        // A directory squatting on the proper name makes the rename fail
        std::fs::create_dir(tmp.path().join("tool")).unwrap();
        write_file(&tmp.path().join("tool/keep"), "x");

        let found = probe_dir(tmp.path(), "tool", "tool.dat").unwrap();
        assert_eq!(found, Resolved::InPlace(tmp.path().join("tool.dat")));
        assert!(tmp.path().join("tool.dat").exists());
    }

    #[test]
    fn empty_dir_yields_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(probe_dir(tmp.path(), "tool", "tool.dat"), None);
    }

    #[test]
    fn not_found_lists_remediation_and_searched_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let resolver = Resolver::new(ShimConfig::default(), linux(), tmp.path().to_path_buf());

        let err = resolver.resolve().unwrap_err();
        let text = err.to_string();
        assert!(text.contains("@tool/tool-linux-x64"));
        assert!(text.contains("npm install tool"));
        assert!(text.contains(&tmp.path().join("node_modules").display().to_string()));
    }

    #[test]
    fn unsupported_host_gets_full_remediation() {
        let text = unsupported_message(&ShimConfig::default(), "freebsd", "x86_64");
        assert!(text.contains("freebsd x86_64"));
        assert!(text.contains("linux-x64, linux-arm64"));
        assert!(text.contains("npm install tool\n"));
        assert!(text.contains("npm install @tool/tool-<os>-<cpu>"));
        assert!(text.contains("https://github.com/tool/tool/releases"));
        assert!(!text.contains("Searched"));
    }
}
