//! Shim configuration (`binshim.toml`): package naming, release URL templates
//! and download limits, with discovery from flag, environment or file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ShimError};
use crate::platform::PlatformTarget;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "BINSHIM_CONFIG";

/// Default config file name, looked up in the working directory or package root.
pub const CONFIG_FILE: &str = "binshim.toml";

/// Disguised binaries use this extension until the launcher renames them.
pub const DISGUISED_EXTENSION: &str = "dat";

/// Top‑level shim configuration (`binshim.toml`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShimConfig {
    /// Root npm package name, e.g. `tool`.
    pub package: String,
    /// npm scope of the platform packages, e.g. `@tool`.
    pub scope: String,
    /// Name of the wrapped executable (without `.exe`).
    pub binary: String,
    pub description: String,
    pub license: String,
    pub repository: String,
    /// Template with `{binary}`, `{version}`, `{suffix}` and `{ext}`.
    pub archive_name: String,
    /// Template with `{repository}`, `{version}` and `{archive}`.
    pub release_url: String,
    pub out_dir: PathBuf,
    pub cache_dir: Option<PathBuf>,
    pub root_manifest: PathBuf,
    /// Ship `bin/<stem>.dat` instead of the executable name.
    pub disguise: bool,
    pub connect_timeout_secs: u64,
    pub inactivity_timeout_secs: u64,
}

impl Default for ShimConfig {
    fn default() -> Self {
        Self {
            package: "tool".into(),
            scope: "@tool".into(),
            binary: "tool".into(),
            description: "Prebuilt tool binary".into(),
            license: "MIT".into(),
            repository: "https://github.com/tool/tool".into(),
            archive_name: "{binary}-{version}-{suffix}.{ext}".into(),
            release_url: "{repository}/releases/download/v{version}/{archive}".into(),
            out_dir: PathBuf::from("npm"),
            cache_dir: None,
            root_manifest: PathBuf::from("package.json"),
            disguise: false,
            connect_timeout_secs: 30,
            inactivity_timeout_secs: 300,
        }
    }
}

impl ShimConfig {
    /// Load from `explicit`, then `$BINSHIM_CONFIG`, then `<dir>/binshim.toml`.
    ///
    /// Falls back to defaults when none of them exists.
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Self::load(Path::new(&path));
        }
        let local = dir.join(CONFIG_FILE);
        if local.is_file() {
            return Self::load(&local);
        }
        log::debug!("No {} in {}, using defaults", CONFIG_FILE, dir.display());
        Ok(Self::default())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ShimError::Config(format!("cannot read {}: {e}", path.display())))?;
        let cfg: Self = toml::from_str(&text)
            .map_err(|e| ShimError::Config(format!("cannot parse {}: {e}", path.display())))?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.binary.trim().is_empty() {
            return Err(ShimError::Config("`binary` must not be empty".into()));
        }
        if !self.scope.is_empty() && !self.scope.starts_with('@') {
            return Err(ShimError::Config(format!(
                "`scope` must start with '@', got {:?}",
                self.scope
            )));
        }
        if !self.archive_name.contains("{version}") {
            return Err(ShimError::Config(
                "`archive_name` must contain {version}".into(),
            ));
        }
        Ok(())
    }

    /// Unscoped platform package name, e.g. `tool-linux-x64`.
    pub fn unscoped_package_name(&self, target: &PlatformTarget) -> String {
        format!("{}-{}", self.package, target.key())
    }

    /// Published platform package name, e.g. `@tool/tool-linux-x64`.
    pub fn platform_package_name(&self, target: &PlatformTarget) -> String {
        let base = self.unscoped_package_name(target);
        if self.scope.is_empty() {
            base
        } else {
            format!("{}/{}", self.scope, base)
        }
    }

    pub fn archive_file_name(&self, version: &str, target: &PlatformTarget) -> String {
        self.archive_name
            .replace("{binary}", &self.binary)
            .replace("{version}", version)
            .replace("{suffix}", target.archive_suffix)
            .replace("{ext}", target.archive_format().extension())
    }

    pub fn release_url_for(&self, version: &str, archive: &str) -> String {
        self.release_url
            .replace("{repository}", self.repository.trim_end_matches('/'))
            .replace("{version}", version)
            .replace("{archive}", archive)
    }

    /// Disguised file name: `<binary>.dat` on every platform.
    pub fn disguised_file_name(&self) -> String {
        format!("{}.{}", self.binary, DISGUISED_EXTENSION)
    }

    /// Archive cache directory; user cache dir unless configured.
    pub fn archive_cache_dir(&self) -> PathBuf {
        match &self.cache_dir {
            Some(dir) => dir.clone(),
            None => dirs::cache_dir()
                .map(|d| d.join("binshim").join("archives"))
                .unwrap_or_else(|| PathBuf::from(".binshim-cache")),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_secs(self.inactivity_timeout_secs)
    }
}
