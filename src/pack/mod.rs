//! Platform package builder
//!
//! Turns a release version into one npm package per supported platform and
//! points the root manifest at them.
//!
//! ## Module Organization
//!
//! - `download` - cached, timeout-bounded archive download
//! - `extract`  - ordered archive layout strategies
//! - `manifest` - platform `package.json`/`README.md` and root manifest rewrite

pub mod download;
pub mod extract;
pub mod manifest;

use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::config::ShimConfig;
use crate::error::{Result, ShimError};
use crate::fsutil;
use crate::platform::{PLATFORMS, PlatformTarget};
use download::Downloader;
use manifest::PackageManifest;

/// A platform package that was written successfully
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltPackage {
    pub target: PlatformTarget,
    pub name: String,
    pub dir: PathBuf,
    pub binary: PathBuf,
}

/// A platform that was left out of this build
#[derive(Debug)]
pub struct SkippedPlatform {
    pub target: PlatformTarget,
    pub reason: ShimError,
}

/// Summary of a `build_all` run. `built.len()` is the success signal.
#[derive(Debug, Default)]
pub struct BuildReport {
    pub version: String,
    pub built: Vec<BuiltPackage>,
    pub skipped: Vec<SkippedPlatform>,
}

impl BuildReport {
    pub fn is_built(&self, target: &PlatformTarget) -> bool {
        self.built.iter().any(|b| &b.target == target)
    }
}

/// Package builder bound to one configuration
#[derive(Debug)]
pub struct PackageBuilder {
    cfg: ShimConfig,
    downloader: Downloader,
}

impl PackageBuilder {
    pub fn new(cfg: ShimConfig) -> Result<Self> {
        let downloader = Downloader::new(cfg.connect_timeout(), cfg.inactivity_timeout())?;
        Ok(Self { cfg, downloader })
    }

    pub fn config(&self) -> &ShimConfig {
        &self.cfg
    }

    /// Build every platform package for `version` and rewrite the root manifest.
    ///
    /// The output directory is recreated before any platform runs; the root
    /// manifest is rewritten after all of them. Individual platform failures
    /// are recorded in the report and never abort the run.
    pub async fn build_all(&self, version: &str) -> Result<BuildReport> {
        let version = version.trim();
        if version.is_empty() {
            return Err(ShimError::Usage("a release version is required".into()));
        }

        fsutil::remove_dir_if_exists(&self.cfg.out_dir)?;
        tokio::fs::create_dir_all(&self.cfg.out_dir).await?;

        let mut report = BuildReport {
            version: version.to_string(),
            ..Default::default()
        };

        for target in PLATFORMS {
            match self.build_one(version, &target).await {
                Ok(pkg) => {
                    info!("✓ {} -> {}", pkg.name, pkg.dir.display());
                    report.built.push(pkg);
                }
                Err(reason) => {
                    warn!("Skipping {}: {reason}", target.key());
                    report.skipped.push(SkippedPlatform { target, reason });
                }
            }
        }

        if self.cfg.root_manifest.exists() {
            let names: Vec<String> = PLATFORMS
                .iter()
                .map(|t| self.cfg.platform_package_name(t))
                .collect();
            manifest::update_root_manifest(&self.cfg.root_manifest, version, &names)?;
            info!(
                "Updated {} to version {version}",
                self.cfg.root_manifest.display()
            );
        } else {
            warn!(
                "Root manifest {} not found, leaving it alone",
                self.cfg.root_manifest.display()
            );
        }

        Ok(report)
    }

    /// Build the package for a single platform.
    ///
    /// On any failure the partial package directory is removed.
    pub async fn build_one(&self, version: &str, target: &PlatformTarget) -> Result<BuiltPackage> {
        let package_dir = self.cfg.out_dir.join(target.key());
        match self.build_into(version, target, &package_dir).await {
            Ok(pkg) => Ok(pkg),
            Err(e) => {
                if let Err(cleanup) = fsutil::remove_dir_if_exists(&package_dir) {
                    warn!("Failed to clean up {}: {cleanup}", package_dir.display());
                }
                Err(e)
            }
        }
    }

    async fn build_into(&self, version: &str, target: &PlatformTarget, package_dir: &Path) -> Result<BuiltPackage> {
        let archive_name = self.cfg.archive_file_name(version, target);
        let binary_name = target.binary_file_name(&self.cfg.binary);
        let url = self.cfg.release_url_for(version, &archive_name);
        let archive_path = self.cfg.archive_cache_dir().join(&archive_name);

        info!("[{}] {archive_name}", target.key());
        let fetched = self.downloader.fetch_archive(&url, &archive_path).await?;

        fsutil::remove_dir_if_exists(package_dir)?;
        let bin_dir = package_dir.join("bin");

        let archive = fetched.path().to_path_buf();
        let format = target.archive_format();
        let (layout, mut binary) = {
            let binary_name = binary_name.clone();
            let bin_dir = bin_dir.clone();
            tokio::task::spawn_blocking(move || {
                extract::extract_binary(&archive, format, &binary_name, &bin_dir)
            })
            .await
            .map_err(|e| ShimError::Io(std::io::Error::other(e)))??
        };
        log::debug!("[{}] extracted via {layout:?} layout", target.key());

        if let Err(e) = fsutil::make_executable(&binary) {
            warn!("[{}] could not mark {} executable: {e}", target.key(), binary.display());
        }

        if !binary.is_file() {
            return Err(ShimError::Extraction {
                archive: fetched.path().to_path_buf(),
                binary: binary_name,
            });
        }

        if self.cfg.disguise {
            let disguised = bin_dir.join(self.cfg.disguised_file_name());
            tokio::fs::rename(&binary, &disguised).await?;
            binary = disguised;
        }

        let manifest = PackageManifest::new(&self.cfg, version, target);
        manifest::write_package_files(package_dir, &manifest, &self.cfg)?;

        Ok(BuiltPackage {
            target: *target,
            name: manifest.name,
            dir: package_dir.to_path_buf(),
            binary,
        })
    }
}
