//! npm manifests: per-platform `package.json`/`README.md` and the root manifest rewrite

use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::ShimConfig;
use crate::error::{Result, ShimError};
use crate::platform::PlatformTarget;

/// `package.json` of a single platform package
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    pub name: String,
    pub version: String,
    pub description: String,
    pub license: String,
    pub repository: String,
    pub os: Vec<String>,
    pub cpu: Vec<String>,
    pub files: Vec<String>,
    /// Yarn PnP must unpack the package so the binary can be executed
    pub prefer_unplugged: bool,
}

impl PackageManifest {
    pub fn new(cfg: &ShimConfig, version: &str, target: &PlatformTarget) -> Self {
        Self {
            name: cfg.platform_package_name(target),
            version: version.to_string(),
            description: format!("{} ({} {})", cfg.description, target.os, target.cpu),
            license: cfg.license.clone(),
            repository: cfg.repository.clone(),
            os: vec![target.os.to_string()],
            cpu: vec![target.cpu.to_string()],
            files: vec!["bin/".to_string()],
            prefer_unplugged: true,
        }
    }
}

/// Write `package.json` and `README.md` into `package_dir`.
pub fn write_package_files(package_dir: &Path, manifest: &PackageManifest, cfg: &ShimConfig) -> Result<()> {
    let path = package_dir.join("package.json");
    let json = serde_json::to_string_pretty(manifest).map_err(|e| ShimError::manifest(&path, e))?;
    std::fs::write(&path, json + "\n")?;

    std::fs::write(package_dir.join("README.md"), readme(manifest, cfg))?;
    Ok(())
}

fn readme(manifest: &PackageManifest, cfg: &ShimConfig) -> String {
    format!(
        "# {name}\n\n\
         Prebuilt `{binary}` {version} for {os}/{cpu}.\n\n\
         This package is installed automatically as an optional dependency of \
         `{root}`. Install `{root}` instead of depending on it directly.\n\n\
         Source: {repo}\n",
        name = manifest.name,
        binary = cfg.binary,
        version = manifest.version,
        os = manifest.os.join(","),
        cpu = manifest.cpu.join(","),
        root = cfg.package,
        repo = cfg.repository,
    )
}

/// Rewrite the root manifest's `version` and every `optionalDependencies` entry.
///
/// Missing platform packages are added. Key order is preserved and the
/// output is stable, so repeating the call with the same version is a no-op
/// byte for byte.
pub fn update_root_manifest(path: &Path, version: &str, package_names: &[String]) -> Result<()> {
    let text = std::fs::read_to_string(path).map_err(|e| ShimError::manifest(path, e))?;
    let mut doc: Value = serde_json::from_str(&text).map_err(|e| ShimError::manifest(path, e))?;

    let root = doc
        .as_object_mut()
        .ok_or_else(|| ShimError::manifest(path, "top level is not an object"))?;
    root.insert("version".into(), Value::String(version.to_string()));

    let deps = root
        .entry("optionalDependencies")
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or_else(|| ShimError::manifest(path, "optionalDependencies is not an object"))?;

    for value in deps.values_mut() {
        *value = Value::String(version.to_string());
    }
    for name in package_names {
        if !deps.contains_key(name) {
            deps.insert(name.clone(), Value::String(version.to_string()));
        }
    }

    let json = serde_json::to_string_pretty(&doc).map_err(|e| ShimError::manifest(path, e))?;
    std::fs::write(path, json + "\n")?;
    Ok(())
}
