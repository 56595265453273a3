//! Provider configuration for the wrapped tool
//!
//! `binshim-setup` stores where the wrapped program should send requests as a
//! small JSON document in the user's config directory.

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::config::ShimConfig;
use crate::error::{Result, ShimError};

/// Supported provider types
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[value(name = "openai")]
    OpenAi,
    Azure,
    Anthropic,
    Ollama,
    Custom,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Azure => "azure",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Ollama => "ollama",
            ProviderKind::Custom => "custom",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(rename = "type")]
    pub kind: ProviderKind,
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment: Option<String>,
}

/// On-disk `config.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolConfig {
    pub provider: ProviderConfig,
}

impl ToolConfig {
    /// Validate the `quick` arguments and build a config.
    pub fn quick(kind: ProviderKind, endpoint: &str, deployment: Option<&str>) -> Result<Self> {
        let url = reqwest::Url::parse(endpoint)
            .map_err(|e| ShimError::Usage(format!("invalid endpoint {endpoint:?}: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ShimError::Usage(format!(
                "endpoint must be an http(s) URL, got {endpoint:?}"
            )));
        }

        let deployment = deployment.map(str::trim).filter(|d| !d.is_empty());
        if kind == ProviderKind::Azure && deployment.is_none() {
            return Err(ShimError::Usage(
                "azure requires a deployment name: quick azure <endpoint> <deployment>".into(),
            ));
        }

        Ok(Self {
            provider: ProviderConfig {
                kind,
                endpoint: endpoint.trim_end_matches('/').to_string(),
                deployment: deployment.map(str::to_string),
            },
        })
    }

    pub fn load(path: &Path) -> Result<Option<Self>> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| ShimError::Config(format!("cannot parse {}: {e}", path.display())))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ShimError::Config(e.to_string()))?;
        std::fs::write(path, json + "\n")?;
        Ok(())
    }

    /// Shell `export` lines, variables prefixed with the binary name.
    pub fn env_lines(&self, binary: &str) -> Vec<String> {
        let prefix = env_prefix(binary);
        let mut lines = vec![
            format!("export {prefix}_PROVIDER={}", shell_quote(self.provider.kind.as_str())),
            format!("export {prefix}_ENDPOINT={}", shell_quote(&self.provider.endpoint)),
        ];
        if let Some(deployment) = &self.provider.deployment {
            lines.push(format!("export {prefix}_DEPLOYMENT={}", shell_quote(deployment)));
        }
        lines
    }
}

/// `<config dir>/<package>/config.json`
pub fn config_path(cfg: &ShimConfig) -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(&cfg.package).join("config.json"))
        .ok_or_else(|| ShimError::Config("Could not determine config directory".into()))
}

fn env_prefix(binary: &str) -> String {
    binary
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect()
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
