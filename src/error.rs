//! Error taxonomy shared by the package builder, the launcher and setup.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by library operations.
///
/// `Fetch` and `Extraction` are recovered per platform by the builder and end
/// up in the build report; `Usage`, `Resolution` and `Spawn` reach the user.
#[derive(Debug, Error)]
pub enum ShimError {
    #[error("{0}")]
    Usage(String),

    #[error("download of {url} failed: {reason}")]
    Fetch { url: String, reason: String },

    #[error("could not extract {binary} from {}", archive.display())]
    Extraction { archive: PathBuf, binary: String },

    #[error("{0}")]
    Resolution(String),

    #[error("failed to start {}: {source}", path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("manifest {}: {reason}", path.display())]
    Manifest { path: PathBuf, reason: String },

    #[error("configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ShimError {
    pub fn fetch(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Fetch {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn manifest(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Manifest {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T, E = ShimError> = std::result::Result<T, E>;
