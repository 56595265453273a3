//! Fixed platform matrix shared by the builder and the launcher

use once_cell::sync::OnceCell;

use crate::error::{Result, ShimError};

/// Archive container used by upstream releases for a platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    TarGz,
    Zip,
}

impl ArchiveFormat {
    /// File extension used in archive names (without the leading dot)
    pub fn extension(&self) -> &'static str {
        match self {
            ArchiveFormat::TarGz => "tar.gz",
            ArchiveFormat::Zip => "zip",
        }
    }
}

/// One supported OS/CPU pair.
///
/// `os` and `cpu` use the npm vocabulary (`process.platform` / `process.arch`)
/// because they land verbatim in the package manifest constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformTarget {
    pub archive_suffix: &'static str,
    pub os: &'static str,
    pub cpu: &'static str,
}

/// Every platform a release is packaged for, in build order.
pub const PLATFORMS: [PlatformTarget; 6] = [
    PlatformTarget {
        archive_suffix: "x86_64-unknown-linux-musl",
        os: "linux",
        cpu: "x64",
    },
    PlatformTarget {
        archive_suffix: "aarch64-unknown-linux-musl",
        os: "linux",
        cpu: "arm64",
    },
    PlatformTarget {
        archive_suffix: "x86_64-apple-darwin",
        os: "darwin",
        cpu: "x64",
    },
    PlatformTarget {
        archive_suffix: "aarch64-apple-darwin",
        os: "darwin",
        cpu: "arm64",
    },
    PlatformTarget {
        archive_suffix: "x86_64-pc-windows-msvc",
        os: "win32",
        cpu: "x64",
    },
    PlatformTarget {
        archive_suffix: "aarch64-pc-windows-msvc",
        os: "win32",
        cpu: "arm64",
    },
];

/// Global cache for the running platform (initialized once, used everywhere)
static CURRENT: OnceCell<PlatformTarget> = OnceCell::new();

impl PlatformTarget {
    /// Look up a platform by its npm os/cpu pair
    pub fn find(os: &str, cpu: &str) -> Option<Self> {
        PLATFORMS.iter().copied().find(|p| p.os == os && p.cpu == cpu)
    }

    /// Detect the platform this process runs on (cached after first call)
    pub fn current() -> Result<Self> {
        CURRENT
            .get_or_try_init(|| Self::from_rust_consts(std::env::consts::OS, std::env::consts::ARCH))
            .copied()
    }

    /// Map Rust's `std::env::consts` names onto the platform table
    pub fn from_rust_consts(os: &str, arch: &str) -> Result<Self> {
        let npm_os = match os {
            "linux" => "linux",
            "macos" => "darwin",
            "windows" => "win32",
            other => other,
        };
        let npm_cpu = match arch {
            "x86_64" => "x64",
            "aarch64" => "arm64",
            other => other,
        };

        Self::find(npm_os, npm_cpu).ok_or_else(|| {
            ShimError::Resolution(format!("Unsupported platform: {npm_os} {npm_cpu}"))
        })
    }

    pub fn is_windows(&self) -> bool {
        self.os == "win32"
    }

    pub fn archive_format(&self) -> ArchiveFormat {
        if self.is_windows() {
            ArchiveFormat::Zip
        } else {
            ArchiveFormat::TarGz
        }
    }

    /// Executable file name for this platform
    pub fn binary_file_name(&self, binary: &str) -> String {
        if self.is_windows() {
            format!("{binary}.exe")
        } else {
            binary.to_string()
        }
    }

    /// `linux-x64`, `win32-arm64`, ... used for package names and directories
    pub fn key(&self) -> String {
        format!("{}-{}", self.os, self.cpu)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn six_unique_platforms() {
        let mut keys: Vec<_> = PLATFORMS.iter().map(|p| p.key()).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), 6);
    }

    #[test]
    fn maps_rust_names() {
        let p = PlatformTarget::from_rust_consts("macos", "aarch64").unwrap();
        assert_eq!(p.key(), "darwin-arm64");
        assert_eq!(p.archive_format(), ArchiveFormat::TarGz);

        let w = PlatformTarget::from_rust_consts("windows", "x86_64").unwrap();
        assert_eq!(w.binary_file_name("tool"), "tool.exe");
        assert_eq!(w.archive_format().extension(), "zip");
    }

    #[test]
    fn rejects_unknown_pairs() {
        let err = PlatformTarget::from_rust_consts("freebsd", "x86_64").unwrap_err();
        assert!(err.to_string().contains("freebsd x64"));
        assert!(PlatformTarget::from_rust_consts("linux", "riscv64").is_err());
    }
}
