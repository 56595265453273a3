//! Binary extraction from release archives
//!
//! Upstream archive layouts are not stable across releases, so extraction
//! runs an ordered list of layouts and stops at the first that yields the
//! binary:
//!
//! - `Nested` - `<folder>/<binary>`, one segment below an archive-root folder
//! - `Root`   - `<binary>` at the archive root
//! - `Search` - unpack everything, find the binary by name anywhere, keep only it

use std::fs::File;
use std::io;
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use log::debug;
use tar::Archive;
use walkdir::WalkDir;
use zip::ZipArchive;

use crate::error::{Result, ShimError};
use crate::platform::ArchiveFormat;

/// Archive layout strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Nested,
    Root,
    Search,
}

/// Layouts in the order they are attempted
pub const LAYOUTS: [Layout; 3] = [Layout::Nested, Layout::Root, Layout::Search];

/// Extract `binary` from `archive` into `bin_dir/<binary>`.
///
/// Returns the layout that matched together with the extracted path.
pub fn extract_binary(
    archive: &Path,
    format: ArchiveFormat,
    binary: &str,
    bin_dir: &Path,
) -> Result<(Layout, PathBuf)> {
    std::fs::create_dir_all(bin_dir)?;
    let dest = bin_dir.join(binary);

    for layout in LAYOUTS {
        match try_layout(layout, archive, format, binary, &dest) {
            Ok(true) => return Ok((layout, dest)),
            Ok(false) => debug!("{layout:?} layout: {binary} not found in {}", archive.display()),
            Err(e) => debug!("{layout:?} layout failed for {}: {e}", archive.display()),
        }
        // A failed attempt must not leave a truncated file behind
        let _ = std::fs::remove_file(&dest);
    }

    Err(ShimError::Extraction {
        archive: archive.to_path_buf(),
        binary: binary.to_string(),
    })
}

/// Attempt a single layout. `Ok(false)` means the layout did not match.
pub fn try_layout(
    layout: Layout,
    archive: &Path,
    format: ArchiveFormat,
    binary: &str,
    dest: &Path,
) -> io::Result<bool> {
    match layout {
        Layout::Nested => copy_matching_entry(archive, format, dest, |parts| {
            parts.len() == 2 && parts[1] == binary
        }),
        Layout::Root => copy_matching_entry(archive, format, dest, |parts| {
            parts.len() == 1 && parts[0] == binary
        }),
        Layout::Search => search_and_relocate(archive, format, binary, dest),
    }
}

/// Normal path components of an archive entry, ignoring `./` prefixes
fn entry_parts(path: &Path) -> Vec<String> {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect()
}

/// Copy the first regular file whose path satisfies `matches` to `dest`.
fn copy_matching_entry<F>(archive: &Path, format: ArchiveFormat, dest: &Path, matches: F) -> io::Result<bool>
where
    F: Fn(&[String]) -> bool,
{
    match format {
        ArchiveFormat::TarGz => {
            let mut tar = Archive::new(GzDecoder::new(File::open(archive)?));
            for entry in tar.entries()? {
                let mut entry = entry?;
                if !entry.header().entry_type().is_file() {
                    continue;
                }
                let parts = entry_parts(&entry.path()?);
                if !matches(&parts) {
                    continue;
                }

                let mut out = File::create(dest)?;
                io::copy(&mut entry, &mut out)?;
                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    if let Ok(mode) = entry.header().mode() {
                        std::fs::set_permissions(dest, std::fs::Permissions::from_mode(mode))?;
                    }
                }
                return Ok(true);
            }
            Ok(false)
        }
        ArchiveFormat::Zip => {
            let mut zip = ZipArchive::new(File::open(archive)?).map_err(io::Error::other)?;
            for i in 0..zip.len() {
                let mut file = zip.by_index(i).map_err(io::Error::other)?;
                if file.is_dir() {
                    continue;
                }
                let Some(path) = file.enclosed_name() else {
                    continue;
                };
                if !matches(&entry_parts(&path)) {
                    continue;
                }

                let mut out = File::create(dest)?;
                io::copy(&mut file, &mut out)?;
                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    if let Some(mode) = file.unix_mode() {
                        std::fs::set_permissions(dest, std::fs::Permissions::from_mode(mode))?;
                    }
                }
                return Ok(true);
            }
            Ok(false)
        }
    }
}

/// Unpack everything next to `dest`, move the binary into place, drop the rest.
fn search_and_relocate(archive: &Path, format: ArchiveFormat, binary: &str, dest: &Path) -> io::Result<bool> {
    let parent = dest
        .parent()
        .ok_or_else(|| io::Error::other(format!("no parent for {}", dest.display())))?;

    // The staging dir lives inside the package so the final rename never
    // crosses filesystems; dropping it removes every other extracted entry.
    let staging = tempfile::Builder::new()
        .prefix(".unpack-")
        .tempdir_in(parent)?;
    unpack_all(archive, format, staging.path())?;

    let found = WalkDir::new(staging.path())
        .into_iter()
        .filter_map(|e| e.ok())
        .find(|e| e.file_type().is_file() && e.file_name() == binary);

    let Some(found) = found else {
        return Ok(false);
    };
    debug!("found {} at {}", binary, found.path().display());
    std::fs::rename(found.path(), dest)?;
    staging.close()?;
    Ok(true)
}

fn unpack_all(archive: &Path, format: ArchiveFormat, dir: &Path) -> io::Result<()> {
    match format {
        ArchiveFormat::TarGz => Archive::new(GzDecoder::new(File::open(archive)?)).unpack(dir),
        ArchiveFormat::Zip => ZipArchive::new(File::open(archive)?)
            .and_then(|mut zip| zip.extract(dir))
            .map_err(io::Error::other),
    }
}
