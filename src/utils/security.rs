//! Filesystem guards for reading third-party session stores
//!
//! Session directories belong to other applications. Symlinks inside them are
//! never followed and files are size-checked on the open handle.

use std::fs::{self, File};
use std::path::Path;

use anyhow::{Context, Result, bail};

use super::paths::validate_file_size;

/// Fails if `path` itself is a symlink
pub fn validate_path_not_symlink(path: &Path) -> Result<()> {
    let metadata = fs::symlink_metadata(path)
        .with_context(|| format!("Failed to read metadata: {}", path.display()))?;
    if metadata.file_type().is_symlink() {
        bail!("Symlinks are not allowed: {}", path.display());
    }
    Ok(())
}

/// Opens a regular file without following symlinks and validates its size
///
/// On unix the open uses `O_NOFOLLOW`, so a symlink swapped in after any
/// earlier check still fails to open.
pub fn safe_open_file(path: &Path) -> Result<File> {
    let file = open_no_follow(path)
        .with_context(|| format!("Failed to open file: {}", path.display()))?;

    let metadata = file
        .metadata()
        .with_context(|| format!("Failed to read file metadata: {}", path.display()))?;
    if !metadata.is_file() {
        bail!("Not a regular file: {}", path.display());
    }

    validate_file_size(&file, path)?;
    Ok(file)
}

#[cfg(unix)]
fn open_no_follow(path: &Path) -> std::io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;

    fs::OpenOptions::new().read(true).custom_flags(libc::O_NOFOLLOW).open(path)
}

#[cfg(not(unix))]
fn open_no_follow(path: &Path) -> std::io::Result<File> {
    let metadata = fs::symlink_metadata(path)?;
    if metadata.file_type().is_symlink() {
        return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, "symlink not allowed"));
    }
    File::open(path)
}
