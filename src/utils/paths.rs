use std::borrow::Cow;
use std::env;
use std::fs::File;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result, bail};
use percent_encoding::percent_decode_str;

// Maximum file size for a single session unit: 50MB
const MAX_FILE_SIZE_BYTES: u64 = 50 * 1024 * 1024;

const FILE_URI_PREFIX: &str = "file://";

/// Validates that a project path is absolute and free of `..` components
///
/// # Errors
///
/// Returns an error if:
/// - The path contains '..' components (path traversal)
/// - The path is not absolute
pub fn validate_project_path(path: &Path) -> Result<()> {
    if path.components().any(|c| c == Component::ParentDir) {
        bail!("Path contains '..' component: {}", path.display());
    }

    if !path.is_absolute() {
        bail!("Path must be absolute: {}", path.display());
    }

    Ok(())
}

/// Normalizes a raw project path into the canonical merge key
///
/// Trims whitespace and trailing separators, expands a leading `~/`, and
/// rejects relative paths or paths with `..` components. The filesystem is
/// not consulted, so paths of projects that no longer exist still merge.
///
/// # Examples
///
/// ```
/// use ai_session_sync::utils::canonical_project_path;
///
/// assert_eq!(canonical_project_path("/Users/foo/bar/").as_deref(), Some("/Users/foo/bar"));
/// assert_eq!(canonical_project_path("relative/dir"), None);
/// ```
pub fn canonical_project_path(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let expanded: Cow<'_, str> = match trimmed.strip_prefix("~/") {
        Some(rest) => {
            let home = dirs::home_dir()?;
            Cow::Owned(home.join(rest).to_string_lossy().into_owned())
        }
        None => Cow::Borrowed(trimmed),
    };

    let without_trailing = expanded.trim_end_matches('/');
    let normalized = if without_trailing.is_empty() { "/" } else { without_trailing };

    validate_project_path(Path::new(normalized)).ok()?;

    // Collapse duplicate separators
    let mut collapsed = String::with_capacity(normalized.len());
    let mut previous_slash = false;
    for ch in normalized.chars() {
        if ch == '/' {
            if previous_slash {
                continue;
            }
            previous_slash = true;
        } else {
            previous_slash = false;
        }
        collapsed.push(ch);
    }
    Some(collapsed)
}

/// Leaf directory name of a project path
pub fn project_name_from_path(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

/// Decodes a `file://` URI (as stored by VS Code based editors) into a path
///
/// Remote URIs (`vscode-remote://`, `ssh://`, ...) return `None`: they do not
/// name a directory on this machine.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use ai_session_sync::utils::decode_file_uri;
///
/// assert_eq!(decode_file_uri("file:///Users/foo/my%20app"), Some(PathBuf::from("/Users/foo/my app")));
/// assert_eq!(decode_file_uri("vscode-remote://ssh-remote%2Bbox/app"), None);
/// ```
pub fn decode_file_uri(uri: &str) -> Option<PathBuf> {
    let encoded = uri.strip_prefix(FILE_URI_PREFIX)?;
    // file://host/path is not a local path; file:///path has an empty host
    if !encoded.starts_with('/') {
        return None;
    }

    let decoded = percent_decode_str(encoded).decode_utf8_lossy();
    Some(PathBuf::from(decoded.as_ref()))
}

/// Rejects session units larger than 50 MB
///
/// Checked on the already-open handle so the size seen is the size read.
pub fn validate_file_size(file: &File, path: &Path) -> Result<()> {
    let size = file
        .metadata()
        .with_context(|| format!("Failed to stat session unit: {}", path.display()))?
        .len();
    if size > MAX_FILE_SIZE_BYTES {
        bail!("Session unit too large: {} ({} bytes, limit {})", path.display(), size, MAX_FILE_SIZE_BYTES);
    }
    Ok(())
}

/// Display form of a path with the home directory shown as `~`
pub fn format_path_with_tilde(path: &Path) -> String {
    let home = env::var_os("HOME").map(PathBuf::from);
    tilde_relative(path, home.as_deref())
}

fn tilde_relative(path: &Path, home: Option<&Path>) -> String {
    match home.filter(|h| !h.as_os_str().is_empty()).and_then(|h| path.strip_prefix(h).ok()) {
        Some(rest) if rest.as_os_str().is_empty() => "~".to_string(),
        Some(rest) => format!("~/{}", rest.display()),
        None => path.display().to_string(),
    }
}
