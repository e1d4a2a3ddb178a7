//! Incremental sync cutoff
//!
//! A run skips every unit whose modification time is older than the cutoff.
//! The check is per unit (file or composer row), never per message, so a unit
//! that is still growing is re-read in full.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

/// Inputs a loader receives for one read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Explicit cutoff in Unix milliseconds; wins over `lookback_days`
    pub since_timestamp: Option<i64>,
    pub lookback_days: Option<u32>,
}

impl LoadOptions {
    pub fn since(since_ms: i64) -> Self {
        Self { since_timestamp: Some(since_ms), lookback_days: None }
    }

    pub fn lookback(days: u32) -> Self {
        Self { since_timestamp: None, lookback_days: Some(days) }
    }

    /// Same options without an explicit `since`, for sources that only honor a
    /// lookback window
    pub fn lookback_only(&self) -> Self {
        Self { since_timestamp: None, lookback_days: self.lookback_days }
    }

    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        effective_cutoff(self.since_timestamp, self.lookback_days, now)
    }
}

/// Resolves the cutoff for a run
///
/// 1. A positive `since_ms` is used as-is.
/// 2. Otherwise a positive `lookback_days` gives `now - lookback_days`.
/// 3. Otherwise there is no cutoff and every unit is read.
///
/// # Examples
///
/// ```
/// use chrono::{DateTime, Duration, Utc};
/// use ai_session_sync::sync::cutoff::effective_cutoff;
///
/// let now = Utc::now();
/// assert_eq!(effective_cutoff(None, Some(7), now), Some(now - Duration::days(7)));
/// assert_eq!(effective_cutoff(Some(1_000), Some(7), now), DateTime::from_timestamp_millis(1_000));
/// assert_eq!(effective_cutoff(Some(0), None, now), None);
/// ```
pub fn effective_cutoff(
    since_ms: Option<i64>,
    lookback_days: Option<u32>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    if let Some(since) = since_ms.filter(|ms| *ms > 0) {
        return DateTime::from_timestamp_millis(since);
    }
    lookback_days
        .filter(|days| *days > 0)
        .map(|days| now - Duration::days(i64::from(days)))
}

/// A unit is read when it was modified at or after the cutoff
pub fn is_included(modified_at: DateTime<Utc>, cutoff: Option<DateTime<Utc>>) -> bool {
    cutoff.is_none_or(|cutoff| modified_at >= cutoff)
}

/// Modification time of a file, without following symlinks
pub fn file_modified_at(path: &Path) -> Option<DateTime<Utc>> {
    let modified = fs::symlink_metadata(path).and_then(|m| m.modified()).ok()?;
    Some(DateTime::<Utc>::from(modified))
}

/// Keeps the paths modified at or after the cutoff
///
/// Paths whose modification time cannot be read are kept; the parser reports
/// the underlying problem.
pub fn filter_by_mtime(paths: Vec<PathBuf>, cutoff: Option<DateTime<Utc>>) -> Vec<PathBuf> {
    let Some(cutoff) = cutoff else {
        return paths;
    };
    let total = paths.len();
    let kept: Vec<PathBuf> = paths
        .into_iter()
        .filter(|path| file_modified_at(path).is_none_or(|mtime| mtime >= cutoff))
        .collect();
    debug!(total, kept = kept.len(), cutoff = %cutoff, "Applied modification time cutoff");
    kept
}
