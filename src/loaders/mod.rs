//! Session loaders, one per coding-assistant source
//!
//! Every loader implements [`SessionLoader`]. Capabilities beyond that are
//! separate traits a loader opts into and exposes through the `as_*` probes,
//! so callers can ask "is this source incremental?" without knowing its type.
//!
//! Loaders never fail a read because of one bad unit: unreadable files and
//! rows are logged and skipped. `read_history` only errors when the source as
//! a whole cannot be read (missing root, unopenable database).

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};

use anyhow::Result;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use tracing::warn;

use crate::models::{AgentType, ChatHistory, ProjectInfo};
use crate::sync::aggregator::projects_from_sessions;

pub mod claude_code;
pub mod codex;
pub mod cursor;
pub mod gemini;
pub mod registry;

pub use claude_code::ClaudeCodeLoader;
pub use codex::CodexLoader;
pub use cursor::CursorLoader;
pub use gemini::GeminiLoader;
pub use registry::LoaderRegistry;

pub use crate::sync::cutoff::LoadOptions;

/// A source of coding-assistant sessions
pub trait SessionLoader: Send + Sync {
    fn agent_type(&self) -> AgentType;

    /// Human-readable source name
    fn name(&self) -> &str;

    /// Whether the source's data is present on this machine. Cheap and
    /// infallible: any probing error means "not available".
    fn is_available(&self) -> bool;

    /// Read every session whose unit passes the cutoff in `options`
    fn read_history(&self, options: &LoadOptions) -> Result<Vec<ChatHistory>>;

    /// Projects referenced by `sessions`, one per recoverable path
    fn extract_projects(&self, sessions: &[ChatHistory]) -> Vec<ProjectInfo> {
        projects_from_sessions(self.agent_type(), sessions)
    }

    fn as_incremental(&self) -> Option<&dyn IncrementalLoader> {
        None
    }

    fn as_database(&self) -> Option<&dyn DatabaseLoader> {
        None
    }
}

/// A source that can resume from a cutoff
pub trait IncrementalLoader: SessionLoader {
    /// Newest unit modification time (Unix ms) seen by the last read in this
    /// process, if any read has happened
    fn last_sync_timestamp(&self) -> Option<i64>;
}

/// A source backed by a database file
pub trait DatabaseLoader: SessionLoader {
    fn database_path(&self) -> &Path;

    /// Whether the database can actually be opened, not merely whether it exists
    fn is_database_accessible(&self) -> bool;
}

/// Newest unit time observed by a loader
///
/// Loaders are shared across threads behind `&self`, so the value is atomic.
/// Zero means "nothing observed yet".
#[derive(Debug, Default)]
pub(crate) struct LastSeen(AtomicI64);

impl LastSeen {
    pub(crate) fn observe(&self, at: DateTime<Utc>) {
        self.0.fetch_max(at.timestamp_millis(), Ordering::Relaxed);
    }

    pub(crate) fn get(&self) -> Option<i64> {
        Some(self.0.load(Ordering::Relaxed)).filter(|ms| *ms > 0)
    }
}

/// Parse file units in parallel, dropping files that fail to read or hold no
/// messages. Output is ordered newest first, ties broken by id.
pub(crate) fn parse_files<F>(source: AgentType, paths: &[PathBuf], parse: F) -> Vec<ChatHistory>
where
    F: Fn(&Path) -> Result<Option<ChatHistory>> + Sync,
{
    let mut sessions: Vec<ChatHistory> = paths
        .par_iter()
        .filter_map(|path| match parse(path) {
            Ok(session) => session,
            Err(e) => {
                warn!(source = %source, path = %path.display(), error = %e, "Skipping unreadable session");
                None
            }
        })
        .collect();
    sort_sessions(&mut sessions);
    sessions
}

pub(crate) fn sort_sessions(sessions: &mut [ChatHistory]) {
    sessions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.id.cmp(&b.id)));
}
