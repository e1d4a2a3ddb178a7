use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use tracing::{debug, info, warn};

use super::{IncrementalLoader, LastSeen, LoadOptions, SessionLoader, parse_files};
use crate::models::{AgentType, ChatHistory};
use crate::parsers::parse_claude_session;
use crate::sync::cutoff::{file_modified_at, filter_by_mtime};
use crate::utils::validate_path_not_symlink;

/// Maximum number of project directories to scan (resource exhaustion guard)
const MAX_PROJECTS: usize = 10_000;

/// Maximum number of session files read from one project directory
const MAX_SESSIONS_PER_PROJECT: usize = 10_000;

/// Sub-agent sidechains are stored next to sessions but are not sessions
const SIDECHAIN_PREFIX: &str = "agent-";

/// Claude Code sessions under `<claude_dir>/projects/<encoded>/<session>.jsonl`
#[derive(Debug)]
pub struct ClaudeCodeLoader {
    claude_dir: PathBuf,
    last_seen: LastSeen,
}

impl ClaudeCodeLoader {
    pub fn new(claude_dir: impl Into<PathBuf>) -> Self {
        Self { claude_dir: claude_dir.into(), last_seen: LastSeen::default() }
    }

    fn projects_dir(&self) -> PathBuf {
        self.claude_dir.join("projects")
    }

    /// Find every session file, skipping symlinked directories and files
    ///
    /// # Errors
    ///
    /// Returns an error if the projects directory cannot be read or holds more
    /// than [`MAX_PROJECTS`] project directories. Unreadable project
    /// directories are logged and skipped.
    pub fn discover_session_files(&self) -> Result<Vec<PathBuf>> {
        let projects_dir = self.projects_dir();
        let entries = fs::read_dir(&projects_dir).with_context(|| {
            format!("Failed to read projects directory: {}", projects_dir.display())
        })?;

        let mut files = Vec::new();
        let mut project_count = 0;

        for entry in entries {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();

            if let Err(e) = validate_path_not_symlink(&path) {
                warn!(path = %path.display(), error = %e, "Skipping project directory");
                continue;
            }
            if !path.is_dir() {
                continue;
            }

            project_count += 1;
            if project_count > MAX_PROJECTS {
                bail!(
                    "Resource limit exceeded: Found more than {} projects in {}",
                    MAX_PROJECTS,
                    projects_dir.display()
                );
            }

            match session_files_in(&path) {
                Ok(found) => files.extend(found),
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to read project directory"),
            }
        }

        files.sort();
        Ok(files)
    }
}

fn session_files_in(project_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(project_dir)?.flatten() {
        let path = entry.path();
        let Some(name) = path.file_name().map(|n| n.to_string_lossy()) else {
            continue;
        };
        if !name.ends_with(".jsonl") || name.starts_with(SIDECHAIN_PREFIX) {
            continue;
        }
        if let Err(e) = validate_path_not_symlink(&path) {
            warn!(path = %path.display(), error = %e, "Skipping session file");
            continue;
        }
        if files.len() >= MAX_SESSIONS_PER_PROJECT {
            warn!(
                project = %project_dir.display(),
                limit = MAX_SESSIONS_PER_PROJECT,
                "Session limit reached, remaining files ignored"
            );
            break;
        }
        files.push(path);
    }
    Ok(files)
}

impl SessionLoader for ClaudeCodeLoader {
    fn agent_type(&self) -> AgentType {
        AgentType::ClaudeCode
    }

    fn name(&self) -> &str {
        "Claude Code"
    }

    fn is_available(&self) -> bool {
        self.projects_dir().is_dir()
    }

    fn read_history(&self, options: &LoadOptions) -> Result<Vec<ChatHistory>> {
        let cutoff = options.cutoff(Utc::now());
        let discovered = self.discover_session_files()?;
        let total = discovered.len();
        let files = filter_by_mtime(discovered, cutoff);

        for mtime in files.iter().filter_map(|path| file_modified_at(path)) {
            self.last_seen.observe(mtime);
        }
        debug!(total, selected = files.len(), "Claude Code session files");

        let sessions = parse_files(AgentType::ClaudeCode, &files, parse_claude_session);
        info!(sessions = sessions.len(), files = files.len(), "Loaded Claude Code sessions");
        Ok(sessions)
    }

    fn as_incremental(&self) -> Option<&dyn IncrementalLoader> {
        Some(self)
    }
}

impl IncrementalLoader for ClaudeCodeLoader {
    fn last_sync_timestamp(&self) -> Option<i64> {
        self.last_seen.get()
    }
}
