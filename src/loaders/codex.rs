use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::{IncrementalLoader, LastSeen, LoadOptions, SessionLoader, parse_files};
use crate::models::{AgentType, ChatHistory};
use crate::parsers::parse_codex_session;
use crate::sync::cutoff::{file_modified_at, filter_by_mtime};

const ROLLOUT_PREFIX: &str = "rollout-";

/// `sessions/YYYY/MM/DD/rollout-*.jsonl`
const MAX_DEPTH: usize = 4;

/// Codex rollouts under `<codex_dir>/sessions`
#[derive(Debug)]
pub struct CodexLoader {
    codex_dir: PathBuf,
    last_seen: LastSeen,
}

impl CodexLoader {
    pub fn new(codex_dir: impl Into<PathBuf>) -> Self {
        Self { codex_dir: codex_dir.into(), last_seen: LastSeen::default() }
    }

    fn sessions_dir(&self) -> PathBuf {
        self.codex_dir.join("sessions")
    }

    /// Every rollout file below the sessions directory; symlinks are not followed
    pub fn discover_rollouts(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = WalkDir::new(self.sessions_dir())
            .follow_links(false)
            .max_depth(MAX_DEPTH)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable Codex directory entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| {
                let name = entry.file_name().to_string_lossy();
                name.starts_with(ROLLOUT_PREFIX) && name.ends_with(".jsonl")
            })
            .map(|entry| entry.into_path())
            .collect();
        files.sort();
        files
    }
}

impl SessionLoader for CodexLoader {
    fn agent_type(&self) -> AgentType {
        AgentType::Codex
    }

    fn name(&self) -> &str {
        "Codex"
    }

    fn is_available(&self) -> bool {
        self.sessions_dir().is_dir()
    }

    fn read_history(&self, options: &LoadOptions) -> Result<Vec<ChatHistory>> {
        let sessions_dir = self.sessions_dir();
        if !sessions_dir.is_dir() {
            anyhow::bail!("Codex sessions directory not found: {}", sessions_dir.display());
        }

        let discovered = self.discover_rollouts();
        let total = discovered.len();
        let files = filter_by_mtime(discovered, options.cutoff(Utc::now()));
        for mtime in files.iter().filter_map(|path| file_modified_at(path)) {
            self.last_seen.observe(mtime);
        }
        debug!(total, selected = files.len(), "Codex rollout files");

        let sessions = parse_files(AgentType::Codex, &files, parse_codex_session);
        info!(sessions = sessions.len(), files = files.len(), "Loaded Codex sessions");
        Ok(sessions)
    }

    fn as_incremental(&self) -> Option<&dyn IncrementalLoader> {
        Some(self)
    }
}

impl IncrementalLoader for CodexLoader {
    fn last_sync_timestamp(&self) -> Option<i64> {
        self.last_seen.get()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    const ROLLOUT: &str = r#"{"timestamp":"2026-01-06T12:00:00.000Z","type":"session_meta","payload":{"id":"s1","cwd":"/repo/app"}}
{"timestamp":"2026-01-06T12:00:01.000Z","type":"response_item","payload":{"type":"message","role":"user","content":[{"type":"input_text","text":"hello"}]}}"#;

    #[test]
    fn test_discovers_dated_rollouts() {
        let dir = TempDir::new().unwrap();
        let day = dir.path().join("sessions").join("2026").join("01").join("06");
        fs::create_dir_all(&day).unwrap();
        fs::write(day.join("rollout-2026-01-06T12-00-00-s1.jsonl"), ROLLOUT).unwrap();
        fs::write(day.join("other.jsonl"), ROLLOUT).unwrap();

        let loader = CodexLoader::new(dir.path());
        assert!(loader.is_available());
        assert_eq!(loader.discover_rollouts().len(), 1);

        let sessions = loader.read_history(&LoadOptions::default()).unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id, "rollout-2026-01-06T12-00-00-s1");
        assert_eq!(sessions[0].project_path(), Some("/repo/app"));
        assert!(loader.last_sync_timestamp().is_some());
    }

    #[test]
    fn test_missing_sessions_dir() {
        let dir = TempDir::new().unwrap();
        let loader = CodexLoader::new(dir.path());
        assert!(!loader.is_available());
        assert!(loader.read_history(&LoadOptions::default()).is_err());
    }
}
