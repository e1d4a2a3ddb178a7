use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{debug, info, warn};

use super::{LoadOptions, SessionLoader, parse_files};
use crate::models::{AgentType, ChatHistory};
use crate::parsers::parse_gemini_session;
use crate::sync::cutoff::filter_by_mtime;
use crate::utils::validate_path_not_symlink;

const SESSION_PREFIX: &str = "session-";

/// Gemini CLI checkpoints under `<gemini_dir>/tmp/<projectHash>/chats`
///
/// Gemini has no resumable cursor; only an explicit `since` or the lookback
/// window narrows a read.
#[derive(Debug)]
pub struct GeminiLoader {
    gemini_dir: PathBuf,
}

impl GeminiLoader {
    pub fn new(gemini_dir: impl Into<PathBuf>) -> Self {
        Self { gemini_dir: gemini_dir.into() }
    }

    fn tmp_dir(&self) -> PathBuf {
        self.gemini_dir.join("tmp")
    }

    /// Every `session-*.json` in each project hash's `chats` directory
    pub fn discover_session_files(&self) -> Result<Vec<PathBuf>> {
        let tmp_dir = self.tmp_dir();
        let entries = fs::read_dir(&tmp_dir)
            .with_context(|| format!("Failed to read Gemini directory: {}", tmp_dir.display()))?;

        let mut files = Vec::new();
        for entry in entries.flatten() {
            let chats = entry.path().join("chats");
            if validate_path_not_symlink(&entry.path()).is_err() || !chats.is_dir() {
                continue;
            }
            match chat_files_in(&chats) {
                Ok(found) => files.extend(found),
                Err(e) => warn!(path = %chats.display(), error = %e, "Failed to read Gemini chats"),
            }
        }
        files.sort();
        Ok(files)
    }
}

fn chat_files_in(chats: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(chats)?.flatten() {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.starts_with(SESSION_PREFIX) || !name.ends_with(".json") {
            continue;
        }
        if validate_path_not_symlink(&path).is_ok() {
            files.push(path);
        }
    }
    Ok(files)
}

impl SessionLoader for GeminiLoader {
    fn agent_type(&self) -> AgentType {
        AgentType::Gemini
    }

    fn name(&self) -> &str {
        "Gemini CLI"
    }

    fn is_available(&self) -> bool {
        self.tmp_dir().is_dir()
    }

    fn read_history(&self, options: &LoadOptions) -> Result<Vec<ChatHistory>> {
        let discovered = self.discover_session_files()?;
        let total = discovered.len();
        let files = filter_by_mtime(discovered, options.cutoff(Utc::now()));
        debug!(total, selected = files.len(), "Gemini session files");

        let sessions = parse_files(AgentType::Gemini, &files, parse_gemini_session);
        info!(sessions = sessions.len(), files = files.len(), "Loaded Gemini sessions");
        Ok(sessions)
    }
}
