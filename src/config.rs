//! Run configuration
//!
//! The CLI builds a [`SyncConfig`] from flags with environment fallbacks; the
//! library takes it as a plain value.

use std::path::PathBuf;

use anyhow::Result;

use crate::error::SyncError;
use crate::models::AgentType;
use crate::sync::cutoff::LoadOptions;
use crate::utils::{
    get_claude_dir, get_codex_dir, get_cursor_user_dir, get_default_state_dir, get_gemini_dir,
};

pub const STATE_FILE_NAME: &str = "sync-state.json";
pub const DEFAULT_USER_ID: &str = "local";

/// Root directory of each source's local data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePaths {
    pub claude_dir: PathBuf,
    pub codex_dir: PathBuf,
    pub cursor_user_dir: PathBuf,
    pub gemini_dir: PathBuf,
}

impl SourcePaths {
    /// Resolve every source directory from its environment override or the
    /// platform default
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            claude_dir: get_claude_dir()?,
            codex_dir: get_codex_dir()?,
            cursor_user_dir: get_cursor_user_dir()?,
            gemini_dir: get_gemini_dir()?,
        })
    }

    /// Layout used when every source lives below one home directory, as on Linux
    pub fn under_home(home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        Self {
            claude_dir: home.join(".claude"),
            codex_dir: home.join(".codex"),
            cursor_user_dir: home.join(".config").join("Cursor").join("User"),
            gemini_dir: home.join(".gemini"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub lookback_days: Option<u32>,
    /// Explicit cutoff in Unix milliseconds
    pub since: Option<i64>,
    pub state_dir: PathBuf,
    pub output_dir: PathBuf,
    pub user_id: String,
    /// Restrict the run to these sources; `None` means every registered source
    pub sources: Option<Vec<AgentType>>,
    pub paths: SourcePaths,
}

impl SyncConfig {
    /// Configuration with platform defaults and no cutoff
    pub fn from_env() -> Result<Self> {
        let state_dir = get_default_state_dir()?;
        Ok(Self::with_state_dir(state_dir, SourcePaths::from_env()?))
    }

    pub fn with_state_dir(state_dir: impl Into<PathBuf>, paths: SourcePaths) -> Self {
        let state_dir = state_dir.into();
        Self {
            lookback_days: None,
            since: None,
            output_dir: state_dir.join("sessions"),
            state_dir,
            user_id: DEFAULT_USER_ID.to_string(),
            sources: None,
            paths,
        }
    }

    pub fn state_file(&self) -> PathBuf {
        self.state_dir.join(STATE_FILE_NAME)
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions { since_timestamp: self.since, lookback_days: self.lookback_days }
    }

    pub fn includes(&self, agent: AgentType) -> bool {
        self.sources.as_ref().is_none_or(|sources| sources.contains(&agent))
    }

    /// Reject values no run can use
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.user_id.trim().is_empty() {
            return Err(SyncError::Config("user id must not be empty".to_string()));
        }
        if self.since.is_some_and(|since| since < 0) {
            return Err(SyncError::Config("--since must be a non-negative Unix time in milliseconds".to_string()));
        }
        if self.sources.as_ref().is_some_and(Vec::is_empty) {
            return Err(SyncError::Config("no sources selected".to_string()));
        }
        Ok(())
    }
}
