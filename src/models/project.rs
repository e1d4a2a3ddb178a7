use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::session::AgentType;

/// Per-project statistics, keyed by canonical path once aggregated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInfo {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub workspace_ids: Vec<String>,
    #[serde(default)]
    pub claude_code_session_count: u32,
    #[serde(default)]
    pub codex_session_count: u32,
    #[serde(default)]
    pub cursor_session_count: u32,
    #[serde(default)]
    pub gemini_session_count: u32,
    pub last_activity: DateTime<Utc>,
}

impl ProjectInfo {
    /// Empty entry for `path` with every counter at zero.
    pub fn new(name: impl Into<String>, path: impl Into<String>, last_activity: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            workspace_ids: Vec::new(),
            claude_code_session_count: 0,
            codex_session_count: 0,
            cursor_session_count: 0,
            gemini_session_count: 0,
            last_activity,
        }
    }

    pub fn session_count(&self, agent: AgentType) -> u32 {
        match agent {
            AgentType::ClaudeCode => self.claude_code_session_count,
            AgentType::Codex => self.codex_session_count,
            AgentType::Cursor => self.cursor_session_count,
            AgentType::Gemini => self.gemini_session_count,
        }
    }

    pub fn session_count_mut(&mut self, agent: AgentType) -> &mut u32 {
        match agent {
            AgentType::ClaudeCode => &mut self.claude_code_session_count,
            AgentType::Codex => &mut self.codex_session_count,
            AgentType::Cursor => &mut self.cursor_session_count,
            AgentType::Gemini => &mut self.gemini_session_count,
        }
    }

    pub fn total_sessions(&self) -> u32 {
        AgentType::ALL.iter().map(|a| self.session_count(*a)).sum()
    }

    pub fn add_workspace_id(&mut self, id: &str) {
        if !self.workspace_ids.iter().any(|w| w == id) {
            self.workspace_ids.push(id.to_string());
        }
    }
}
