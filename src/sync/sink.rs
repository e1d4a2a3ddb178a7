//! Downstream persistence of synchronized sessions

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::SinkError;
use crate::models::ChatHistory;

/// Destination for sessions produced by a sync run
///
/// Implementations must be idempotent: persisting the same session twice
/// leaves the destination as if it had been persisted once.
pub trait SessionSink: Send + Sync {
    fn persist(&self, session: &ChatHistory, user_id: &str) -> Result<(), SinkError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StoredSession<'a> {
    user_id: &'a str,
    session: &'a ChatHistory,
}

/// Writes each session to `<dir>/<agent>/<id>.json`
#[derive(Debug, Clone)]
pub struct JsonDirSink {
    dir: PathBuf,
}

impl JsonDirSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File a session is stored in
    pub fn session_path(&self, session: &ChatHistory) -> Result<PathBuf, SinkError> {
        validate_session_id(&session.id)?;
        Ok(self.dir.join(session.agent_type.as_str()).join(format!("{}.json", session.id)))
    }
}

/// Session ids become file names; anything that could escape the directory is refused
fn validate_session_id(id: &str) -> Result<(), SinkError> {
    let invalid = id.is_empty()
        || id.starts_with('.')
        || id.contains(['/', '\\', '\0'])
        || id.chars().any(char::is_control);
    if invalid {
        return Err(SinkError::InvalidSessionId(id.to_string()));
    }
    Ok(())
}

impl SessionSink for JsonDirSink {
    fn persist(&self, session: &ChatHistory, user_id: &str) -> Result<(), SinkError> {
        let path = self.session_path(session)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(&StoredSession { user_id, session })?;
        let temp = path.with_extension("json.tmp");
        fs::write(&temp, json)?;
        fs::rename(&temp, &path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;
    use tempfile::TempDir;

    use super::*;
    use crate::models::{AgentType, Message, Role};

    fn session(id: &str) -> ChatHistory {
        ChatHistory {
            id: id.to_string(),
            timestamp: DateTime::from_timestamp_millis(1_000).unwrap(),
            messages: vec![Message::text(Role::User, "hello", None).unwrap()],
            agent_type: AgentType::Codex,
            metadata: None,
        }
    }

    #[test]
    fn test_persist_writes_under_agent_dir() {
        let dir = TempDir::new().unwrap();
        let sink = JsonDirSink::new(dir.path());
        sink.persist(&session("rollout-1"), "u1").unwrap();

        let path = dir.path().join("codex").join("rollout-1.json");
        let stored: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(stored["userId"], "u1");
        assert_eq!(stored["session"]["id"], "rollout-1");
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_persist_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let sink = JsonDirSink::new(dir.path());
        sink.persist(&session("s"), "u").unwrap();
        let first = fs::read(dir.path().join("codex").join("s.json")).unwrap();
        sink.persist(&session("s"), "u").unwrap();
        let second = fs::read(dir.path().join("codex").join("s.json")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_rejects_escaping_ids() {
        let dir = TempDir::new().unwrap();
        let sink = JsonDirSink::new(dir.path());
        for id in ["", "../x", "a/b", ".hidden", "a\\b"] {
            assert!(matches!(sink.persist(&session(id), "u"), Err(SinkError::InvalidSessionId(_))));
        }
    }
}
