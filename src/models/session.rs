use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One tag per coding-assistant family.
///
/// The derived ordering is the canonical source order used wherever results
/// from several sources are folded together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentType {
    ClaudeCode,
    Codex,
    Cursor,
    Gemini,
}

impl AgentType {
    pub const ALL: [AgentType; 4] =
        [AgentType::ClaudeCode, AgentType::Codex, AgentType::Cursor, AgentType::Gemini];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentType::ClaudeCode => "claude_code",
            AgentType::Codex => "codex",
            AgentType::Cursor => "cursor",
            AgentType::Gemini => "gemini",
        }
    }
}

impl fmt::Display for AgentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for AgentType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "claude_code" | "claude" => Ok(AgentType::ClaudeCode),
            "codex" => Ok(AgentType::Codex),
            "cursor" => Ok(AgentType::Cursor),
            "gemini" => Ok(AgentType::Gemini),
            other => anyhow::bail!("Unknown agent type: {}", other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Maps a source role string onto a retained role; every other role is dropped.
    pub fn from_source(role: &str) -> Option<Self> {
        match role {
            "user" | "human" => Some(Role::User),
            "assistant" | "model" | "gemini" => Some(Role::Assistant),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub display: String,
    #[serde(default)]
    pub pasted_contents: BTreeMap<String, Value>,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Message {
    /// Builds a message from already-cleaned text. Returns `None` for blank text.
    pub fn text(role: Role, display: impl Into<String>, timestamp: Option<DateTime<Utc>>) -> Option<Self> {
        let display = display.into();
        if display.trim().is_empty() {
            return None;
        }
        Some(Self { display, pasted_contents: BTreeMap::new(), role, timestamp })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

/// Canonical session record shared by every source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatHistory {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub messages: Vec<Message>,
    pub agent_type: AgentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<SessionMetadata>,
}

impl ChatHistory {
    pub fn project_path(&self) -> Option<&str> {
        self.metadata.as_ref().and_then(|m| m.project_path.as_deref())
    }

    pub fn workspace_id(&self) -> Option<&str> {
        self.metadata.as_ref().and_then(|m| m.workspace_id.as_deref())
    }
}

/// Session timestamp: newest message time, then first message time, then the
/// source-provided fallback, then now.
pub fn session_timestamp(messages: &[Message], fallback: Option<DateTime<Utc>>) -> DateTime<Utc> {
    messages
        .iter()
        .filter_map(|m| m.timestamp)
        .max()
        .or_else(|| messages.first().and_then(|m| m.timestamp))
        .or(fallback)
        .unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(ms: i64) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(ms)
    }

    #[test]
    fn test_agent_type_round_trips_through_str() {
        for agent in AgentType::ALL {
            assert_eq!(agent.as_str().parse::<AgentType>().unwrap(), agent);
        }
        assert_eq!("claude-code".parse::<AgentType>().unwrap(), AgentType::ClaudeCode);
        assert!("copilot".parse::<AgentType>().is_err());
    }

    #[test]
    fn test_role_from_source_drops_other_roles() {
        assert_eq!(Role::from_source("user"), Some(Role::User));
        assert_eq!(Role::from_source("gemini"), Some(Role::Assistant));
        assert_eq!(Role::from_source("system"), None);
        assert_eq!(Role::from_source("developer"), None);
        assert_eq!(Role::from_source("tool"), None);
    }

    #[test]
    fn test_message_text_rejects_blank() {
        assert!(Message::text(Role::User, "   \n", None).is_none());
        assert!(Message::text(Role::User, "hi", None).is_some());
    }

    #[test]
    fn test_session_timestamp_prefers_newest_message() {
        let messages = vec![
            Message::text(Role::User, "a", ts(1_000)).unwrap(),
            Message::text(Role::Assistant, "b", ts(3_000)).unwrap(),
            Message::text(Role::User, "c", None).unwrap(),
        ];
        assert_eq!(session_timestamp(&messages, ts(9_000)), ts(3_000).unwrap());
    }

    #[test]
    fn test_session_timestamp_uses_fallback_without_message_times() {
        let messages = vec![Message::text(Role::User, "a", None).unwrap()];
        assert_eq!(session_timestamp(&messages, ts(9_000)), ts(9_000).unwrap());
    }

    #[test]
    fn test_chat_history_serializes_camel_case() {
        let history = ChatHistory {
            id: "abc".to_string(),
            timestamp: ts(1_700_000_000_000).unwrap(),
            messages: vec![Message::text(Role::User, "hello", None).unwrap()],
            agent_type: AgentType::ClaudeCode,
            metadata: Some(SessionMetadata {
                project_path: Some("/tmp/p".to_string()),
                ..Default::default()
            }),
        };
        let json = serde_json::to_string(&history).unwrap();
        assert!(json.contains(r#""agentType":"claude_code""#));
        assert!(json.contains(r#""pastedContents":{}"#));
        assert!(json.contains(r#""projectPath":"/tmp/p""#));
    }
}
