//! Claude Code session files (`~/.claude/projects/<encoded>/<session>.jsonl`)
//!
//! Each line is one event. `user`/`assistant` events carry a `message` whose
//! content is either a plain string or a list of typed blocks; `summary`
//! events carry the conversation title. Everything else (snapshots, system
//! notices, progress) is ignored.

use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::jsonl::read_jsonl_file;
use super::markers::{extract_project_path, strip_reminders};
use super::{session_id_from_path, text_metadata};
use crate::models::{AgentType, ChatHistory, Message, Role, session_timestamp};
use crate::sync::cutoff::file_modified_at;

const EVENT_TYPE_USER: &str = "user";
const EVENT_TYPE_ASSISTANT: &str = "assistant";
const EVENT_TYPE_SUMMARY: &str = "summary";
const CONTENT_TYPE_TEXT: &str = "text";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClaudeEvent {
    message: ClaudeMessage,
    #[serde(default, deserialize_with = "super::deserializers::deserialize_optional_timestamp")]
    timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    cwd: Option<String>,
    #[serde(default)]
    is_meta: bool,
}

#[derive(Debug, Deserialize)]
struct ClaudeMessage {
    role: String,
    #[serde(default)]
    content: ClaudeContent,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ClaudeContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl Default for ClaudeContent {
    fn default() -> Self {
        ClaudeContent::Blocks(Vec::new())
    }
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
}

impl ClaudeContent {
    fn text_parts(&self) -> Vec<&str> {
        match self {
            ClaudeContent::Text(text) => vec![text.as_str()],
            ClaudeContent::Blocks(blocks) => blocks
                .iter()
                .filter(|b| b.block_type == CONTENT_TYPE_TEXT)
                .filter_map(|b| b.text.as_deref())
                .collect(),
        }
    }
}

/// Parse a Claude Code session file into a canonical session
///
/// Returns `Ok(None)` when the file holds no user or assistant text.
pub fn parse_claude_session(path: &Path) -> Result<Option<ChatHistory>> {
    let lines = read_jsonl_file(path)?;
    let id = session_id_from_path(path)?;
    Ok(parse_claude_events(&id, &lines.values, file_modified_at(path)))
}

/// Build a session from already-decoded event lines
///
/// `modified_at` is the session time when no event carries one.
pub fn parse_claude_events(
    id: &str,
    events: &[Value],
    modified_at: Option<DateTime<Utc>>,
) -> Option<ChatHistory> {
    let mut messages = Vec::new();
    let mut reminder_path: Option<String> = None;
    let mut cwd_path: Option<String> = None;
    let mut title: Option<String> = None;

    for (index, value) in events.iter().enumerate() {
        let event_type = value.get("type").and_then(Value::as_str).unwrap_or_default();

        if event_type == EVENT_TYPE_SUMMARY {
            if title.is_none() {
                title = value
                    .get("summary")
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string);
            }
            continue;
        }

        if event_type != EVENT_TYPE_USER && event_type != EVENT_TYPE_ASSISTANT {
            continue;
        }

        let event = match ClaudeEvent::deserialize(value) {
            Ok(event) => event,
            Err(e) => {
                warn!(session = id, event = index, error = %e, "Skipping malformed Claude event");
                continue;
            }
        };

        if cwd_path.is_none() {
            cwd_path = event.cwd.as_deref().and_then(crate::utils::canonical_project_path);
        }

        if event.is_meta {
            continue;
        }

        let Some(role) = Role::from_source(&event.message.role) else {
            continue;
        };

        let mut kept = Vec::new();
        for part in event.message.content.text_parts() {
            if reminder_path.is_none() {
                reminder_path = extract_project_path(part);
            }
            let cleaned = strip_reminders(part);
            if !cleaned.is_empty() {
                kept.push(cleaned);
            }
        }

        if let Some(message) = Message::text(role, kept.join("\n"), event.timestamp) {
            messages.push(message);
        }
    }

    if messages.is_empty() {
        debug!(session = id, "Dropping Claude session without text messages");
        return None;
    }

    let project_path = reminder_path.or(cwd_path);
    Some(ChatHistory {
        id: id.to_string(),
        timestamp: session_timestamp(&messages, modified_at),
        messages,
        agent_type: AgentType::ClaudeCode,
        metadata: Some(text_metadata(AgentType::ClaudeCode, project_path, title, None)),
    })
}
