//! Gemini CLI checkpoints (`~/.gemini/tmp/<projectHash>/chats/session-*.json`)
//!
//! Unlike the JSONL sources a Gemini session is one JSON document. Messages
//! are still treated as independent units: a message that fails to
//! deserialize is skipped and the rest of the document is kept.

use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::deserializers::timestamp_from_value;
use super::markers::{extract_project_path, strip_reminders};
use super::{session_id_from_path, text_metadata};
use crate::models::{AgentType, ChatHistory, Message, Role, session_timestamp};
use crate::sync::cutoff::file_modified_at;
use crate::utils::safe_open_file;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiMessage {
    #[serde(rename = "type")]
    message_type: String,
    #[serde(default)]
    content: GeminiContent,
    #[serde(default, deserialize_with = "super::deserializers::deserialize_optional_timestamp")]
    timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GeminiContent {
    Text(String),
    Parts(Vec<GeminiPart>),
}

impl Default for GeminiContent {
    fn default() -> Self {
        GeminiContent::Parts(Vec::new())
    }
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: Option<String>,
}

impl GeminiContent {
    fn text_parts(&self) -> Vec<&str> {
        match self {
            GeminiContent::Text(text) => vec![text.as_str()],
            GeminiContent::Parts(parts) => parts.iter().filter_map(|p| p.text.as_deref()).collect(),
        }
    }
}

/// Parse a Gemini CLI session document into a canonical session
pub fn parse_gemini_session(path: &Path) -> Result<Option<ChatHistory>> {
    let file = safe_open_file(path)?;
    let document: Value = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse Gemini session: {}", path.display()))?;
    let id = session_id_from_path(path)?;
    Ok(parse_gemini_document(&id, &document, file_modified_at(path)))
}

/// Build a session from an already-decoded session document
pub fn parse_gemini_document(
    id: &str,
    document: &Value,
    modified_at: Option<DateTime<Utc>>,
) -> Option<ChatHistory> {
    let raw_messages = document.get("messages").and_then(Value::as_array)?;

    let mut messages = Vec::new();
    let mut reminder_path: Option<String> = None;

    for (index, raw) in raw_messages.iter().enumerate() {
        let message = match GeminiMessage::deserialize(raw) {
            Ok(message) => message,
            Err(e) => {
                warn!(session = id, message = index, error = %e, "Skipping malformed Gemini message");
                continue;
            }
        };
        // info and error entries are CLI notices
        let Some(role) = Role::from_source(&message.message_type) else {
            continue;
        };

        let mut kept = Vec::new();
        for part in message.content.text_parts() {
            if reminder_path.is_none() {
                reminder_path = extract_project_path(part);
            }
            let cleaned = strip_reminders(part);
            if !cleaned.is_empty() {
                kept.push(cleaned);
            }
        }

        if let Some(message) = Message::text(role, kept.join("\n"), message.timestamp) {
            messages.push(message);
        }
    }

    if messages.is_empty() {
        debug!(session = id, "Dropping Gemini session without text messages");
        return None;
    }

    let fallback = document
        .get("lastUpdated")
        .and_then(timestamp_from_value)
        .or_else(|| document.get("startTime").and_then(timestamp_from_value));
    let project_hash = document.get("projectHash").and_then(Value::as_str).map(str::to_string);

    let mut metadata = text_metadata(AgentType::Gemini, reminder_path, None, project_hash);
    if let Some(gemini_id) = document.get("sessionId").and_then(Value::as_str) {
        metadata
            .extra
            .insert("geminiSessionId".to_string(), Value::String(gemini_id.to_string()));
    }

    Some(ChatHistory {
        id: id.to_string(),
        timestamp: session_timestamp(&messages, fallback.or(modified_at)),
        messages,
        agent_type: AgentType::Gemini,
        metadata: Some(metadata),
    })
}
