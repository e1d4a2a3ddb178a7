//! Codex rollout files (`~/.codex/sessions/YYYY/MM/DD/rollout-*.jsonl`)
//!
//! Current rollouts wrap every line in `{timestamp, type, payload}`:
//! `session_meta` and `turn_context` carry the working directory,
//! `response_item` with `payload.type == "message"` carries the turns. Older
//! rollouts write the items unwrapped; both layouts are accepted.
//!
//! Codex injects `<environment_context>` and `<user_instructions>` blocks as
//! user turns. They are stripped, though the `<cwd>` inside the environment
//! block is used when no other working directory is known.

use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::deserializers::timestamp_from_value;
use super::jsonl::read_jsonl_file;
use super::markers::{extract_project_path, extract_tag_value, strip_reminders, strip_tagged_blocks};
use super::{session_id_from_path, text_metadata};
use crate::models::{AgentType, ChatHistory, Message, Role, session_timestamp};
use crate::sync::cutoff::file_modified_at;
use crate::utils::canonical_project_path;

const LINE_SESSION_META: &str = "session_meta";
const LINE_TURN_CONTEXT: &str = "turn_context";
const LINE_RESPONSE_ITEM: &str = "response_item";
const ITEM_MESSAGE: &str = "message";

const ENVIRONMENT_CONTEXT_TAG: &str = "environment_context";
const USER_INSTRUCTIONS_TAG: &str = "user_instructions";

const TEXT_PART_TYPES: [&str; 3] = ["input_text", "output_text", "text"];

#[derive(Debug, Deserialize)]
struct CodexMessageItem {
    role: String,
    #[serde(default)]
    content: Vec<CodexContentPart>,
}

#[derive(Debug, Deserialize)]
struct CodexContentPart {
    #[serde(rename = "type")]
    part_type: String,
    #[serde(default)]
    text: Option<String>,
}

/// Parse a Codex rollout file into a canonical session
pub fn parse_codex_session(path: &Path) -> Result<Option<ChatHistory>> {
    let lines = read_jsonl_file(path)?;
    let id = session_id_from_path(path)?;
    Ok(parse_codex_lines(&id, &lines.values, file_modified_at(path)))
}

/// Build a session from already-decoded rollout lines
pub fn parse_codex_lines(
    id: &str,
    lines: &[Value],
    modified_at: Option<DateTime<Utc>>,
) -> Option<ChatHistory> {
    let mut messages = Vec::new();
    let mut meta_cwd: Option<String> = None;
    let mut reminder_path: Option<String> = None;
    let mut environment_cwd: Option<String> = None;
    let mut session_start: Option<DateTime<Utc>> = None;
    let mut codex_session_id: Option<String> = None;

    for (index, line) in lines.iter().enumerate() {
        let line_time = line.get("timestamp").and_then(timestamp_from_value);

        // Unwrapped legacy items are their own payload
        let (line_type, payload) = match line.get("payload") {
            Some(payload) => (line.get("type").and_then(Value::as_str).unwrap_or_default(), payload),
            None => (LINE_RESPONSE_ITEM, line),
        };

        match line_type {
            LINE_SESSION_META => {
                if meta_cwd.is_none() {
                    meta_cwd = payload.get("cwd").and_then(Value::as_str).and_then(canonical_project_path);
                }
                if codex_session_id.is_none() {
                    codex_session_id = payload.get("id").and_then(Value::as_str).map(str::to_string);
                }
                if session_start.is_none() {
                    session_start = payload.get("timestamp").and_then(timestamp_from_value).or(line_time);
                }
            }
            LINE_TURN_CONTEXT => {
                if meta_cwd.is_none() {
                    meta_cwd = payload.get("cwd").and_then(Value::as_str).and_then(canonical_project_path);
                }
            }
            LINE_RESPONSE_ITEM => {
                if payload.get("type").and_then(Value::as_str) != Some(ITEM_MESSAGE) {
                    continue;
                }
                let item = match CodexMessageItem::deserialize(payload) {
                    Ok(item) => item,
                    Err(e) => {
                        warn!(session = id, line = index + 1, error = %e, "Skipping malformed Codex message");
                        continue;
                    }
                };
                let Some(role) = Role::from_source(&item.role) else {
                    continue;
                };

                let mut kept = Vec::new();
                for part in item.content.iter().filter(|p| TEXT_PART_TYPES.contains(&p.part_type.as_str())) {
                    let Some(text) = part.text.as_deref() else {
                        continue;
                    };
                    if reminder_path.is_none() {
                        reminder_path = extract_project_path(text);
                    }
                    if environment_cwd.is_none() {
                        environment_cwd =
                            extract_tag_value(text, "cwd").as_deref().and_then(canonical_project_path);
                    }
                    let cleaned = strip_reminders(&strip_tagged_blocks(
                        &strip_tagged_blocks(text, ENVIRONMENT_CONTEXT_TAG),
                        USER_INSTRUCTIONS_TAG,
                    ));
                    if !cleaned.is_empty() {
                        kept.push(cleaned);
                    }
                }

                if let Some(message) = Message::text(role, kept.join("\n"), line_time) {
                    messages.push(message);
                }
            }
            _ => {}
        }
    }

    if messages.is_empty() {
        debug!(session = id, "Dropping Codex session without text messages");
        return None;
    }

    let project_path = reminder_path.or(meta_cwd).or(environment_cwd);
    let mut metadata = text_metadata(AgentType::Codex, project_path, None, None);
    if let Some(codex_id) = codex_session_id {
        metadata.extra.insert("codexSessionId".to_string(), Value::String(codex_id));
    }

    Some(ChatHistory {
        id: id.to_string(),
        timestamp: session_timestamp(&messages, session_start.or(modified_at)),
        messages,
        agent_type: AgentType::Codex,
        metadata: Some(metadata),
    })
}
