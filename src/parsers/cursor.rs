//! Cursor composer conversations
//!
//! Cursor keeps chats in a SQLite key-value table. A composer row
//! (`composerData:<composerId>`) lists its bubbles in order through
//! `fullConversationHeadersOnly`; each bubble body lives in its own row
//! (`bubbleId:<composerId>:<bubbleId>`). Older composers inline the bubbles
//! in a `conversation` array instead.
//!
//! This module only turns already-fetched rows into a session. Database access
//! lives in the Cursor loader.

use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use super::deserializers::timestamp_from_value;
use super::markers::{extract_project_path, strip_reminders};
use super::text_metadata;
use crate::models::{AgentType, ChatHistory, Message, Role, session_timestamp};
use crate::utils::canonical_project_path;

const BUBBLE_TYPE_USER: i64 = 1;
const BUBBLE_TYPE_ASSISTANT: i64 = 2;

/// Workspace a composer was opened in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorWorkspace {
    pub id: String,
    /// Local folder of the workspace; `None` for remote or folderless workspaces
    pub folder_path: Option<String>,
}

/// Decoded `composerData:<composerId>` row
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposerData {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    created_at: Option<Value>,
    #[serde(default)]
    last_updated_at: Option<Value>,
    #[serde(default)]
    full_conversation_headers_only: Vec<BubbleHeader>,
    #[serde(default)]
    conversation: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BubbleHeader {
    bubble_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Bubble {
    #[serde(rename = "type")]
    bubble_type: i64,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    created_at: Option<Value>,
}

impl Bubble {
    fn role(&self) -> Option<Role> {
        match self.bubble_type {
            BUBBLE_TYPE_USER => Some(Role::User),
            BUBBLE_TYPE_ASSISTANT => Some(Role::Assistant),
            _ => None,
        }
    }
}

/// Deterministic session id for a composer
pub fn composer_session_id(composer_id: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("cursor:composer:{}", composer_id).as_bytes())
        .to_string()
}

impl ComposerData {
    /// Decode a composer row
    ///
    /// # Errors
    ///
    /// Returns an error if the row is not valid composer JSON.
    pub fn parse(composer_id: &str, composer_json: &str) -> Result<Self> {
        serde_json::from_str(composer_json)
            .with_context(|| format!("Failed to parse composer data for {}", composer_id))
    }

    /// Activity recorded on the composer row itself
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.last_updated_at
            .as_ref()
            .and_then(timestamp_from_value)
            .or_else(|| self.created_at.as_ref().and_then(timestamp_from_value))
    }

    /// Most recent activity on the composer, used as the unit's modification
    /// time
    ///
    /// Falls back to the newest bubble `createdAt` when the row carries no
    /// timestamps of its own.
    pub fn activity(&self, bubbles: &HashMap<String, Value>) -> Option<DateTime<Utc>> {
        self.updated_at().or_else(|| {
            bubbles
                .values()
                .chain(self.conversation.iter())
                .filter_map(|bubble| bubble.get("createdAt").and_then(timestamp_from_value))
                .max()
        })
    }
}

/// Build a session from a composer row and its bubble rows
///
/// `bubbles` maps bubble id to the decoded bubble body. Bubbles listed in the
/// composer header but missing from the map are skipped. Returns `None` when
/// no user or assistant text survives.
pub fn parse_cursor_composer(
    composer_id: &str,
    composer: &ComposerData,
    bubbles: &HashMap<String, Value>,
    workspace: Option<&CursorWorkspace>,
) -> Option<ChatHistory> {

    let ordered: Vec<&Value> = if composer.full_conversation_headers_only.is_empty() {
        composer.conversation.iter().collect()
    } else {
        composer
            .full_conversation_headers_only
            .iter()
            .filter_map(|header| {
                let bubble = bubbles.get(&header.bubble_id);
                if bubble.is_none() {
                    debug!(composer = composer_id, bubble = %header.bubble_id, "Bubble row missing");
                }
                bubble
            })
            .collect()
    };

    let mut messages = Vec::new();
    let mut reminder_path: Option<String> = None;

    for raw in ordered {
        let bubble = match Bubble::deserialize(raw) {
            Ok(bubble) => bubble,
            Err(e) => {
                warn!(composer = composer_id, error = %e, "Skipping malformed Cursor bubble");
                continue;
            }
        };
        let Some(role) = bubble.role() else {
            continue;
        };
        let Some(text) = bubble.text.as_deref() else {
            continue;
        };

        if reminder_path.is_none() {
            reminder_path = extract_project_path(text);
        }
        let timestamp = bubble.created_at.as_ref().and_then(timestamp_from_value);
        if let Some(message) = Message::text(role, strip_reminders(text), timestamp) {
            messages.push(message);
        }
    }

    if messages.is_empty() {
        debug!(composer = composer_id, "Dropping Cursor composer without text messages");
        return None;
    }

    let folder_path = workspace
        .and_then(|w| w.folder_path.as_deref())
        .and_then(canonical_project_path);
    let project_path = reminder_path.or(folder_path);
    let title = composer
        .name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let mut metadata =
        text_metadata(AgentType::Cursor, project_path, title, workspace.map(|w| w.id.clone()));
    metadata
        .extra
        .insert("composerId".to_string(), Value::String(composer_id.to_string()));

    Some(ChatHistory {
        id: composer_session_id(composer_id),
        timestamp: session_timestamp(&messages, composer.updated_at()),
        messages,
        agent_type: AgentType::Cursor,
        metadata: Some(metadata),
    })
}
