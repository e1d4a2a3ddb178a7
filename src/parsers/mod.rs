//! Per-source transcript parsers
//!
//! # Error Handling Strategy
//!
//! Parsers follow a **graceful degradation** approach:
//!
//! - **Unit-level failures**: a line, message or row that fails to deserialize is
//!   logged with `tracing::warn!` and skipped. It never aborts the rest of the
//!   session.
//!
//! - **Read failures**: a file that cannot be opened or a database row that
//!   cannot be read is returned as an `anyhow::Error`. Loaders log it and the
//!   unit contributes zero sessions.
//!
//! - **Empty sessions**: a unit without any retained user/assistant text yields
//!   `None`. That is not an error.
//!
//! Parsers are pure with respect to their input, so parsing the same unit twice
//! produces identical records.

use std::path::Path;

use anyhow::{Context, Result};

use crate::models::{AgentType, SessionMetadata};
use crate::utils::project_name_from_path;

pub mod claude_code;
pub mod codex;
pub mod cursor;
pub mod deserializers;
pub mod gemini;
pub mod jsonl;
pub mod markers;

pub use claude_code::parse_claude_session;
pub use codex::parse_codex_session;
pub use cursor::{ComposerData, CursorWorkspace, parse_cursor_composer};
pub use gemini::parse_gemini_session;

/// Session id of a file-backed unit: its filename stem
pub(crate) fn session_id_from_path(path: &Path) -> Result<String> {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .with_context(|| format!("Session file has no name: {}", path.display()))
}

/// Metadata shared by every source: project path and its derived name, title,
/// workspace and source tag
pub(crate) fn text_metadata(
    agent: AgentType,
    project_path: Option<String>,
    conversation_name: Option<String>,
    workspace_id: Option<String>,
) -> SessionMetadata {
    SessionMetadata {
        project_name: project_path.as_deref().map(project_name_from_path),
        project_path,
        conversation_name,
        workspace_id,
        source: Some(agent.as_str().to_string()),
        ..Default::default()
    }
}
