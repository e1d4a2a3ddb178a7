//! Cursor chat state in SQLite
//!
//! Layout under the Cursor user directory:
//!
//! ```text
//! globalStorage/state.vscdb            cursorDiskKV: composerData:*, bubbleId:*:*
//! workspaceStorage/<id>/state.vscdb    ItemTable: composer.composerData
//! workspaceStorage/<id>/workspace.json {"folder": "file:///..."}
//! ```
//!
//! Every database is opened read-only; Cursor may be running and writing.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, OptionalExtension, Row};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{DatabaseLoader, IncrementalLoader, LastSeen, LoadOptions, SessionLoader, sort_sessions};
use crate::models::{AgentType, ChatHistory};
use crate::parsers::{ComposerData, CursorWorkspace, parse_cursor_composer};
use crate::sync::cutoff::is_included;
use crate::utils::{decode_file_uri, validate_path_not_symlink};

const STATE_DB: &str = "state.vscdb";
const COMPOSER_KEY_PREFIX: &str = "composerData:";
const BUBBLE_KEY_PREFIX: &str = "bubbleId:";
const WORKSPACE_COMPOSERS_KEY: &str = "composer.composerData";

const BUSY_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkspaceComposers {
    #[serde(default)]
    all_composers: Vec<WorkspaceComposerRef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkspaceComposerRef {
    composer_id: String,
}

#[derive(Debug, Deserialize)]
struct WorkspaceFile {
    #[serde(default)]
    folder: Option<String>,
}

/// Cursor composer conversations from the global state database
#[derive(Debug)]
pub struct CursorLoader {
    user_dir: PathBuf,
    global_db: PathBuf,
    last_seen: LastSeen,
}

impl CursorLoader {
    pub fn new(user_dir: impl Into<PathBuf>) -> Self {
        let user_dir = user_dir.into();
        let global_db = user_dir.join("globalStorage").join(STATE_DB);
        Self { user_dir, global_db, last_seen: LastSeen::default() }
    }

    /// Map every composer id to the workspace it was opened in
    ///
    /// Workspaces whose database or `workspace.json` cannot be read are
    /// skipped; their composers simply carry no workspace.
    pub fn workspace_index(&self) -> HashMap<String, CursorWorkspace> {
        let storage = self.user_dir.join("workspaceStorage");
        let mut index = HashMap::new();

        let Ok(entries) = fs::read_dir(&storage) else {
            debug!(path = %storage.display(), "No Cursor workspace storage");
            return index;
        };

        for entry in entries.flatten() {
            let dir = entry.path();
            if validate_path_not_symlink(&dir).is_err() || !dir.is_dir() {
                continue;
            }
            let id = entry.file_name().to_string_lossy().into_owned();
            let db_path = dir.join(STATE_DB);
            if !db_path.is_file() {
                continue;
            }

            let composer_ids = match workspace_composer_ids(&db_path) {
                Ok(ids) => ids,
                Err(e) => {
                    warn!(workspace = %id, error = %e, "Skipping unreadable Cursor workspace");
                    continue;
                }
            };
            if composer_ids.is_empty() {
                continue;
            }

            let workspace = CursorWorkspace { folder_path: workspace_folder(&dir), id };
            for composer_id in composer_ids {
                index.entry(composer_id).or_insert_with(|| workspace.clone());
            }
        }

        index
    }
}

fn open_read_only(path: &Path) -> Result<Connection> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .with_context(|| format!("Failed to open Cursor database: {}", path.display()))?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.execute_batch("PRAGMA query_only = ON;")?;
    Ok(conn)
}

/// Column text whether the value was stored as TEXT or BLOB
fn text_column(row: &Row<'_>, index: usize) -> rusqlite::Result<Option<String>> {
    Ok(match row.get_ref(index)? {
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => String::from_utf8(bytes.to_vec()).ok(),
        _ => None,
    })
}

fn workspace_composer_ids(db_path: &Path) -> Result<Vec<String>> {
    let conn = open_read_only(db_path)?;
    let raw: Option<Option<String>> = conn
        .query_row(
            "SELECT value FROM ItemTable WHERE key = ?1",
            [WORKSPACE_COMPOSERS_KEY],
            |row| text_column(row, 0),
        )
        .optional()?;

    let Some(raw) = raw.flatten() else {
        return Ok(Vec::new());
    };
    let composers: WorkspaceComposers =
        serde_json::from_str(&raw).context("Failed to parse workspace composer list")?;
    Ok(composers.all_composers.into_iter().map(|c| c.composer_id).collect())
}

/// Local folder of a workspace; remote and multi-root workspaces have none
fn workspace_folder(dir: &Path) -> Option<String> {
    let raw = fs::read_to_string(dir.join("workspace.json")).ok()?;
    let file: WorkspaceFile = serde_json::from_str(&raw).ok()?;
    let path = decode_file_uri(file.folder.as_deref()?)?;
    Some(path.to_string_lossy().into_owned())
}

fn load_bubbles(conn: &Connection, composer_id: &str) -> Result<HashMap<String, Value>> {
    let prefix = format!("{}{}:", BUBBLE_KEY_PREFIX, composer_id);
    let mut stmt = conn.prepare_cached("SELECT key, value FROM cursorDiskKV WHERE key LIKE ?1")?;
    let rows = stmt.query_map([format!("{}%", prefix)], |row| {
        Ok((row.get::<_, String>(0)?, text_column(row, 1)?))
    })?;

    let mut bubbles = HashMap::new();
    for row in rows {
        let (key, value) = row?;
        // LIKE treats '_' as a wildcard; confirm the exact prefix
        let Some(bubble_id) = key.strip_prefix(&prefix) else {
            continue;
        };
        let Some(value) = value else {
            continue;
        };
        match serde_json::from_str::<Value>(&value) {
            Ok(bubble) => {
                bubbles.insert(bubble_id.to_string(), bubble);
            }
            Err(e) => warn!(key = %key, error = %e, "Skipping malformed Cursor bubble row"),
        }
    }
    Ok(bubbles)
}

impl SessionLoader for CursorLoader {
    fn agent_type(&self) -> AgentType {
        AgentType::Cursor
    }

    fn name(&self) -> &str {
        "Cursor"
    }

    fn is_available(&self) -> bool {
        self.global_db.is_file()
    }

    fn read_history(&self, options: &LoadOptions) -> Result<Vec<ChatHistory>> {
        let cutoff = options.cutoff(Utc::now());
        let conn = open_read_only(&self.global_db)?;
        let workspaces = self.workspace_index();

        let mut stmt = conn.prepare("SELECT key, value FROM cursorDiskKV WHERE key LIKE ?1")?;
        let composers: Vec<(String, Option<String>)> = stmt
            .query_map([format!("{}%", COMPOSER_KEY_PREFIX)], |row| {
                Ok((row.get::<_, String>(0)?, text_column(row, 1)?))
            })?
            .collect::<rusqlite::Result<_>>()
            .context("Failed to read Cursor composer rows")?;

        let total = composers.len();
        let mut sessions = Vec::new();

        for (key, value) in composers {
            let Some(composer_id) = key.strip_prefix(COMPOSER_KEY_PREFIX) else {
                continue;
            };
            let Some(composer_json) = value else {
                continue;
            };

            let composer = match ComposerData::parse(composer_id, &composer_json) {
                Ok(composer) => composer,
                Err(e) => {
                    warn!(composer = composer_id, error = %e, "Skipping unreadable Cursor composer");
                    continue;
                }
            };

            // Rows with their own timestamps are filtered before touching bubbles
            if composer.updated_at().is_some_and(|updated_at| !is_included(updated_at, cutoff)) {
                continue;
            }

            let bubbles = match load_bubbles(&conn, composer_id) {
                Ok(bubbles) => bubbles,
                Err(e) => {
                    warn!(composer = composer_id, error = %e, "Failed to read Cursor bubbles");
                    continue;
                }
            };

            match composer.activity(&bubbles) {
                Some(activity) if !is_included(activity, cutoff) => continue,
                Some(activity) => self.last_seen.observe(activity),
                None => debug!(composer = composer_id, "Cursor composer has no activity time, reading it"),
            }

            if let Some(session) =
                parse_cursor_composer(composer_id, &composer, &bubbles, workspaces.get(composer_id))
            {
                sessions.push(session);
            }
        }

        sort_sessions(&mut sessions);
        info!(sessions = sessions.len(), composers = total, "Loaded Cursor sessions");
        Ok(sessions)
    }

    fn as_incremental(&self) -> Option<&dyn IncrementalLoader> {
        Some(self)
    }

    fn as_database(&self) -> Option<&dyn DatabaseLoader> {
        Some(self)
    }
}

impl IncrementalLoader for CursorLoader {
    fn last_sync_timestamp(&self) -> Option<i64> {
        self.last_seen.get()
    }
}

impl DatabaseLoader for CursorLoader {
    fn database_path(&self) -> &Path {
        &self.global_db
    }

    fn is_database_accessible(&self) -> bool {
        open_read_only(&self.global_db)
            .and_then(|conn| {
                conn.query_row("SELECT count(*) FROM cursorDiskKV", [], |row| row.get::<_, i64>(0))
                    .map_err(anyhow::Error::from)
            })
            .is_ok()
    }
}
