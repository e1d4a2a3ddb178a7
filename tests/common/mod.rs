//! Test fixtures: a fake home directory holding data for every source
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use ai_session_sync::SourcePaths;
use chrono::{DateTime, Duration, Utc};
use rusqlite::{Connection, params};
use serde_json::{Value, json};
use tempfile::TempDir;

/// Builder for a home directory laid out like a Linux user's
pub struct SourceHomeBuilder {
    claude_sessions: Vec<(String, String, Vec<Value>)>,
    codex_rollouts: Vec<(String, Vec<Value>)>,
    gemini_sessions: Vec<(String, String, Value)>,
    cursor_composers: Vec<CursorComposerBuilder>,
    cursor_workspaces: Vec<(String, String, Vec<String>)>,
    raw_files: Vec<(PathBuf, String)>,
}

impl SourceHomeBuilder {
    pub fn new() -> Self {
        Self {
            claude_sessions: Vec::new(),
            codex_rollouts: Vec::new(),
            gemini_sessions: Vec::new(),
            cursor_composers: Vec::new(),
            cursor_workspaces: Vec::new(),
            raw_files: Vec::new(),
        }
    }

    /// Add a Claude Code session file `projects/<encoded>/<session_id>.jsonl`
    pub fn with_claude_session(mut self, encoded_project: &str, session_id: &str, events: Vec<Value>) -> Self {
        self.claude_sessions.push((encoded_project.to_string(), session_id.to_string(), events));
        self
    }

    /// Add a Codex rollout `sessions/2026/01/06/<name>.jsonl`
    pub fn with_codex_rollout(mut self, name: &str, lines: Vec<Value>) -> Self {
        self.codex_rollouts.push((name.to_string(), lines));
        self
    }

    /// Add a Gemini session `tmp/<project_hash>/chats/<name>.json`
    pub fn with_gemini_session(mut self, project_hash: &str, name: &str, document: Value) -> Self {
        self.gemini_sessions.push((project_hash.to_string(), name.to_string(), document));
        self
    }

    /// Add a composer with its bubbles to Cursor's global database
    pub fn with_cursor_composer(mut self, composer: CursorComposerBuilder) -> Self {
        self.cursor_composers.push(composer);
        self
    }

    /// Add a Cursor workspace whose folder is `folder_uri` and that lists `composer_ids`
    pub fn with_cursor_workspace(mut self, id: &str, folder_uri: &str, composer_ids: &[&str]) -> Self {
        self.cursor_workspaces.push((
            id.to_string(),
            folder_uri.to_string(),
            composer_ids.iter().map(|c| c.to_string()).collect(),
        ));
        self
    }

    /// Write arbitrary content at a path relative to the home directory
    pub fn with_raw_file(mut self, relative: &str, content: &str) -> Self {
        self.raw_files.push((PathBuf::from(relative), content.to_string()));
        self
    }

    /// Build the home directory
    pub fn build(self) -> TempDir {
        let home = TempDir::new().expect("Failed to create temp dir");
        let paths = source_paths(home.path());

        for (project, session_id, events) in &self.claude_sessions {
            let dir = paths.claude_dir.join("projects").join(project);
            fs::create_dir_all(&dir).expect("Failed to create Claude project dir");
            write_jsonl(&dir.join(format!("{}.jsonl", session_id)), events);
        }

        if !self.codex_rollouts.is_empty() {
            let dir = paths.codex_dir.join("sessions").join("2026").join("01").join("06");
            fs::create_dir_all(&dir).expect("Failed to create Codex sessions dir");
            for (name, lines) in &self.codex_rollouts {
                write_jsonl(&dir.join(format!("{}.jsonl", name)), lines);
            }
        }

        for (hash, name, document) in &self.gemini_sessions {
            let dir = paths.gemini_dir.join("tmp").join(hash).join("chats");
            fs::create_dir_all(&dir).expect("Failed to create Gemini chats dir");
            fs::write(dir.join(format!("{}.json", name)), document.to_string())
                .expect("Failed to write Gemini session");
        }

        if !self.cursor_composers.is_empty() {
            let conn = create_cursor_global_db(&paths.cursor_user_dir);
            for composer in &self.cursor_composers {
                composer.insert_into(&conn);
            }
        }

        for (id, folder, composers) in &self.cursor_workspaces {
            create_cursor_workspace(&paths.cursor_user_dir, id, folder, composers);
        }

        for (relative, content) in &self.raw_files {
            let path = home.path().join(relative);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).expect("Failed to create parent dir");
            }
            fs::write(path, content).expect("Failed to write raw file");
        }

        home
    }
}

impl Default for SourceHomeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Source directories below a fake home
pub fn source_paths(home: &Path) -> SourcePaths {
    SourcePaths::under_home(home)
}

fn write_jsonl(path: &Path, lines: &[Value]) {
    let content = lines.iter().map(Value::to_string).collect::<Vec<_>>().join("\n");
    fs::write(path, content).expect("Failed to write JSONL file");
}

/// Builder for a Cursor composer and its bubbles
pub struct CursorComposerBuilder {
    id: String,
    name: Option<String>,
    updated_at: DateTime<Utc>,
    bubbles: Vec<(String, u8, String)>,
}

impl CursorComposerBuilder {
    pub fn new(id: &str) -> Self {
        Self { id: id.to_string(), name: None, updated_at: Utc::now(), bubbles: Vec::new() }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = updated_at;
        self
    }

    /// Add a user bubble (type 1)
    pub fn user(mut self, text: &str) -> Self {
        let bubble_id = format!("b{}", self.bubbles.len() + 1);
        self.bubbles.push((bubble_id, 1, text.to_string()));
        self
    }

    /// Add an assistant bubble (type 2)
    pub fn assistant(mut self, text: &str) -> Self {
        let bubble_id = format!("b{}", self.bubbles.len() + 1);
        self.bubbles.push((bubble_id, 2, text.to_string()));
        self
    }

    fn insert_into(&self, conn: &Connection) {
        let millis = self.updated_at.timestamp_millis();
        let headers: Vec<Value> =
            self.bubbles.iter().map(|(id, kind, _)| json!({"bubbleId": id, "type": kind})).collect();
        let mut composer = json!({
            "composerId": self.id,
            "createdAt": millis,
            "lastUpdatedAt": millis,
            "fullConversationHeadersOnly": headers,
        });
        if let Some(name) = &self.name {
            composer["name"] = json!(name);
        }
        insert_kv(conn, &format!("composerData:{}", self.id), &composer.to_string());

        for (index, (bubble_id, kind, text)) in self.bubbles.iter().enumerate() {
            let created = self.updated_at - Duration::seconds((self.bubbles.len() - index) as i64);
            let bubble = json!({"type": kind, "text": text, "createdAt": created.to_rfc3339()});
            insert_kv(conn, &format!("bubbleId:{}:{}", self.id, bubble_id), &bubble.to_string());
        }
    }
}

fn create_cursor_global_db(user_dir: &Path) -> Connection {
    let dir = user_dir.join("globalStorage");
    fs::create_dir_all(&dir).expect("Failed to create Cursor globalStorage");
    let conn = Connection::open(dir.join("state.vscdb")).expect("Failed to open Cursor database");
    conn.execute_batch("CREATE TABLE IF NOT EXISTS cursorDiskKV (key TEXT UNIQUE ON CONFLICT REPLACE, value BLOB);")
        .expect("Failed to create cursorDiskKV");
    conn
}

fn insert_kv(conn: &Connection, key: &str, value: &str) {
    conn.execute("INSERT INTO cursorDiskKV (key, value) VALUES (?1, ?2)", params![key, value])
        .expect("Failed to insert cursorDiskKV row");
}

fn create_cursor_workspace(user_dir: &Path, id: &str, folder_uri: &str, composer_ids: &[String]) {
    let dir = user_dir.join("workspaceStorage").join(id);
    fs::create_dir_all(&dir).expect("Failed to create Cursor workspace dir");
    fs::write(dir.join("workspace.json"), json!({"folder": folder_uri}).to_string())
        .expect("Failed to write workspace.json");

    let conn = Connection::open(dir.join("state.vscdb")).expect("Failed to open workspace database");
    conn.execute_batch("CREATE TABLE ItemTable (key TEXT UNIQUE ON CONFLICT REPLACE, value BLOB);")
        .expect("Failed to create ItemTable");
    let composers: Vec<Value> = composer_ids.iter().map(|c| json!({"composerId": c})).collect();
    conn.execute(
        "INSERT INTO ItemTable (key, value) VALUES (?1, ?2)",
        params!["composer.composerData", json!({"allComposers": composers}).to_string()],
    )
    .expect("Failed to insert composer list");
}

/// Claude Code user event
pub fn claude_user(text: &str, timestamp: &str, cwd: &str) -> Value {
    json!({
        "type": "user",
        "message": {"role": "user", "content": text},
        "timestamp": timestamp,
        "cwd": cwd,
    })
}

/// Claude Code assistant event with a text block and a tool call
pub fn claude_assistant(text: &str, timestamp: &str, cwd: &str) -> Value {
    json!({
        "type": "assistant",
        "message": {
            "role": "assistant",
            "content": [
                {"type": "text", "text": text},
                {"type": "tool_use", "id": "t1", "name": "Read", "input": {}},
            ],
        },
        "timestamp": timestamp,
        "cwd": cwd,
    })
}

/// Codex rollout header
pub fn codex_meta(id: &str, cwd: &str, timestamp: &str) -> Value {
    json!({
        "timestamp": timestamp,
        "type": "session_meta",
        "payload": {"id": id, "timestamp": timestamp, "cwd": cwd},
    })
}

/// Codex message item; user text uses `input_text`, assistant text `output_text`
pub fn codex_message(role: &str, text: &str, timestamp: &str) -> Value {
    let part_type = if role == "user" { "input_text" } else { "output_text" };
    json!({
        "timestamp": timestamp,
        "type": "response_item",
        "payload": {"type": "message", "role": role, "content": [{"type": part_type, "text": text}]},
    })
}

/// Gemini session document
pub fn gemini_document(session_id: &str, project_hash: &str, messages: Vec<Value>) -> Value {
    json!({
        "sessionId": session_id,
        "projectHash": project_hash,
        "startTime": "2026-03-01T10:00:00Z",
        "lastUpdated": "2026-03-01T10:05:00Z",
        "messages": messages,
    })
}

pub fn gemini_message(message_type: &str, text: &str, timestamp: &str) -> Value {
    json!({"type": message_type, "content": text, "timestamp": timestamp})
}

/// Reminder block whose listing root names `path`
pub fn reminder_listing(path: &str) -> String {
    format!("<system-reminder>\nDirectory structure:\n- {}/\n  - src/\n</system-reminder>", path)
}
