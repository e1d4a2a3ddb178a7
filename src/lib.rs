//! AI Session Sync - collect coding-assistant conversations from local sources
//!
//! Reads the session stores that coding assistants leave on disk, normalizes
//! every conversation into one [`ChatHistory`] shape and synchronizes them to a
//! [`SessionSink`]. Supported sources:
//!
//! - Claude Code JSONL sessions in `~/.claude/projects/`
//! - Codex rollouts in `~/.codex/sessions/`
//! - Cursor composer conversations in its `state.vscdb` SQLite databases
//! - Gemini CLI checkpoints in `~/.gemini/tmp/`
//!
//! Runs are incremental: each persists its outcome in a state file, and the
//! next run only reads units modified since. Sessions that fail to persist are
//! tracked and retried. Projects referenced by sessions are merged across
//! sources by canonical path.
//!
//! # Example
//!
//! ```no_run
//! use ai_session_sync::{
//!     JsonDirSink, LoaderRegistry, RunOptions, SourcePaths, SyncStateStore, run_sync,
//! };
//! use ai_session_sync::loaders::LoadOptions;
//!
//! let registry = LoaderRegistry::with_default_loaders(&SourcePaths::from_env()?);
//! let mut store = SyncStateStore::load("/tmp/sync/sync-state.json")?;
//! let sink = JsonDirSink::new("/tmp/sync/sessions");
//! let options = RunOptions { load: LoadOptions::lookback(30), user_id: "local".to_string() };
//!
//! let report = run_sync(&registry, &mut store, &sink, &options)?;
//! println!("Synced {} sessions", report.sessions_synced);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod loaders;
pub mod models;
pub mod parsers;
pub mod sync;
pub mod utils;

// Re-export commonly used types
pub use config::{SourcePaths, SyncConfig};
pub use error::{SinkError, SyncError};
pub use loaders::{LoaderRegistry, SessionLoader};
pub use models::{AgentType, ChatHistory, Message, ProjectInfo, Role};
pub use sync::{JsonDirSink, RunOptions, SessionSink, StatusReport, SyncReport, SyncStateStore, run_sync};
