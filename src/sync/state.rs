//! Persisted sync state: run status plus per-session failure bookkeeping
//!
//! One JSON file holds everything. Writes go to a temp file that is renamed
//! over the original, so a crash never leaves a half-written state behind.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, SyncError};
use crate::models::{AgentType, FailedSync, SyncState, SyncStatus};

pub const STATE_VERSION: u32 = 1;
pub const LOCK_FILE_NAME: &str = "sync-state.lock";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StateFile {
    version: u32,
    #[serde(default)]
    state: SyncState,
    /// Keyed by session id
    #[serde(default)]
    failed_syncs: BTreeMap<String, FailedSync>,
}

/// Owner of the sync state file
#[derive(Debug)]
pub struct SyncStateStore {
    path: PathBuf,
    file: StateFile,
}

fn state_io(path: &Path) -> impl FnOnce(std::io::Error) -> SyncError + '_ {
    move |source| SyncError::StateFile { path: path.to_path_buf(), source }
}

impl SyncStateStore {
    /// Load the state at `path`; a missing file yields fresh defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or is not valid
    /// state JSON.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "No sync state yet");
                return Ok(Self::in_memory(path));
            }
            Err(e) => return Err(state_io(&path)(e)),
        };

        let file: StateFile = serde_json::from_str(&raw)
            .map_err(|source| SyncError::CorruptState { path: path.clone(), source })?;

        if file.version != STATE_VERSION {
            warn!(
                path = %path.display(),
                expected = STATE_VERSION,
                found = file.version,
                "Sync state version mismatch, starting fresh"
            );
            return Ok(Self::in_memory(path));
        }

        Ok(Self { path, file })
    }

    /// Fresh state that will be written to `path` on [`save`](Self::save)
    pub fn in_memory(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: StateFile { version: STATE_VERSION, ..Default::default() },
        }
    }

    pub fn save(&self) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(state_io(dir))?;
        }

        let json = serde_json::to_string_pretty(&self.file)?;
        let temp = self.path.with_extension("json.tmp");
        fs::write(&temp, json).map_err(state_io(&temp))?;
        fs::rename(&temp, &self.path).map_err(state_io(&self.path))?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> &SyncState {
        &self.file.state
    }

    /// Take the advisory lock guarding the state file for one run
    pub fn lock(&self) -> Result<SyncLock> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        SyncLock::acquire(&dir.join(LOCK_FILE_NAME))
    }

    pub fn begin_run(&mut self, now: DateTime<Utc>) {
        let state = &mut self.file.state;
        state.status = SyncStatus::Syncing;
        state.last_sync_started_at = now.timestamp_millis();
        state.error_message = None;
    }

    pub fn complete_run(
        &mut self,
        now: DateTime<Utc>,
        synced: u64,
        failed: u64,
        source_errors: BTreeMap<AgentType, String>,
    ) {
        let state = &mut self.file.state;
        state.status = SyncStatus::Idle;
        state.last_sync_completed_at = now.timestamp_millis();
        state.sessions_synced_count = synced;
        state.sessions_failed_count = failed;
        state.error_message = None;
        state.source_errors = source_errors;
    }

    /// Remember that `source` was read in full by the run started at `started_at`
    ///
    /// Only called for sources whose scan succeeded, so a failing source keeps
    /// its earlier resume point.
    pub fn mark_source_read(&mut self, source: AgentType, started_at: DateTime<Utc>) {
        self.file.state.source_resume_points.insert(source, started_at.timestamp_millis());
    }

    /// Cutoff `source` resumes from, in Unix milliseconds
    pub fn resume_point(&self, source: AgentType) -> Option<i64> {
        self.file.state.source_resume_points.get(&source).copied().filter(|ms| *ms > 0)
    }

    pub fn fail_run(
        &mut self,
        message: impl Into<String>,
        source_errors: BTreeMap<AgentType, String>,
    ) {
        let state = &mut self.file.state;
        state.status = SyncStatus::Error;
        state.error_message = Some(message.into());
        state.source_errors = source_errors;
    }

    /// Record a failed persistence attempt
    ///
    /// The first failure creates the entry with `retry_count = 0`; each later
    /// failure increments it and refreshes the message and `last_failed_at`.
    pub fn record_failure(
        &mut self,
        session_id: &str,
        source: AgentType,
        error: impl Into<String>,
        now: DateTime<Utc>,
    ) -> &FailedSync {
        let now_ms = now.timestamp_millis();
        let error = error.into();
        self.file
            .failed_syncs
            .entry(session_id.to_string())
            .and_modify(|entry| {
                entry.retry_count += 1;
                entry.last_failed_at = now_ms;
                entry.session_source = source;
                entry.error_message = error.clone();
            })
            .or_insert_with(|| FailedSync {
                session_id: session_id.to_string(),
                session_source: source,
                first_failed_at: now_ms,
                last_failed_at: now_ms,
                retry_count: 0,
                error_message: error,
            })
    }

    /// Forget a session's failure after it persisted; true if there was one
    pub fn resolve(&mut self, session_id: &str) -> bool {
        self.file.failed_syncs.remove(session_id).is_some()
    }

    pub fn failure(&self, session_id: &str) -> Option<&FailedSync> {
        self.file.failed_syncs.get(session_id)
    }

    /// Failing sessions, most recent failure first
    pub fn failed_sessions(&self) -> Vec<&FailedSync> {
        let mut failed: Vec<&FailedSync> = self.file.failed_syncs.values().collect();
        failed.sort_by(|a, b| {
            b.last_failed_at.cmp(&a.last_failed_at).then_with(|| a.session_id.cmp(&b.session_id))
        });
        failed
    }

    pub fn last_successful_sync(&self) -> Option<DateTime<Utc>> {
        Some(self.file.state.last_sync_completed_at)
            .filter(|ms| *ms > 0)
            .and_then(DateTime::from_timestamp_millis)
    }
}

/// Advisory lock file, removed when dropped
#[derive(Debug)]
pub struct SyncLock {
    path: PathBuf,
}

impl SyncLock {
    fn acquire(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(state_io(dir))?;
        }
        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(SyncError::SyncInProgress { path: path.to_path_buf() });
            }
            Err(e) => return Err(state_io(path)(e)),
        };
        // Informational only
        let _ = writeln!(file, "{}", std::process::id());
        Ok(Self { path: path.to_path_buf() })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SyncLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "Failed to remove sync lock");
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use tempfile::TempDir;

    use super::*;

    fn at(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).unwrap()
    }

    fn store(dir: &TempDir) -> SyncStateStore {
        SyncStateStore::load(dir.path().join("sync-state.json")).unwrap()
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        assert_eq!(store.state().status, SyncStatus::Idle);
        assert_eq!(store.last_successful_sync(), None);
        assert!(store.failed_sessions().is_empty());
    }

    #[test]
    fn test_run_lifecycle_round_trips_through_disk() {
        let dir = TempDir::new().unwrap();
        let mut store = store(&dir);

        store.begin_run(at(1_000));
        assert_eq!(store.state().status, SyncStatus::Syncing);
        let errors = BTreeMap::from([(AgentType::Gemini, "unreadable".to_string())]);
        store.complete_run(at(2_000), 5, 1, errors);
        store.save().unwrap();

        let reloaded = SyncStateStore::load(store.path()).unwrap();
        assert_eq!(reloaded.state().status, SyncStatus::Idle);
        assert_eq!(reloaded.state().last_sync_started_at, 1_000);
        assert_eq!(reloaded.state().sessions_synced_count, 5);
        assert_eq!(reloaded.state().source_errors.len(), 1);
        assert_eq!(reloaded.last_successful_sync(), Some(at(2_000)));
    }

    #[test]
    fn test_fail_run_keeps_last_success() {
        let dir = TempDir::new().unwrap();
        let mut store = store(&dir);
        store.complete_run(at(2_000), 1, 0, BTreeMap::new());
        store.begin_run(at(3_000));
        store.fail_run("No sources", BTreeMap::new());

        assert_eq!(store.state().status, SyncStatus::Error);
        assert_eq!(store.state().error_message.as_deref(), Some("No sources"));
        assert_eq!(store.last_successful_sync(), Some(at(2_000)));

        store.begin_run(at(4_000));
        assert!(store.state().error_message.is_none());
    }

    #[test]
    fn test_resume_points_are_per_source() {
        let dir = TempDir::new().unwrap();
        let mut store = store(&dir);
        assert_eq!(store.resume_point(AgentType::Codex), None);

        store.mark_source_read(AgentType::Codex, at(1_000));
        store.mark_source_read(AgentType::ClaudeCode, at(1_000));
        store.mark_source_read(AgentType::ClaudeCode, at(5_000));
        store.save().unwrap();

        let reloaded = SyncStateStore::load(store.path()).unwrap();
        assert_eq!(reloaded.resume_point(AgentType::Codex), Some(1_000));
        assert_eq!(reloaded.resume_point(AgentType::ClaudeCode), Some(5_000));
        assert_eq!(reloaded.resume_point(AgentType::Cursor), None);
    }

    #[test]
    fn test_retry_bookkeeping() {
        let dir = TempDir::new().unwrap();
        let mut store = store(&dir);
        let start = at(10_000);

        for attempt in 0..3 {
            let now = start + Duration::minutes(attempt);
            store.record_failure("s1", AgentType::Codex, format!("attempt {}", attempt), now);
        }

        let entry = store.failure("s1").unwrap();
        assert_eq!(entry.retry_count, 2);
        assert_eq!(entry.first_failed_at, start.timestamp_millis());
        assert_eq!(entry.last_failed_at, (start + Duration::minutes(2)).timestamp_millis());
        assert_eq!(entry.error_message, "attempt 2");

        assert!(store.resolve("s1"));
        assert!(!store.resolve("s1"));
        assert!(store.failure("s1").is_none());
    }

    #[test]
    fn test_failed_sessions_most_recent_first() {
        let dir = TempDir::new().unwrap();
        let mut store = store(&dir);
        store.record_failure("old", AgentType::Codex, "e", at(1_000));
        store.record_failure("new", AgentType::Cursor, "e", at(3_000));
        store.record_failure("mid", AgentType::Gemini, "e", at(2_000));

        let order: Vec<&str> = store.failed_sessions().iter().map(|f| f.session_id.as_str()).collect();
        assert_eq!(order, vec!["new", "mid", "old"]);
    }

    #[test]
    fn test_corrupt_state_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sync-state.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(SyncStateStore::load(&path), Err(SyncError::CorruptState { .. })));
    }

    #[test]
    fn test_version_mismatch_starts_fresh() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sync-state.json");
        fs::write(&path, r#"{"version":99,"state":{"status":"error","lastSyncStartedAt":1,"lastSyncCompletedAt":1,"sessionsSyncedCount":0,"sessionsFailedCount":0}}"#).unwrap();
        let store = SyncStateStore::load(&path).unwrap();
        assert_eq!(store.state().status, SyncStatus::Idle);
    }

    #[test]
    fn test_lock_is_exclusive_and_released_on_drop() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let lock = store.lock().unwrap();
        assert!(lock.path().exists());
        assert!(matches!(store.lock(), Err(SyncError::SyncInProgress { .. })));

        drop(lock);
        assert!(!dir.path().join(LOCK_FILE_NAME).exists());
        assert!(store.lock().is_ok());
    }
}
