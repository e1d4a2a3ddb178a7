//! Status report built from persisted state alone, without scanning sources

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::state::SyncStateStore;
use crate::models::{AgentType, FailedSync, SyncStatus};
use crate::utils::{format_age, format_timestamp, single_line};

const MAX_MESSAGE_CHARS: usize = 120;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailingSession {
    pub session_id: String,
    pub source: AgentType,
    pub retry_count: u32,
    pub first_failed_at: Option<DateTime<Utc>>,
    pub last_failed_at: Option<DateTime<Utc>>,
    pub error_message: String,
}

impl From<&FailedSync> for FailingSession {
    fn from(entry: &FailedSync) -> Self {
        Self {
            session_id: entry.session_id.clone(),
            source: entry.session_source,
            retry_count: entry.retry_count,
            first_failed_at: DateTime::from_timestamp_millis(entry.first_failed_at),
            last_failed_at: DateTime::from_timestamp_millis(entry.last_failed_at),
            error_message: entry.error_message.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub status: SyncStatus,
    pub last_successful_sync: Option<DateTime<Utc>>,
    /// Seconds since the last successful sync
    pub seconds_since_last_sync: Option<i64>,
    pub last_run_started_at: Option<DateTime<Utc>>,
    pub sessions_synced: u64,
    pub sessions_failed: u64,
    pub error_message: Option<String>,
    pub source_errors: BTreeMap<AgentType, String>,
    /// Total failing sessions, including those beyond `failing_sessions`
    pub failing_count: usize,
    pub failing_sessions: Vec<FailingSession>,
    #[serde(skip)]
    generated_at: DateTime<Utc>,
}

impl StatusReport {
    /// Summarize `store` as of `now`, listing at most `limit` failing sessions
    pub fn build(store: &SyncStateStore, now: DateTime<Utc>, limit: usize) -> Self {
        let state = store.state();
        let last_successful_sync = store.last_successful_sync();
        let failed = store.failed_sessions();

        Self {
            status: state.status,
            seconds_since_last_sync: last_successful_sync
                .map(|at| now.signed_duration_since(at).num_seconds().max(0)),
            last_successful_sync,
            last_run_started_at: Some(state.last_sync_started_at)
                .filter(|ms| *ms > 0)
                .and_then(DateTime::from_timestamp_millis),
            sessions_synced: state.sessions_synced_count,
            sessions_failed: state.sessions_failed_count,
            error_message: state.error_message.clone(),
            source_errors: state.source_errors.clone(),
            failing_count: failed.len(),
            failing_sessions: failed.into_iter().take(limit).map(FailingSession::from).collect(),
            generated_at: now,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status != SyncStatus::Error && self.failing_count == 0 && self.source_errors.is_empty()
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Status: {}", self.status.as_str())?;

        match self.last_successful_sync {
            Some(at) => {
                let age = self
                    .seconds_since_last_sync
                    .and_then(format_age)
                    .map_or_else(|| "just now".to_string(), |age| format!("{} ago", age));
                writeln!(f, "Last successful sync: {} ({})", at.format("%Y-%m-%d %H:%M:%S UTC"), age)?
            }
            None => writeln!(f, "Last successful sync: never")?,
        }

        if self.last_successful_sync.is_some() || self.sessions_failed > 0 {
            writeln!(
                f,
                "Last run: {} synced, {} failed",
                self.sessions_synced, self.sessions_failed
            )?;
        }

        if let Some(message) = &self.error_message {
            writeln!(f, "Error: {}", single_line(message, MAX_MESSAGE_CHARS))?;
        }

        if !self.source_errors.is_empty() {
            writeln!(f, "Source errors:")?;
            for (agent, message) in &self.source_errors {
                writeln!(f, "  {}: {}", agent, single_line(message, MAX_MESSAGE_CHARS))?;
            }
        }

        if self.failing_count == 0 {
            return writeln!(f, "Failing sessions: none");
        }

        writeln!(f, "Failing sessions: {}", self.failing_count)?;
        for entry in &self.failing_sessions {
            let since = entry
                .first_failed_at
                .map(|at| format_timestamp(&at, &self.generated_at))
                .unwrap_or_else(|| "unknown".to_string());
            writeln!(
                f,
                "  {} [{}] retries={} failing since {}: {}",
                single_line(&entry.session_id, 64),
                entry.source,
                entry.retry_count,
                since,
                single_line(&entry.error_message, MAX_MESSAGE_CHARS)
            )?;
        }
        let hidden = self.failing_count - self.failing_sessions.len();
        if hidden > 0 {
            writeln!(f, "  ... and {} more", hidden)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use tempfile::TempDir;

    use super::*;

    fn now() -> DateTime<Utc> {
        "2026-06-15T12:00:00Z".parse().unwrap()
    }

    #[test]
    fn test_fresh_state_report() {
        let dir = TempDir::new().unwrap();
        let store = SyncStateStore::in_memory(dir.path().join("sync-state.json"));
        let report = StatusReport::build(&store, now(), 10);

        assert_eq!(report.status, SyncStatus::Idle);
        assert!(report.last_successful_sync.is_none());
        assert!(report.is_healthy());
        let text = report.to_string();
        assert!(text.contains("Last successful sync: never"));
        assert!(text.contains("Failing sessions: none"));
    }

    #[test]
    fn test_report_lists_failures_with_limit() {
        let dir = TempDir::new().unwrap();
        let mut store = SyncStateStore::in_memory(dir.path().join("sync-state.json"));
        store.complete_run(now() - Duration::hours(2), 10, 3, BTreeMap::new());
        for (i, id) in ["a", "b", "c"].iter().enumerate() {
            let at = now() - Duration::hours(3) - Duration::minutes(i as i64);
            store.record_failure(id, AgentType::ClaudeCode, "disk full\x1b[31m\nretry later", at);
        }
        store.record_failure("c", AgentType::ClaudeCode, "disk full", now() - Duration::hours(1));

        let report = StatusReport::build(&store, now(), 2);
        assert_eq!(report.seconds_since_last_sync, Some(7200));
        assert_eq!(report.failing_count, 3);
        assert_eq!(report.failing_sessions.len(), 2);
        assert_eq!(report.failing_sessions[0].session_id, "c");
        assert_eq!(report.failing_sessions[0].retry_count, 1);
        assert!(!report.is_healthy());

        let text = report.to_string();
        assert!(text.contains("(2h ago)"));
        assert!(text.contains("Last run: 10 synced, 3 failed"));
        assert!(text.contains("retries=1 failing since 3h ago"));
        assert!(text.contains("... and 1 more"));
        assert!(!text.contains('\x1b'));
    }

    #[test]
    fn test_report_shows_run_error_and_source_errors() {
        let dir = TempDir::new().unwrap();
        let mut store = SyncStateStore::in_memory(dir.path().join("sync-state.json"));
        store.begin_run(now());
        let errors = BTreeMap::from([(AgentType::Cursor, "database is locked".to_string())]);
        store.fail_run("All 1 available sources failed", errors);

        let report = StatusReport::build(&store, now(), 5);
        let text = report.to_string();
        assert!(text.starts_with("Status: error"));
        assert!(text.contains("Error: All 1 available sources failed"));
        assert!(text.contains("cursor: database is locked"));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "error");
        assert!(json.get("generatedAt").is_none());
    }
}
