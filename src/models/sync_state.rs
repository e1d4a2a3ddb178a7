use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::session::AgentType;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    #[default]
    Idle,
    Syncing,
    Error,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Idle => "idle",
            SyncStatus::Syncing => "syncing",
            SyncStatus::Error => "error",
        }
    }
}

/// Overall synchronization status. Timestamps are epoch milliseconds, 0 = never.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    pub status: SyncStatus,
    pub last_sync_started_at: i64,
    pub last_sync_completed_at: i64,
    pub sessions_synced_count: u64,
    pub sessions_failed_count: u64,
    #[serde(default)]
    pub error_message: Option<String>,
    /// Sources whose scan failed during the last run.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub source_errors: BTreeMap<AgentType, String>,
    /// Per source, start of the last completed run that read it successfully.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub source_resume_points: BTreeMap<AgentType, i64>,
}

/// A session that could not be written downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedSync {
    pub session_id: String,
    pub session_source: AgentType,
    pub first_failed_at: i64,
    pub last_failed_at: i64,
    pub retry_count: u32,
    pub error_message: String,
}
