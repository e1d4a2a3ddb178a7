//! Typed errors for the sync driver, state store and session sinks.
//!
//! Parsers and loaders use `anyhow`; anything a caller may want to match on
//! (run-fatal causes, persistence failures) is typed here.

use std::collections::BTreeMap;
use std::path::PathBuf;

use thiserror::Error;

use crate::models::AgentType;

/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors that abort a synchronization run or a state operation.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("No session sources are available on this machine")]
    NoSourcesAvailable,

    #[error("All {} available sources failed", errors.len())]
    AllSourcesFailed { errors: BTreeMap<AgentType, String> },

    #[error("Another sync is in progress (lock file: {})", path.display())]
    SyncInProgress { path: PathBuf },

    #[error("Failed to access sync state {}: {source}", path.display())]
    StateFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt sync state {}: {source}", path.display())]
    CorruptState {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SyncError {
    /// Category-based process exit code.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::NoSourcesAvailable => 3,
            Self::AllSourcesFailed { .. } => 4,
            Self::SyncInProgress { .. } => 5,
            Self::Config(_) => 7,
            Self::StateFile { .. } | Self::CorruptState { .. } | Self::Json(_) => 8,
        }
    }

    /// Recovery hint, if one exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::NoSourcesAvailable => {
                Some("Run `ai-session-sync sources` to see where each source is looked up".to_string())
            }
            Self::AllSourcesFailed { errors } => Some(
                errors
                    .iter()
                    .map(|(agent, message)| format!("{}: {}", agent, message))
                    .collect::<Vec<_>>()
                    .join("; "),
            ),
            Self::SyncInProgress { path } => {
                Some(format!("If no sync is running, remove {}", path.display()))
            }
            Self::CorruptState { path, .. } => {
                Some(format!("Move {} aside to start from a clean state", path.display()))
            }
            _ => None,
        }
    }
}

/// Errors from persisting one session downstream.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Invalid session id for storage: {0:?}")]
    InvalidSessionId(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Rejected(String),
}
