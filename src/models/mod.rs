//! Canonical record model shared by every source.
//!
//! - [`ChatHistory`] - one normalized session with its [`Message`]s
//! - [`ProjectInfo`] - per-project statistics, merged across sources by path
//! - [`SyncState`] / [`FailedSync`] - persisted synchronization bookkeeping
//!
//! Field names serialize in camelCase; maps are `BTreeMap` so serializing the
//! same record twice yields identical bytes.

pub mod project;
pub mod session;
pub mod sync_state;

pub use project::ProjectInfo;
pub use session::{AgentType, ChatHistory, Message, Role, SessionMetadata, session_timestamp};
pub use sync_state::{FailedSync, SyncState, SyncStatus};
