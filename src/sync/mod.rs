//! Synchronization engine
//!
//! - [`cutoff`] - which units a run reads
//! - [`driver`] - one run across every available source
//! - [`sink`] - where synchronized sessions go
//! - [`state`] - persisted run status and per-session failures
//! - [`status`] - report built from that state
//! - [`aggregator`] - cross-source project merge

pub mod aggregator;
pub mod cutoff;
pub mod driver;
pub mod sink;
pub mod state;
pub mod status;

pub use aggregator::{SourceProjects, merge_projects, projects_from_sessions};
pub use cutoff::{LoadOptions, effective_cutoff, file_modified_at, filter_by_mtime, is_included};
pub use driver::{RunOptions, SourceReport, SyncReport, collect_projects, run_sync};
pub use sink::{JsonDirSink, SessionSink};
pub use state::{SyncLock, SyncStateStore};
pub use status::{FailingSession, StatusReport};
