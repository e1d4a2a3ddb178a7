//! One synchronization run
//!
//! 1. Take the state lock and mark the run as started.
//! 2. Read every available source concurrently, each with its own cutoff.
//! 3. Persist each session through the sink, tracking failures per session.
//! 4. Merge the sources' projects and record the outcome.
//!
//! A failing source is recorded and skipped. The run itself only fails when no
//! source is available or every available source failed; in that case nothing
//! is persisted and no projects are produced.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::aggregator::{SourceProjects, merge_projects};
use super::cutoff::LoadOptions;
use super::sink::SessionSink;
use super::state::SyncStateStore;
use crate::error::{Result, SyncError};
use crate::loaders::{LoaderRegistry, SessionLoader};
use crate::models::{AgentType, ChatHistory, ProjectInfo};

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub load: LoadOptions,
    pub user_id: String,
}

/// Outcome of reading one source
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceReport {
    pub agent_type: AgentType,
    /// Cutoff the source was read with, in Unix milliseconds
    pub since: Option<i64>,
    pub sessions: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub sources: Vec<SourceReport>,
    pub sessions_synced: u64,
    pub sessions_failed: u64,
    pub source_errors: BTreeMap<AgentType, String>,
    pub projects: Vec<ProjectInfo>,
}

struct SourceScan {
    agent_type: AgentType,
    options: LoadOptions,
    result: anyhow::Result<Vec<ChatHistory>>,
}

/// Read each loader with the options `plan` picks for it, all in parallel
///
/// Results keep the order of `loaders`.
fn scan_sources<F>(loaders: &[&dyn SessionLoader], plan: F) -> Vec<SourceScan>
where
    F: Fn(&dyn SessionLoader) -> LoadOptions + Sync,
{
    loaders
        .par_iter()
        .map(|loader| {
            let options = plan(*loader);
            let result = loader.read_history(&options);
            if let Err(e) = &result {
                warn!(source = %loader.agent_type(), error = %e, "Source failed");
            }
            SourceScan { agent_type: loader.agent_type(), options, result }
        })
        .collect()
}

/// Failed sessions keep their source re-reading the lookback window until
/// they have been retried this many times
pub const RETRY_RESCAN_LIMIT: u32 = 3;

/// Sources with failed sessions that are still worth a full re-read
fn retrying_sources(store: &SyncStateStore) -> Vec<AgentType> {
    let mut retrying = Vec::new();
    for failure in store.failed_sessions() {
        if failure.retry_count < RETRY_RESCAN_LIMIT {
            retrying.push(failure.session_source);
        } else {
            debug!(
                source = %failure.session_source,
                session = %failure.session_id,
                retries = failure.retry_count,
                "Retry limit reached, session only retried when its unit changes"
            );
        }
    }
    retrying.sort();
    retrying.dedup();
    retrying
}

/// Options a loader is read with
///
/// An explicit `since` wins for every source. Otherwise incremental sources
/// resume from the last run that read them successfully, or from their own
/// last read in this process. Sources with sessions still awaiting a retry
/// are re-read over the lookback window so those sessions are seen again.
/// Non-incremental sources only get the lookback window.
fn plan_options(
    loader: &dyn SessionLoader,
    requested: &LoadOptions,
    resume: Option<i64>,
    retrying: &[AgentType],
) -> LoadOptions {
    if requested.since_timestamp.is_some_and(|ms| ms > 0) {
        return *requested;
    }
    let Some(incremental) = loader.as_incremental() else {
        return requested.lookback_only();
    };
    if retrying.contains(&loader.agent_type()) {
        return requested.lookback_only();
    }
    match resume.or_else(|| incremental.last_sync_timestamp()) {
        Some(since) => LoadOptions { since_timestamp: Some(since), ..*requested },
        None => requested.lookback_only(),
    }
}

fn available_loaders(registry: &LoaderRegistry) -> Vec<&dyn SessionLoader> {
    let available = registry.get_available();
    for loader in registry.get_all() {
        if !loader.is_available() {
            info!(source = %loader.agent_type(), "Source not available, skipping");
        }
    }
    available
}

/// Run one synchronization
///
/// # Errors
///
/// - [`SyncError::SyncInProgress`] if another run holds the state lock
/// - [`SyncError::NoSourcesAvailable`] if no registered source has data
/// - [`SyncError::AllSourcesFailed`] if every available source failed to read
/// - state file errors while saving
///
/// Per-session persistence failures are not errors; they are counted and
/// tracked in the state for retry.
pub fn run_sync(
    registry: &LoaderRegistry,
    store: &mut SyncStateStore,
    sink: &dyn SessionSink,
    options: &RunOptions,
) -> Result<SyncReport> {
    let _lock = store.lock()?;
    let started_at = Utc::now();

    let retrying = retrying_sources(store);

    store.begin_run(started_at);
    store.save()?;

    let loaders = available_loaders(registry);
    if loaders.is_empty() {
        let err = SyncError::NoSourcesAvailable;
        store.fail_run(err.to_string(), BTreeMap::new());
        store.save()?;
        return Err(err);
    }

    info!(sources = loaders.len(), "Starting sync");
    let resume_from = &*store;
    let scans = scan_sources(&loaders, |loader| {
        plan_options(loader, &options.load, resume_from.resume_point(loader.agent_type()), &retrying)
    });

    let mut source_errors = BTreeMap::new();
    let mut sources = Vec::with_capacity(scans.len());
    let mut loaded: Vec<(AgentType, Vec<ChatHistory>)> = Vec::new();

    for scan in scans {
        match scan.result {
            Ok(sessions) => {
                sources.push(SourceReport {
                    agent_type: scan.agent_type,
                    since: scan.options.since_timestamp,
                    sessions: sessions.len(),
                    error: None,
                });
                loaded.push((scan.agent_type, sessions));
            }
            Err(e) => {
                let message = format!("{:#}", e);
                sources.push(SourceReport {
                    agent_type: scan.agent_type,
                    since: scan.options.since_timestamp,
                    sessions: 0,
                    error: Some(message.clone()),
                });
                source_errors.insert(scan.agent_type, message);
            }
        }
    }

    if loaded.is_empty() {
        let err = SyncError::AllSourcesFailed { errors: source_errors.clone() };
        store.fail_run(err.to_string(), source_errors);
        store.save()?;
        return Err(err);
    }

    let mut synced = 0u64;
    let mut failed = 0u64;
    for (agent, sessions) in &loaded {
        for session in sessions {
            match sink.persist(session, &options.user_id) {
                Ok(()) => {
                    store.resolve(&session.id);
                    synced += 1;
                }
                Err(e) => {
                    warn!(source = %agent, session = %session.id, error = %e, "Failed to persist session");
                    store.record_failure(&session.id, *agent, e.to_string(), Utc::now());
                    failed += 1;
                }
            }
        }
    }

    let per_source: Vec<SourceProjects> = loaded
        .iter()
        .filter_map(|(agent, sessions)| {
            let loader = registry.get_by_type(*agent)?;
            Some(SourceProjects { agent_type: *agent, projects: loader.extract_projects(sessions) })
        })
        .collect();
    let projects = merge_projects(&per_source);

    for (agent, _) in &loaded {
        store.mark_source_read(*agent, started_at);
    }
    let completed_at = Utc::now();
    store.complete_run(completed_at, synced, failed, source_errors.clone());
    store.save()?;

    info!(
        synced,
        failed,
        projects = projects.len(),
        failed_sources = source_errors.len(),
        "Sync complete"
    );

    Ok(SyncReport {
        started_at,
        completed_at,
        sources,
        sessions_synced: synced,
        sessions_failed: failed,
        source_errors,
        projects,
    })
}

/// Scan the available sources and merge their projects without persisting
/// anything or touching sync state
///
/// Failing sources are logged and left out.
pub fn collect_projects(registry: &LoaderRegistry, options: &LoadOptions) -> Result<Vec<ProjectInfo>> {
    let loaders = available_loaders(registry);
    if loaders.is_empty() {
        return Err(SyncError::NoSourcesAvailable);
    }

    let scans = scan_sources(&loaders, |_| *options);

    let mut errors = BTreeMap::new();
    let mut per_source = Vec::new();
    for scan in scans {
        match scan.result {
            Ok(sessions) => {
                if let Some(loader) = registry.get_by_type(scan.agent_type) {
                    per_source.push(SourceProjects {
                        agent_type: scan.agent_type,
                        projects: loader.extract_projects(&sessions),
                    });
                }
            }
            Err(e) => {
                errors.insert(scan.agent_type, format!("{:#}", e));
            }
        }
    }

    if per_source.is_empty() {
        return Err(SyncError::AllSourcesFailed { errors });
    }
    Ok(merge_projects(&per_source))
}
