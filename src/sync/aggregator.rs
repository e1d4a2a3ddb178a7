//! Cross-source project aggregation
//!
//! Each source reports the projects its sessions referenced. Merging keys
//! them by canonical path so a directory used from several assistants becomes
//! one [`ProjectInfo`] with per-source counters.

use std::collections::BTreeMap;

use crate::models::{AgentType, ChatHistory, ProjectInfo};
use crate::utils::{canonical_project_path, project_name_from_path};

/// Projects reported by one source
#[derive(Debug, Clone)]
pub struct SourceProjects {
    pub agent_type: AgentType,
    pub projects: Vec<ProjectInfo>,
}

/// Per-source project list derived from session metadata
///
/// Sessions without a recoverable project path are left out. The result is
/// sorted by path.
pub fn projects_from_sessions(agent_type: AgentType, sessions: &[ChatHistory]) -> Vec<ProjectInfo> {
    let mut by_path: BTreeMap<String, ProjectInfo> = BTreeMap::new();

    for session in sessions {
        let Some(path) = session.project_path().and_then(canonical_project_path) else {
            continue;
        };
        let project = by_path.entry(path).or_insert_with_key(|path| {
            let name = session
                .metadata
                .as_ref()
                .and_then(|m| m.project_name.clone())
                .unwrap_or_else(|| project_name_from_path(path));
            ProjectInfo::new(name, path.clone(), session.timestamp)
        });

        *project.session_count_mut(agent_type) += 1;
        if session.timestamp > project.last_activity {
            project.last_activity = session.timestamp;
        }
        if let Some(workspace_id) = session.workspace_id() {
            project.add_workspace_id(workspace_id);
        }
    }

    by_path.into_values().collect()
}

/// Merge every source's projects into one list sorted by path
///
/// Inputs are folded in [`AgentType`] order, so the result does not depend on
/// the order of `sources`. For each path, a source only adds to its own
/// counter, `last_activity` keeps the latest value, and workspace ids are
/// unioned in first-seen order.
pub fn merge_projects(sources: &[SourceProjects]) -> Vec<ProjectInfo> {
    let mut ordered: Vec<&SourceProjects> = sources.iter().collect();
    ordered.sort_by_key(|s| s.agent_type);

    let mut merged: BTreeMap<String, ProjectInfo> = BTreeMap::new();

    for source in ordered {
        for incoming in &source.projects {
            let Some(path) = canonical_project_path(&incoming.path) else {
                continue;
            };
            let count = incoming.session_count(source.agent_type);

            match merged.get_mut(&path) {
                Some(existing) => {
                    *existing.session_count_mut(source.agent_type) += count;
                    if incoming.last_activity > existing.last_activity {
                        existing.last_activity = incoming.last_activity;
                    }
                    for workspace_id in &incoming.workspace_ids {
                        existing.add_workspace_id(workspace_id);
                    }
                }
                None => {
                    let mut project =
                        ProjectInfo::new(incoming.name.clone(), path.clone(), incoming.last_activity);
                    *project.session_count_mut(source.agent_type) = count;
                    for workspace_id in &incoming.workspace_ids {
                        project.add_workspace_id(workspace_id);
                    }
                    merged.insert(path, project);
                }
            }
        }
    }

    merged.into_values().collect()
}
