use anyhow::{Context, Result};
use chrono::Utc;

use super::{Cli, Commands, SyncArgs};
use crate::config::{SourcePaths, SyncConfig};
use crate::loaders::{LoadOptions, LoaderRegistry};
use crate::models::{AgentType, ProjectInfo};
use crate::sync::{
    JsonDirSink, RunOptions, StatusReport, SyncReport, SyncStateStore, collect_projects, run_sync,
};
use crate::utils::{format_path_with_tilde, format_timestamp, get_default_state_dir};

pub fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Sync(args) => sync(cli, args),
        Commands::Status { limit, json } => status(cli, *limit, *json),
        Commands::Sources => sources(),
        Commands::Projects { lookback_days, json } => projects(*lookback_days, *json),
    }
}

fn base_config(cli: &Cli) -> Result<SyncConfig> {
    let state_dir = match &cli.state_dir {
        Some(dir) => dir.clone(),
        None => get_default_state_dir()?,
    };
    Ok(SyncConfig::with_state_dir(state_dir, SourcePaths::from_env()?))
}

fn sync(cli: &Cli, args: &SyncArgs) -> Result<()> {
    let mut config = base_config(cli)?;
    config.lookback_days = args.lookback_days;
    config.since = args.since;
    if let Some(output) = &args.output {
        config.output_dir = output.clone();
    }
    if let Some(user_id) = &args.user_id {
        config.user_id = user_id.clone();
    }
    if !args.sources.is_empty() {
        config.sources = Some(args.sources.clone());
    }
    config.validate()?;

    let mut registry = LoaderRegistry::with_default_loaders(&config.paths);
    registry.retain(|agent| config.includes(agent));

    let mut store = SyncStateStore::load(config.state_file())?;
    let sink = JsonDirSink::new(&config.output_dir);
    let options = RunOptions { load: config.load_options(), user_id: config.user_id.clone() };

    let report = run_sync(&registry, &mut store, &sink, &options)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report).context("Failed to serialize report")?);
    } else {
        print_sync_report(&report, &config);
    }
    Ok(())
}

fn print_sync_report(report: &SyncReport, config: &SyncConfig) {
    println!(
        "Synced {} sessions ({} failed) from {} sources",
        report.sessions_synced,
        report.sessions_failed,
        report.sources.len()
    );
    for source in &report.sources {
        match &source.error {
            Some(error) => println!("  {}: error: {}", source.agent_type, error),
            None => println!("  {}: {} sessions", source.agent_type, source.sessions),
        }
    }
    println!("Projects: {}", report.projects.len());
    println!("Output: {}", format_path_with_tilde(&config.output_dir));
}

fn status(cli: &Cli, limit: usize, json: bool) -> Result<()> {
    let config = base_config(cli)?;
    let store = SyncStateStore::load(config.state_file())?;
    let report = StatusReport::build(&store, Utc::now(), limit);

    if json {
        println!("{}", serde_json::to_string_pretty(&report).context("Failed to serialize status")?);
    } else {
        print!("{}", report);
    }
    Ok(())
}

fn sources() -> Result<()> {
    let paths = SourcePaths::from_env()?;
    let registry = LoaderRegistry::with_default_loaders(&paths);

    for loader in registry.get_all() {
        let location = match loader.agent_type() {
            AgentType::ClaudeCode => &paths.claude_dir,
            AgentType::Codex => &paths.codex_dir,
            AgentType::Cursor => &paths.cursor_user_dir,
            AgentType::Gemini => &paths.gemini_dir,
        };

        let mut capabilities = Vec::new();
        if loader.as_incremental().is_some() {
            capabilities.push("incremental");
        }
        if let Some(database) = loader.as_database() {
            capabilities.push(if database.is_database_accessible() {
                "database"
            } else {
                "database (not accessible)"
            });
        }

        println!(
            "{:<12} {:<10} {:<14} {}{}",
            loader.name(),
            loader.agent_type(),
            if loader.is_available() { "available" } else { "not found" },
            format_path_with_tilde(location),
            if capabilities.is_empty() {
                String::new()
            } else {
                format!("  [{}]", capabilities.join(", "))
            }
        );
    }
    Ok(())
}

fn projects(lookback_days: Option<u32>, json: bool) -> Result<()> {
    let paths = SourcePaths::from_env()?;
    let registry = LoaderRegistry::with_default_loaders(&paths);
    let options = LoadOptions { since_timestamp: None, lookback_days };
    let projects = collect_projects(&registry, &options)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&projects).context("Failed to serialize projects")?);
        return Ok(());
    }

    if projects.is_empty() {
        println!("No projects found");
        return Ok(());
    }
    let now = Utc::now();
    for project in &projects {
        println!(
            "{:<24} {:>5} sessions  {:<10} {}",
            project.name,
            project.total_sessions(),
            format_timestamp(&project.last_activity, &now),
            format_path_with_tilde(std::path::Path::new(&project.path))
        );
        println!("{:<24} {}", "", source_breakdown(project));
    }
    Ok(())
}

fn source_breakdown(project: &ProjectInfo) -> String {
    AgentType::ALL
        .iter()
        .filter(|agent| project.session_count(**agent) > 0)
        .map(|agent| format!("{}={}", agent, project.session_count(*agent)))
        .collect::<Vec<_>>()
        .join(" ")
}
