use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::models::AgentType;

pub mod commands;

#[derive(Parser, Debug)]
#[command(name = "ai-session-sync")]
#[command(version)]
#[command(about = "Synchronize coding-assistant sessions from local sources", long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress logging and error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Directory holding the sync state file
    #[arg(long, env = "SESSION_SYNC_STATE_DIR", global = true)]
    pub state_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read every available source and persist its sessions
    Sync(SyncArgs),

    /// Show the outcome of previous runs and failing sessions
    Status {
        /// Maximum number of failing sessions to list
        #[arg(long, default_value_t = 10)]
        limit: usize,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the known sources and whether their data is present
    Sources,

    /// Print projects referenced by sessions, merged across sources
    Projects {
        /// Only read sessions modified in the last N days
        #[arg(long, env = "SESSION_SYNC_LOOKBACK_DAYS")]
        lookback_days: Option<u32>,

        /// Print the project list as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Only read sessions modified in the last N days
    #[arg(long, env = "SESSION_SYNC_LOOKBACK_DAYS")]
    pub lookback_days: Option<u32>,

    /// Only read sessions modified at or after this Unix time in milliseconds
    #[arg(long)]
    pub since: Option<i64>,

    /// Directory synchronized sessions are written to
    #[arg(long, env = "SESSION_SYNC_OUTPUT_DIR")]
    pub output: Option<PathBuf>,

    /// User the sessions are stored for
    #[arg(long, env = "SESSION_SYNC_USER_ID")]
    pub user_id: Option<String>,

    /// Restrict the run to these sources (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub sources: Vec<AgentType>,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,
}
