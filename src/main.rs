use std::process::ExitCode;

use ai_session_sync::cli::{Cli, commands};
use ai_session_sync::error::SyncError;
use clap::Parser;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match commands::run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let sync_error = e.downcast_ref::<SyncError>();
            if !cli.quiet {
                eprintln!("Error: {:#}", e);
                if let Some(hint) = sync_error.and_then(SyncError::hint) {
                    eprintln!("  Hint: {}", hint);
                }
            }
            ExitCode::from(sync_error.map_or(1, SyncError::exit_code))
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    if quiet {
        return;
    }

    // RUST_LOG wins over the verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug,rusqlite=info"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}
