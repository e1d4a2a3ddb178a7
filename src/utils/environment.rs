use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

const APP_DIR_NAME: &str = "ai-session-sync";

/// Get the home directory, honoring `HOME` before the platform lookup
pub fn get_home_dir() -> Result<PathBuf> {
    if let Some(home) = env::var_os("HOME").filter(|h| !h.is_empty()) {
        return Ok(PathBuf::from(home));
    }
    dirs::home_dir().context("HOME environment variable not set")
}

fn dir_from_env_or(var: &str, default: impl FnOnce() -> Result<PathBuf>) -> Result<PathBuf> {
    match env::var_os(var).filter(|v| !v.is_empty()) {
        Some(value) => Ok(PathBuf::from(value)),
        None => default(),
    }
}

/// Claude Code data directory (`$CLAUDE_CONFIG_DIR` or `~/.claude`)
pub fn get_claude_dir() -> Result<PathBuf> {
    dir_from_env_or("CLAUDE_CONFIG_DIR", || Ok(get_home_dir()?.join(".claude")))
}

/// Codex data directory (`$CODEX_HOME` or `~/.codex`)
pub fn get_codex_dir() -> Result<PathBuf> {
    dir_from_env_or("CODEX_HOME", || Ok(get_home_dir()?.join(".codex")))
}

/// Gemini CLI data directory (`$GEMINI_DIR` or `~/.gemini`)
pub fn get_gemini_dir() -> Result<PathBuf> {
    dir_from_env_or("GEMINI_DIR", || Ok(get_home_dir()?.join(".gemini")))
}

/// Cursor's `User` directory holding `globalStorage/` and `workspaceStorage/`
///
/// `$CURSOR_USER_DIR` overrides the platform default.
pub fn get_cursor_user_dir() -> Result<PathBuf> {
    dir_from_env_or("CURSOR_USER_DIR", || {
        let config = if cfg!(target_os = "macos") {
            get_home_dir()?.join("Library").join("Application Support")
        } else {
            dirs::config_dir().context("Failed to resolve platform config directory")?
        };
        Ok(config.join("Cursor").join("User"))
    })
}

/// Default directory for the persisted sync state
pub fn get_default_state_dir() -> Result<PathBuf> {
    let base = dirs::data_dir().context("Failed to resolve platform data directory")?;
    Ok(base.join(APP_DIR_NAME))
}
