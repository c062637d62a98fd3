//! Resolution of the local pblink data directory.

use anyhow::Result;
use std::path::PathBuf;

const PBLINK_DIR: &str = ".pblink";
const DB_FILE: &str = "pblink.db";

/// Environment variable to override the data directory.
const PBLINK_DIR_ENV: &str = "PBLINK_DIR";

/// Priority: PBLINK_DIR env var > ~/.pblink/
pub fn resolve_pblink_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(PBLINK_DIR_ENV)
        && !dir.trim().is_empty()
    {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|h| h.join(PBLINK_DIR))
        .ok_or_else(|| anyhow::anyhow!("Failed to determine home directory"))
}

/// Default database path, creating the data directory if needed.
pub fn default_db_path() -> Result<PathBuf> {
    let dir = resolve_pblink_dir()?;
    std::fs::create_dir_all(&dir)?;
    Ok(dir.join(DB_FILE))
}
