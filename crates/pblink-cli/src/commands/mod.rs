pub mod auth;
pub mod link;
pub mod plan;
pub mod probe;
pub mod runs;

use crate::config::CliConfig;
use anyhow::{Context, Result};
use pblink_storage::{Storage, paths};
use std::path::PathBuf;

/// Open the database: `--db-path`/`PBLINK_DB_PATH`, then the CLI config,
/// then the data directory default.
pub fn open_storage(db_path: Option<PathBuf>, config: &CliConfig) -> Result<Storage> {
    let path = match db_path.or_else(|| config.default.db_path.clone()) {
        Some(path) => path,
        None => paths::default_db_path()?,
    };
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    Storage::new(&path).with_context(|| format!("Failed to open database {}", path.display()))
}
