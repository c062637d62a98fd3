use anyhow::bail;
use pblink_storage::DEFAULT_KEEP_RUNS;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Database file; the data directory default is used when unset.
    pub db_path: Option<PathBuf>,
    /// Hard cutoff for one link run, including browser teardown.
    pub run_timeout_secs: u64,
    /// Captured sessions kept after each import.
    pub keep_sessions: usize,
    /// Link runs kept in the history after each run.
    pub keep_runs: usize,
    pub log_json: bool,
}

#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    #[serde(default)]
    server: ServerSection,
    #[serde(default)]
    storage: StorageSection,
    #[serde(default)]
    link: LinkSection,
}

#[derive(Debug, Deserialize)]
struct ServerSection {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default)]
    log_json: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_json: false,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct StorageSection {
    #[serde(default)]
    db_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct LinkSection {
    #[serde(default = "default_run_timeout_secs")]
    run_timeout_secs: u64,
    #[serde(default = "default_keep_sessions")]
    keep_sessions: usize,
    #[serde(default = "default_keep_runs")]
    keep_runs: usize,
}

impl Default for LinkSection {
    fn default() -> Self {
        Self {
            run_timeout_secs: default_run_timeout_secs(),
            keep_sessions: default_keep_sessions(),
            keep_runs: default_keep_runs(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_run_timeout_secs() -> u64 {
    300
}

fn default_keep_sessions() -> usize {
    10
}

fn default_keep_runs() -> usize {
    DEFAULT_KEEP_RUNS
}

impl ServerConfig {
    pub fn load() -> anyhow::Result<Self> {
        let config = match load_from_file()? {
            Some(file_config) => Self::from_file(file_config),
            None => Self::from_env(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Retention limits of zero would delete every record right after it
    /// was written.
    fn validate(&self) -> anyhow::Result<()> {
        if self.keep_sessions == 0 {
            bail!("link.keep_sessions must be at least 1");
        }
        if self.keep_runs == 0 {
            bail!("link.keep_runs must be at least 1");
        }
        Ok(())
    }

    fn from_file(file_config: FileConfig) -> Self {
        Self {
            host: file_config.server.host,
            port: file_config.server.port,
            db_path: file_config.storage.db_path,
            run_timeout_secs: file_config.link.run_timeout_secs,
            keep_sessions: file_config.link.keep_sessions,
            keep_runs: file_config.link.keep_runs,
            log_json: file_config.server.log_json,
        }
    }

    fn from_env() -> Self {
        let host = env::var("PBLINK_SERVER_HOST").unwrap_or_else(|_| default_host());
        let port = env::var("PBLINK_SERVER_PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or_else(default_port);
        let db_path = env::var("PBLINK_DB_PATH").ok().map(PathBuf::from);
        let run_timeout_secs = env::var("PBLINK_RUN_TIMEOUT_SECS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or_else(default_run_timeout_secs);
        let log_json = env::var("PBLINK_LOG_FORMAT")
            .map(|value| value.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        Self {
            host,
            port,
            db_path,
            run_timeout_secs,
            keep_sessions: default_keep_sessions(),
            keep_runs: default_keep_runs(),
            log_json,
        }
    }
}

fn load_from_file() -> anyhow::Result<Option<FileConfig>> {
    let config_path = env::var("PBLINK_SERVER_CONFIG").ok();
    let path = if let Some(path) = config_path {
        Some(path)
    } else if Path::new("server.toml").exists() {
        Some("server.toml".to_string())
    } else {
        None
    };

    let Some(path) = path else {
        return Ok(None);
    };

    let contents = fs::read_to_string(&path)
        .map_err(|err| anyhow::anyhow!("Failed to read config {}: {}", path, err))?;
    let parsed: FileConfig = toml::from_str(&contents)
        .map_err(|err| anyhow::anyhow!("Failed to parse config {}: {}", path, err))?;
    Ok(Some(parsed))
}
