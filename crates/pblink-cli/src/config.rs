//! CLI configuration file support
//!
//! Loads configuration from ~/.config/pblink/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_LOGIN_URL: &str = "https://app.productboard.com/";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub default: DefaultConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefaultConfig {
    pub db_path: Option<PathBuf>,
    /// ADO project used when `link` is called without `--project`
    pub project: Option<String>,
    /// Page opened by `auth capture`
    pub login_url: Option<String>,
}

impl CliConfig {
    pub fn load() -> Self {
        Self::load_from_path(Self::default_path())
    }

    pub fn load_from_path(path: Option<PathBuf>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content).unwrap_or_else(|err| {
                tracing::warn!(path = %path.display(), "Ignoring invalid CLI config: {}", err);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("pblink").join("config.toml"))
    }

    pub fn login_url(&self) -> &str {
        self.default
            .login_url
            .as_deref()
            .unwrap_or(DEFAULT_LOGIN_URL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_gives_defaults() {
        let config = CliConfig::load_from_path(Some(PathBuf::from("/nonexistent/pblink.toml")));
        assert!(config.default.project.is_none());
        assert_eq!(config.login_url(), DEFAULT_LOGIN_URL);
    }

    #[test]
    fn default_project_is_read() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[default]\nproject = \"Platform\"\n").unwrap();

        let config = CliConfig::load_from_path(Some(file.path().to_path_buf()));
        assert_eq!(config.default.project.as_deref(), Some("Platform"));
    }
}
