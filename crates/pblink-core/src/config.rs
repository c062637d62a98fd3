//! Linker configuration.
//!
//! Loaded from `PBLINK_CONFIG` or `./pblink.toml` when present, otherwise
//! defaults; selected environment variables override either source.

use crate::plan::StepPlan;
use anyhow::{Context, Result, bail};
use pblink_browser::{LaunchOptions, PlaywrightLauncher};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LinkerConfig {
    /// Substring that both cookie domains and the post-navigation URL must contain.
    #[serde(default = "default_target_domain")]
    pub target_domain: String,
    #[serde(default = "default_navigation_timeout_secs")]
    pub navigation_timeout_secs: u64,
    /// Fixed wait after navigation for the single-page app to hydrate.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    /// Per-strategy wait when neither the strategy nor its step sets one.
    #[serde(default = "default_strategy_timeout_ms")]
    pub strategy_timeout_ms: u64,
    /// Wait window for step guards that do not set their own.
    #[serde(default = "default_guard_timeout_ms")]
    pub guard_timeout_ms: u64,
    #[serde(default)]
    pub screenshots: ScreenshotConfig,
    #[serde(default)]
    pub launch: LaunchOptions,
    #[serde(default)]
    pub node: NodeConfig,
    /// Step plan file; the built-in plan is used when unset.
    #[serde(default)]
    pub step_plan: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScreenshotConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_screenshot_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_true")]
    pub full_page: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeConfig {
    #[serde(default = "default_node_program")]
    pub program: String,
    /// Directory whose node_modules holds playwright.
    #[serde(default)]
    pub cwd: Option<PathBuf>,
}

impl Default for LinkerConfig {
    fn default() -> Self {
        Self {
            target_domain: default_target_domain(),
            navigation_timeout_secs: default_navigation_timeout_secs(),
            settle_delay_ms: default_settle_delay_ms(),
            strategy_timeout_ms: default_strategy_timeout_ms(),
            guard_timeout_ms: default_guard_timeout_ms(),
            screenshots: ScreenshotConfig::default(),
            launch: LaunchOptions::default(),
            node: NodeConfig::default(),
            step_plan: None,
        }
    }
}

impl Default for ScreenshotConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: default_screenshot_dir(),
            full_page: true,
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            program: default_node_program(),
            cwd: None,
        }
    }
}

impl NodeConfig {
    pub fn launcher(&self) -> PlaywrightLauncher {
        let launcher = PlaywrightLauncher::new().with_node_program(&self.program);
        match &self.cwd {
            Some(cwd) => launcher.with_cwd(cwd),
            None => launcher,
        }
    }
}

impl LinkerConfig {
    pub fn load() -> Result<Self> {
        let mut config = match config_file_path() {
            Some(path) => Self::load_from_path(&path)?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config {}", path.display()))?;
        Ok(config)
    }

    /// Cookie filtering, local-storage seeding and the authentication check
    /// all match on `target_domain`; an empty value would match every origin.
    pub fn validate(&self) -> Result<()> {
        if self.target_domain.trim().is_empty() {
            bail!("target_domain must not be empty");
        }
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(domain) = env::var("PBLINK_TARGET_DOMAIN")
            && !domain.trim().is_empty()
        {
            self.target_domain = domain.trim().to_string();
        }
        if let Some(headless) = env::var("PBLINK_HEADLESS")
            .ok()
            .and_then(|value| parse_bool(&value))
        {
            self.launch.headless = headless;
        }
        if let Ok(dir) = env::var("PBLINK_SCREENSHOT_DIR") {
            self.screenshots.dir = PathBuf::from(dir);
        }
        if let Ok(path) = env::var("PBLINK_STEP_PLAN") {
            self.step_plan = Some(PathBuf::from(path));
        }
    }

    pub fn step_plan(&self) -> Result<StepPlan> {
        match &self.step_plan {
            Some(path) => StepPlan::load(path),
            None => StepPlan::builtin(),
        }
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn strategy_timeout(&self) -> Duration {
        Duration::from_millis(self.strategy_timeout_ms)
    }

    pub fn guard_timeout(&self) -> Duration {
        Duration::from_millis(self.guard_timeout_ms)
    }
}

fn config_file_path() -> Option<PathBuf> {
    if let Ok(path) = env::var("PBLINK_CONFIG") {
        return Some(PathBuf::from(path));
    }
    let local = Path::new("pblink.toml");
    local.exists().then(|| local.to_path_buf())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn default_target_domain() -> String {
    "productboard.com".to_string()
}

fn default_navigation_timeout_secs() -> u64 {
    45
}

fn default_settle_delay_ms() -> u64 {
    5000
}

fn default_strategy_timeout_ms() -> u64 {
    4000
}

fn default_guard_timeout_ms() -> u64 {
    3000
}

fn default_true() -> bool {
    true
}

fn default_screenshot_dir() -> PathBuf {
    env::temp_dir().join("pblink-screenshots")
}

fn default_node_program() -> String {
    "node".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "target_domain = \"acme.productboard.com\"\n\n[launch]\nheadless = false\n"
        )
        .unwrap();

        let config = LinkerConfig::load_from_path(file.path()).unwrap();
        assert_eq!(config.target_domain, "acme.productboard.com");
        assert!(!config.launch.headless);
        assert_eq!(config.navigation_timeout_secs, 45);
        assert_eq!(config.strategy_timeout(), Duration::from_millis(4000));
        assert!(config.screenshots.enabled);
    }

    #[test]
    fn empty_target_domain_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "target_domain = \"  \"").unwrap();

        let err = LinkerConfig::load_from_path(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("target_domain must not be empty"));
    }

    #[test]
    fn default_config_uses_builtin_plan() {
        let plan = LinkerConfig::default().step_plan().unwrap();
        assert_eq!(plan.steps.len(), 10);
    }

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert_eq!(parse_bool("Yes"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
