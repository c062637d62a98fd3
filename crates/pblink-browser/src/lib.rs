//! Browser access for the story linker.
//!
//! The workflow never talks to an automation library directly. It talks to a
//! [`PageDriver`], a small capability interface over one page of one isolated
//! browser context, obtained from a [`BrowserLauncher`]. This crate ships a
//! single concrete adapter:
//! - [`PlaywrightLauncher`] spawns a generated Node.js bridge script that owns
//!   a Playwright Chromium instance and answers line-delimited JSON commands
//!
//! Selectors everywhere are Playwright selector-engine strings (`css`,
//! `xpath=`, `text=`, `role=`, `:has-text()`), which keeps them plain data.

mod bridge;
mod playwright;
mod probe;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use playwright::{PlaywrightDriver, PlaywrightLauncher};
pub use probe::{RuntimeProbe, ensure_probe_ready, probe_runtime};

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Navigation completion condition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum WaitUntil {
    #[default]
    DomContentLoaded,
    Load,
    NetworkIdle,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ElementState {
    #[default]
    Visible,
    Hidden,
    Attached,
    Detached,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// How to start the browser and its single context.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LaunchOptions {
    #[serde(default = "default_headless")]
    pub headless: bool,
    #[serde(default = "default_browser_args")]
    pub args: Vec<String>,
    #[serde(default)]
    pub viewport: Viewport,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            args: default_browser_args(),
            viewport: Viewport::default(),
            user_agent: default_user_agent(),
            locale: default_locale(),
            timezone: default_timezone(),
        }
    }
}

/// Cookie in the shape the browser context accepts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BrowserCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    /// Unix seconds, `-1` for a session cookie.
    pub expires: f64,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: String,
}

/// One page of one isolated browser context.
///
/// Implementations must be safe to call from a single sequential flow; the
/// workflow never issues concurrent calls against the same driver.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Register a script that runs before any page script on every document.
    /// `source` is a function expression invoked with `arg`.
    async fn add_init_script(&self, source: &str, arg: Value) -> Result<()>;

    async fn add_cookies(&self, cookies: &[BrowserCookie]) -> Result<()>;

    async fn goto(&self, url: &str, wait_until: WaitUntil, timeout: Duration) -> Result<()>;

    async fn current_url(&self) -> Result<String>;

    async fn wait_for(&self, selector: &str, state: ElementState, timeout: Duration)
    -> Result<()>;

    async fn click(&self, selector: &str, timeout: Duration) -> Result<()>;

    async fn hover(&self, selector: &str, timeout: Duration) -> Result<()>;

    async fn fill(&self, selector: &str, text: &str, timeout: Duration) -> Result<()>;

    /// Keyboard press on whatever element has focus.
    async fn press(&self, key: &str) -> Result<()>;

    /// Evaluate a function expression in the page with `arg` and return its
    /// JSON-serializable result.
    async fn evaluate(&self, source: &str, arg: Value) -> Result<Value>;

    async fn screenshot(&self, path: &Path, full_page: bool) -> Result<()>;

    async fn cookies(&self) -> Result<Vec<BrowserCookie>>;

    async fn local_storage(&self) -> Result<BTreeMap<String, String>>;

    /// Release the page, its context and the browser. Calling it again is a no-op.
    async fn close(&self) -> Result<()>;
}

#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn PageDriver>>;
}

fn default_headless() -> bool {
    true
}

fn default_browser_args() -> Vec<String> {
    [
        "--no-sandbox",
        "--disable-setuid-sandbox",
        "--disable-dev-shm-usage",
        "--disable-blink-features=AutomationControlled",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_locale() -> String {
    "en-US".to_string()
}

fn default_timezone() -> String {
    "America/New_York".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn launch_options_fill_defaults_from_partial_toml_like_json() {
        let options: LaunchOptions = serde_json::from_value(json!({ "headless": false })).unwrap();
        assert!(!options.headless);
        assert_eq!(options.viewport, Viewport::default());
        assert!(options.args.iter().any(|arg| arg == "--no-sandbox"));
        assert_eq!(options.locale, "en-US");
    }

    #[test]
    fn wait_states_use_playwright_spelling() {
        assert_eq!(
            serde_json::to_value(WaitUntil::DomContentLoaded).unwrap(),
            json!("domcontentloaded")
        );
        assert_eq!(
            serde_json::to_value(ElementState::Hidden).unwrap(),
            json!("hidden")
        );
    }
}
