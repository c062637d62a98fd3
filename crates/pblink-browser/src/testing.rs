//! Scriptable in-memory driver for exercising workflows without a browser.
//!
//! Every element is present and every call succeeds unless configured
//! otherwise. Calls are recorded as `op:argument` strings.

use crate::{BrowserCookie, BrowserLauncher, ElementState, LaunchOptions, PageDriver, WaitUntil};
use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct MockConfig {
    landing_url: Option<String>,
    absent: HashSet<String>,
    failing_scripts: HashSet<String>,
    script_results: HashMap<String, Value>,
    fail_goto: bool,
    fail_cookies: bool,
    fail_init_scripts: bool,
    fail_screenshots: bool,
    captured_cookies: Vec<BrowserCookie>,
    captured_local_storage: BTreeMap<String, String>,
}

#[derive(Default)]
struct MockState {
    url: String,
    calls: Vec<String>,
    cookies: Vec<BrowserCookie>,
    init_scripts: Vec<(String, Value)>,
    screenshots: Vec<PathBuf>,
}

#[derive(Default)]
struct Inner {
    config: Mutex<MockConfig>,
    state: Mutex<MockState>,
    close_calls: AtomicUsize,
}

/// Cheap-to-clone handle; clones share configuration and recordings.
#[derive(Clone, Default)]
pub struct MockDriver {
    inner: Arc<Inner>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    fn configure(self, apply: impl FnOnce(&mut MockConfig)) -> Self {
        apply(&mut *self.inner.config.lock().unwrap());
        self
    }

    /// URL reported after any navigation, e.g. a login redirect.
    pub fn landing_on(self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.configure(|config| config.landing_url = Some(url))
    }

    /// Selector that never becomes visible; waits for it to hide succeed.
    pub fn without(self, selector: impl Into<String>) -> Self {
        let selector = selector.into();
        self.configure(|config| {
            config.absent.insert(selector);
        })
    }

    pub fn failing_script(self, source: impl Into<String>) -> Self {
        let source = source.into();
        self.configure(|config| {
            config.failing_scripts.insert(source);
        })
    }

    /// Value returned by `evaluate` for `source`; defaults to `true`.
    pub fn script_result(self, source: impl Into<String>, value: Value) -> Self {
        let source = source.into();
        self.configure(|config| {
            config.script_results.insert(source, value);
        })
    }

    pub fn failing_navigation(self) -> Self {
        self.configure(|config| config.fail_goto = true)
    }

    pub fn failing_cookie_injection(self) -> Self {
        self.configure(|config| config.fail_cookies = true)
    }

    pub fn failing_init_scripts(self) -> Self {
        self.configure(|config| config.fail_init_scripts = true)
    }

    pub fn failing_screenshots(self) -> Self {
        self.configure(|config| config.fail_screenshots = true)
    }

    /// Session material returned by `cookies()` and `local_storage()`.
    pub fn with_session(
        self,
        cookies: Vec<BrowserCookie>,
        local_storage: BTreeMap<String, String>,
    ) -> Self {
        self.configure(|config| {
            config.captured_cookies = cookies;
            config.captured_local_storage = local_storage;
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.inner.state.lock().unwrap().calls.clone()
    }

    pub fn called(&self, call: &str) -> bool {
        self.calls().iter().any(|recorded| recorded == call)
    }

    pub fn injected_cookies(&self) -> Vec<BrowserCookie> {
        self.inner.state.lock().unwrap().cookies.clone()
    }

    pub fn init_scripts(&self) -> Vec<(String, Value)> {
        self.inner.state.lock().unwrap().init_scripts.clone()
    }

    pub fn screenshots(&self) -> Vec<PathBuf> {
        self.inner.state.lock().unwrap().screenshots.clone()
    }

    pub fn close_count(&self) -> usize {
        self.inner.close_calls.load(Ordering::SeqCst)
    }

    fn record(&self, call: String) {
        self.inner.state.lock().unwrap().calls.push(call);
    }

    fn is_absent(&self, selector: &str) -> bool {
        self.inner.config.lock().unwrap().absent.contains(selector)
    }

    fn require_present(&self, selector: &str, timeout: Duration) -> Result<()> {
        if self.is_absent(selector) {
            bail!(
                "Timeout {}ms exceeded waiting for locator('{}')",
                timeout.as_millis(),
                selector
            );
        }
        Ok(())
    }
}

#[async_trait]
impl PageDriver for MockDriver {
    async fn add_init_script(&self, source: &str, arg: Value) -> Result<()> {
        self.record("init_script".to_string());
        if self.inner.config.lock().unwrap().fail_init_scripts {
            bail!("init script rejected");
        }
        self.inner
            .state
            .lock()
            .unwrap()
            .init_scripts
            .push((source.to_string(), arg));
        Ok(())
    }

    async fn add_cookies(&self, cookies: &[BrowserCookie]) -> Result<()> {
        self.record(format!("add_cookies:{}", cookies.len()));
        if self.inner.config.lock().unwrap().fail_cookies {
            bail!("cookie jar rejected cookies");
        }
        self.inner
            .state
            .lock()
            .unwrap()
            .cookies
            .extend_from_slice(cookies);
        Ok(())
    }

    async fn goto(&self, url: &str, _wait_until: WaitUntil, _timeout: Duration) -> Result<()> {
        self.record(format!("goto:{}", url));
        let (fail, landing) = {
            let config = self.inner.config.lock().unwrap();
            (config.fail_goto, config.landing_url.clone())
        };
        if fail {
            bail!("net::ERR_NAME_NOT_RESOLVED at {}", url);
        }
        self.inner.state.lock().unwrap().url = landing.unwrap_or_else(|| url.to_string());
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.inner.state.lock().unwrap().url.clone())
    }

    async fn wait_for(
        &self,
        selector: &str,
        state: ElementState,
        timeout: Duration,
    ) -> Result<()> {
        self.record(format!("wait_for:{:?}:{}", state, selector));
        let absent = self.is_absent(selector);
        match state {
            ElementState::Visible | ElementState::Attached if absent => {
                self.require_present(selector, timeout)
            }
            ElementState::Hidden | ElementState::Detached if !absent => Err(anyhow!(
                "Timeout {}ms exceeded waiting for locator('{}') to be {:?}",
                timeout.as_millis(),
                selector,
                state
            )),
            _ => Ok(()),
        }
    }

    async fn click(&self, selector: &str, timeout: Duration) -> Result<()> {
        self.record(format!("click:{}", selector));
        self.require_present(selector, timeout)
    }

    async fn hover(&self, selector: &str, timeout: Duration) -> Result<()> {
        self.record(format!("hover:{}", selector));
        self.require_present(selector, timeout)
    }

    async fn fill(&self, selector: &str, text: &str, timeout: Duration) -> Result<()> {
        self.record(format!("fill:{}={}", selector, text));
        self.require_present(selector, timeout)
    }

    async fn press(&self, key: &str) -> Result<()> {
        self.record(format!("press:{}", key));
        Ok(())
    }

    async fn evaluate(&self, source: &str, _arg: Value) -> Result<Value> {
        self.record("evaluate".to_string());
        let config = self.inner.config.lock().unwrap();
        if config.failing_scripts.contains(source) {
            bail!("Evaluation failed: script threw");
        }
        Ok(config
            .script_results
            .get(source)
            .cloned()
            .unwrap_or(Value::Bool(true)))
    }

    async fn screenshot(&self, path: &Path, _full_page: bool) -> Result<()> {
        self.record(format!("screenshot:{}", path.display()));
        if self.inner.config.lock().unwrap().fail_screenshots {
            bail!("screenshot failed: target closed");
        }
        self.inner
            .state
            .lock()
            .unwrap()
            .screenshots
            .push(path.to_path_buf());
        Ok(())
    }

    async fn cookies(&self) -> Result<Vec<BrowserCookie>> {
        Ok(self.inner.config.lock().unwrap().captured_cookies.clone())
    }

    async fn local_storage(&self) -> Result<BTreeMap<String, String>> {
        Ok(self
            .inner
            .config
            .lock()
            .unwrap()
            .captured_local_storage
            .clone())
    }

    async fn close(&self) -> Result<()> {
        self.inner.close_calls.fetch_add(1, Ordering::SeqCst);
        self.record("close".to_string());
        Ok(())
    }
}

/// Hands out clones of one [`MockDriver`] and counts launches.
#[derive(Clone, Default)]
pub struct MockLauncher {
    driver: MockDriver,
    fail_launch: bool,
    launches: Arc<AtomicUsize>,
    last_options: Arc<Mutex<Option<LaunchOptions>>>,
}

impl MockLauncher {
    pub fn new(driver: MockDriver) -> Self {
        Self {
            driver,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_launch: true,
            ..Self::default()
        }
    }

    pub fn driver(&self) -> &MockDriver {
        &self.driver
    }

    pub fn launch_count(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn last_options(&self) -> Option<LaunchOptions> {
        self.last_options.lock().unwrap().clone()
    }
}

#[async_trait]
impl BrowserLauncher for MockLauncher {
    async fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn PageDriver>> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        *self.last_options.lock().unwrap() = Some(options.clone());
        if self.fail_launch {
            bail!("Failed to launch chromium: executable doesn't exist");
        }
        Ok(Box::new(self.driver.clone()))
    }
}
