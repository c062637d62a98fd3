//! Best-effort screenshots and step logging.
//!
//! Nothing in here returns an error. A failed screenshot is a warning and
//! must never change what the run reports.

use chrono::Utc;
use pblink_browser::PageDriver;
use pblink_models::StepResult;
use std::path::PathBuf;
use tracing::{info, warn};

pub struct Diagnostics {
    dir: Option<PathBuf>,
    full_page: bool,
}

impl Diagnostics {
    /// Screenshots land in `<root>/<run_id>/`.
    pub fn new(root: impl Into<PathBuf>, run_id: &str, full_page: bool) -> Self {
        Self {
            dir: Some(root.into().join(run_id)),
            full_page,
        }
    }

    pub fn disabled() -> Self {
        Self {
            dir: None,
            full_page: false,
        }
    }

    /// Capture a screenshot tagged with `tag` and the current time.
    /// Returns the file path on success.
    pub async fn capture(&self, driver: &dyn PageDriver, tag: &str) -> Option<String> {
        let dir = self.dir.as_ref()?;
        let path = dir.join(format!(
            "{}_{}.png",
            Utc::now().format("%Y%m%dT%H%M%S%3f"),
            slug(tag)
        ));

        if let Err(err) = tokio::fs::create_dir_all(dir).await {
            warn!(tag, "Cannot create screenshot directory: {}", err);
            return None;
        }

        match driver.screenshot(&path, self.full_page).await {
            Ok(()) => Some(path.display().to_string()),
            Err(err) => {
                warn!(tag, "Screenshot failed: {:#}", err);
                None
            }
        }
    }

    /// Log a finished step, attaching a screenshot when asked to.
    pub async fn record_step(
        &self,
        driver: &dyn PageDriver,
        result: StepResult,
        screenshot: bool,
    ) {
        let screenshot_ref = if screenshot {
            self.capture(driver, &result.step_name).await
        } else {
            None
        };
        let result = result.with_screenshot(screenshot_ref);

        if result.success {
            info!(
                step = %result.step_name,
                screenshot = result.screenshot_ref.as_deref().unwrap_or("-"),
                "{}",
                result.message
            );
        } else {
            warn!(
                step = %result.step_name,
                screenshot = result.screenshot_ref.as_deref().unwrap_or("-"),
                "{}",
                result.message
            );
        }
    }
}

fn slug(tag: &str) -> String {
    let mut out = String::with_capacity(tag.len());
    for ch in tag.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pblink_browser::testing::MockDriver;

    #[test]
    fn slug_is_filename_safe() {
        assert_eq!(slug("Project Dropdown Selection"), "project-dropdown-selection");
        assert_eq!(slug("error: Link Button!"), "error-link-button");
    }

    #[tokio::test]
    async fn capture_writes_under_run_directory() {
        let temp = tempfile::tempdir().unwrap();
        let driver = MockDriver::new();
        let diagnostics = Diagnostics::new(temp.path(), "run-1", true);

        let path = diagnostics.capture(&driver, "Push Button").await.unwrap();
        assert!(path.contains("run-1"));
        assert!(path.ends_with("_push-button.png"));
        assert_eq!(driver.screenshots().len(), 1);
    }

    #[tokio::test]
    async fn failed_capture_is_swallowed() {
        let temp = tempfile::tempdir().unwrap();
        let driver = MockDriver::new().failing_screenshots();
        let diagnostics = Diagnostics::new(temp.path(), "run-2", true);

        assert!(diagnostics.capture(&driver, "Link Button").await.is_none());
        diagnostics
            .record_step(&driver, StepResult::ok("Link Button", "clicked"), true)
            .await;
    }

    #[tokio::test]
    async fn disabled_diagnostics_never_touch_the_driver() {
        let driver = MockDriver::new();
        assert!(
            Diagnostics::disabled()
                .capture(&driver, "anything")
                .await
                .is_none()
        );
        assert!(driver.calls().is_empty());
    }
}
