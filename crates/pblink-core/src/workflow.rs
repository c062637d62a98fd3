//! The story-link workflow: bootstrap, inject auth, navigate, run the step
//! plan, report. The browser is closed exactly once on every path that
//! acquired it.

use crate::auth::{capture_auth, inject_auth};
use crate::config::LinkerConfig;
use crate::diagnostics::Diagnostics;
use crate::error::LinkError;
use crate::executor::StepExecutor;
use crate::navigator::open_story;
use crate::outcome::report;
use crate::plan::{StepPlan, Vars};
use crate::session::bootstrap;
use anyhow::{Context, Result};
use pblink_browser::{BrowserLauncher, PageDriver, WaitUntil};
use pblink_models::{AuthBundle, LinkRequest, WorkflowOutcome};
use std::future::Future;
use std::sync::Arc;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct LinkWorkflow {
    launcher: Arc<dyn BrowserLauncher>,
    config: LinkerConfig,
    plan: StepPlan,
}

impl LinkWorkflow {
    /// Build a workflow using the step plan the config points at.
    pub fn new(launcher: Arc<dyn BrowserLauncher>, config: LinkerConfig) -> Result<Self> {
        let plan = config.step_plan()?;
        Ok(Self::with_plan(launcher, config, plan))
    }

    pub fn with_plan(
        launcher: Arc<dyn BrowserLauncher>,
        config: LinkerConfig,
        plan: StepPlan,
    ) -> Self {
        Self {
            launcher,
            config,
            plan,
        }
    }

    pub fn config(&self) -> &LinkerConfig {
        &self.config
    }

    pub fn plan(&self) -> &StepPlan {
        &self.plan
    }

    /// Run one link attempt in its own browser instance.
    pub async fn run(&self, request: &LinkRequest, auth: &AuthBundle) -> WorkflowOutcome {
        let run_id = Uuid::new_v4().to_string();
        let span = info_span!("link_run", run_id = %run_id, story = %request.ado_story_id.trim());
        let result = self.run_inner(&run_id, request, auth).instrument(span).await;
        report(request, result)
    }

    async fn run_inner(
        &self,
        run_id: &str,
        request: &LinkRequest,
        auth: &AuthBundle,
    ) -> Result<(), LinkError> {
        let missing = request.missing_fields();
        if !missing.is_empty() {
            return Err(LinkError::InputValidation(missing));
        }

        let diagnostics = if self.config.screenshots.enabled {
            Diagnostics::new(
                &self.config.screenshots.dir,
                run_id,
                self.config.screenshots.full_page,
            )
        } else {
            Diagnostics::disabled()
        };

        let driver = bootstrap(self.launcher.as_ref(), &self.config.launch).await?;

        let result = self
            .drive(driver.as_ref(), &diagnostics, request, auth)
            .await;

        if let Err(err) = &result {
            diagnostics
                .capture(driver.as_ref(), &format!("error {}", err.step()))
                .await;
        }

        if let Err(err) = driver.close().await {
            warn!("Browser close failed: {:#}", err);
        }
        result
    }

    async fn drive(
        &self,
        driver: &dyn PageDriver,
        diagnostics: &Diagnostics,
        request: &LinkRequest,
        auth: &AuthBundle,
    ) -> Result<(), LinkError> {
        inject_auth(driver, auth, &self.config.target_domain).await;

        open_story(
            driver,
            request.pb_story_url.trim(),
            &self.config.target_domain,
            self.config.navigation_timeout(),
            self.config.settle_delay(),
        )
        .await?;
        diagnostics.capture(driver, "story loaded").await;

        let vars = Vars::from_request(request);
        StepExecutor::new(
            driver,
            diagnostics,
            &vars,
            self.config.strategy_timeout(),
            self.config.guard_timeout(),
        )
        .run(&self.plan)
        .await
    }
}

/// Open `login_url` in a headed browser, wait for `confirmed` to resolve and
/// read the resulting session back out.
pub async fn capture_session<F>(
    launcher: &dyn BrowserLauncher,
    config: &LinkerConfig,
    login_url: &str,
    confirmed: F,
) -> Result<AuthBundle>
where
    F: Future<Output = Result<()>>,
{
    let mut options = config.launch.clone();
    options.headless = false;

    let driver = bootstrap(launcher, &options).await?;
    let result = async {
        driver
            .goto(login_url, WaitUntil::Load, config.navigation_timeout())
            .await
            .with_context(|| format!("Failed to open {}", login_url))?;
        confirmed.await?;
        capture_auth(driver.as_ref(), &config.target_domain).await
    }
    .await;

    if let Err(err) = driver.close().await {
        warn!("Browser close failed: {:#}", err);
    }

    let bundle = result?;
    info!(
        cookies = bundle.cookies.len(),
        local_storage_keys = bundle.local_storage.len(),
        "Captured session"
    );
    Ok(bundle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pblink_browser::testing::{MockDriver, MockLauncher};
    use pblink_models::CookieRecord;

    #[tokio::test(start_paused = true)]
    async fn capture_session_runs_headed_and_closes() {
        let launcher = MockLauncher::new(MockDriver::new());
        let mut config = LinkerConfig::default();
        config.launch.headless = true;

        let bundle = capture_session(
            &launcher,
            &config,
            "https://app.productboard.com/",
            async { Ok(()) },
        )
        .await
        .unwrap();

        assert!(bundle.is_empty());
        assert_eq!(launcher.last_options().map(|o| o.headless), Some(false));
        assert_eq!(launcher.driver().close_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn capture_session_closes_when_operator_aborts() {
        let launcher = MockLauncher::new(MockDriver::new());
        let result = capture_session(
            &launcher,
            &LinkerConfig::default(),
            "https://app.productboard.com/",
            async { Err(anyhow::anyhow!("aborted")) },
        )
        .await;

        assert!(result.is_err());
        assert_eq!(launcher.driver().close_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn incomplete_request_never_launches() {
        let launcher = Arc::new(MockLauncher::new(MockDriver::new()));
        let workflow = LinkWorkflow::new(launcher.clone(), LinkerConfig::default()).unwrap();

        let auth = AuthBundle {
            cookies: vec![CookieRecord::new("sid", "v", ".productboard.com")],
            ..AuthBundle::default()
        };
        let outcome = workflow
            .run(&LinkRequest::new("https://acme.productboard.com/f/1", " ", ""), &auth)
            .await;

        assert_eq!(outcome.failed_step.as_deref(), Some("Input Validation"));
        assert!(outcome.message.contains("adoProjectName, adoStoryId"));
        assert_eq!(launcher.launch_count(), 0);
    }
}
