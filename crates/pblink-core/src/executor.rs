//! UI step executor: walks the step plan, trying each step's strategies in
//! order until one succeeds.

use crate::diagnostics::Diagnostics;
use crate::error::LinkError;
use crate::plan::{OnExhausted, StepPlan, StepSpec, Strategy, Vars};
use crate::scripts;
use anyhow::{Result, anyhow, bail};
use pblink_browser::{ElementState, PageDriver};
use pblink_models::StepResult;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Upper bound for the "is the option list already open" probe.
const OPEN_PROBE_TIMEOUT: Duration = Duration::from_millis(1000);

pub struct StepExecutor<'a> {
    driver: &'a dyn PageDriver,
    diagnostics: &'a Diagnostics,
    vars: &'a Vars,
    default_timeout: Duration,
    guard_timeout: Duration,
}

impl<'a> StepExecutor<'a> {
    pub fn new(
        driver: &'a dyn PageDriver,
        diagnostics: &'a Diagnostics,
        vars: &'a Vars,
        default_timeout: Duration,
        guard_timeout: Duration,
    ) -> Self {
        Self {
            driver,
            diagnostics,
            vars,
            default_timeout,
            guard_timeout,
        }
    }

    /// Run every step in order, stopping at the first fatal exhaustion.
    pub async fn run(&self, plan: &StepPlan) -> Result<(), LinkError> {
        for step in &plan.steps {
            self.run_step(step).await?;
        }
        Ok(())
    }

    pub async fn run_step(&self, step: &StepSpec) -> Result<(), LinkError> {
        let step_timeout = step
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(self.default_timeout);

        if let Some(guard) = &step.guard {
            let selector = self.vars.selector(&guard.selector);
            let wait = guard
                .timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(self.guard_timeout);
            if self
                .driver
                .wait_for(&selector, ElementState::Visible, wait)
                .await
                .is_err()
            {
                info!(step = %step.name, "Not present, skipping");
                return Ok(());
            }
        }

        let total = step.strategies.len();
        let mut last_error = String::new();
        let mut winner = None;

        for (index, strategy) in step.strategies.iter().enumerate() {
            match self.attempt(strategy, step_timeout).await {
                Ok(()) => {
                    debug!(step = %step.name, strategy = %strategy.label(), "Strategy succeeded");
                    winner = Some((index, strategy));
                    break;
                }
                Err(err) => {
                    debug!(
                        step = %step.name,
                        strategy = %strategy.label(),
                        "Strategy {}/{} failed: {:#}",
                        index + 1,
                        total,
                        err
                    );
                    last_error = format!("{:#}", err);
                }
            }
        }

        let message = match winner {
            Some((index, strategy)) => {
                format!("Completed via strategy {}/{}: {}", index + 1, total, strategy.label())
            }
            None if step.on_exhausted == OnExhausted::Warn => {
                warn!(
                    step = %step.name,
                    "All {} strategies failed, continuing: {}",
                    total,
                    last_error
                );
                format!("Continued after all {} strategies failed", total)
            }
            None => {
                let detail = format!(
                    "all {} strategies failed; last error: {}",
                    total, last_error
                );
                self.diagnostics
                    .record_step(
                        self.driver,
                        StepResult::failed(&step.name, &detail),
                        false,
                    )
                    .await;
                return Err(LinkError::StepExhausted {
                    step: step.name.clone(),
                    detail,
                });
            }
        };

        if winner.is_some() {
            for followup in &step.followups {
                if let Err(err) = self.attempt(followup, step_timeout).await {
                    debug!(step = %step.name, strategy = %followup.label(), "Optional follow-up skipped: {:#}", err);
                }
            }
        }

        if step.settle_ms > 0 {
            tokio::time::sleep(Duration::from_millis(step.settle_ms)).await;
        }

        self.diagnostics
            .record_step(
                self.driver,
                StepResult::ok(&step.name, message),
                step.screenshot,
            )
            .await;
        Ok(())
    }

    async fn attempt(&self, strategy: &Strategy, step_timeout: Duration) -> Result<()> {
        match strategy {
            Strategy::Sequence { strategies } => {
                for inner in strategies {
                    self.attempt_single(inner, step_timeout).await?;
                }
                Ok(())
            }
            single => self.attempt_single(single, step_timeout).await,
        }
    }

    async fn attempt_single(&self, strategy: &Strategy, step_timeout: Duration) -> Result<()> {
        let budget = |own: &Option<u64>| own.map(Duration::from_millis).unwrap_or(step_timeout);
        let driver = self.driver;
        let vars = self.vars;

        match strategy {
            Strategy::Click {
                selector,
                timeout_ms,
            } => {
                driver
                    .click(&vars.selector(selector), budget(timeout_ms))
                    .await
            }
            Strategy::Hover {
                selector,
                timeout_ms,
            } => {
                driver
                    .hover(&vars.selector(selector), budget(timeout_ms))
                    .await
            }
            Strategy::HoverClick {
                hover,
                click,
                timeout_ms,
            } => {
                let wait = budget(timeout_ms);
                driver.hover(&vars.selector(hover), wait).await?;
                driver.click(&vars.selector(click), wait).await
            }
            Strategy::Fill {
                selector,
                text,
                dispatch_events,
                then_press,
                timeout_ms,
            } => {
                let selector = vars.selector(selector);
                driver
                    .fill(&selector, &vars.text(text), budget(timeout_ms))
                    .await?;
                if *dispatch_events
                    && let Err(err) = driver
                        .evaluate(
                            scripts::DISPATCH_INPUT_EVENTS,
                            json!({ "selector": selector }),
                        )
                        .await
                {
                    debug!(selector = %selector, "Synthetic input events not dispatched: {:#}", err);
                }
                if let Some(key) = then_press {
                    driver.press(key).await?;
                }
                Ok(())
            }
            Strategy::TypeAhead {
                opener,
                input,
                text,
                option,
                confirm_key,
                timeout_ms,
            } => {
                let wait = budget(timeout_ms);
                driver.click(&vars.selector(opener), wait).await?;
                driver
                    .fill(&vars.selector(input), &vars.text(text), wait)
                    .await?;
                driver
                    .wait_for(&vars.selector(option), ElementState::Visible, wait)
                    .await?;
                driver.press(confirm_key).await
            }
            Strategy::SelectOption {
                opener,
                option,
                timeout_ms,
            } => {
                let wait = budget(timeout_ms);
                let option = vars.selector(option);
                // A previous strategy may have left the list open; clicking
                // the opener again would close it.
                let already_open = driver
                    .wait_for(&option, ElementState::Visible, wait.min(OPEN_PROBE_TIMEOUT))
                    .await
                    .is_ok();
                if !already_open {
                    driver.click(&vars.selector(opener), wait).await?;
                }
                driver.click(&option, wait).await
            }
            Strategy::InjectValue { selector, text } => {
                let value = driver
                    .evaluate(
                        scripts::INJECT_VALUE,
                        json!({ "selector": vars.selector(selector), "value": vars.text(text) }),
                    )
                    .await?;
                ensure_truthy(&value, || format!("no control matched {}", selector))
            }
            Strategy::ScanClick { text, tags } => {
                let needle = vars.text(text);
                let value = driver
                    .evaluate(
                        scripts::SCAN_CLICK,
                        json!({ "text": needle, "tags": tags }),
                    )
                    .await?;
                ensure_truthy(&value, || format!("no visible element contains '{}'", needle))
            }
            Strategy::WaitHidden {
                selector,
                timeout_ms,
            } => {
                driver
                    .wait_for(
                        &vars.selector(selector),
                        ElementState::Hidden,
                        budget(timeout_ms),
                    )
                    .await
            }
            Strategy::ScrollToBottom => driver
                .evaluate(scripts::SCROLL_TO_BOTTOM, Value::Null)
                .await
                .map(|_| ()),
            Strategy::Sequence { .. } => bail!("nested sequences are not supported"),
        }
    }
}

fn ensure_truthy(value: &Value, describe: impl FnOnce() -> String) -> Result<()> {
    match value {
        Value::Bool(true) => Ok(()),
        _ => Err(anyhow!(describe())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::Guard;
    use pblink_browser::testing::MockDriver;
    use pblink_models::LinkRequest;

    fn vars() -> Vars {
        Vars::from_request(&LinkRequest::new(
            "https://acme.productboard.com/detail/1",
            "Platform",
            "4711",
        ))
    }

    fn step(name: &str, strategies: Vec<Strategy>) -> StepSpec {
        StepSpec {
            name: name.to_string(),
            strategies,
            on_exhausted: OnExhausted::Fail,
            guard: None,
            followups: Vec::new(),
            timeout_ms: None,
            settle_ms: 0,
            screenshot: false,
        }
    }

    fn click(selector: &str) -> Strategy {
        Strategy::Click {
            selector: selector.to_string(),
            timeout_ms: None,
        }
    }

    async fn run(driver: &MockDriver, spec: &StepSpec) -> Result<(), LinkError> {
        let diagnostics = Diagnostics::disabled();
        let vars = vars();
        let executor = StepExecutor::new(
            driver,
            &diagnostics,
            &vars,
            Duration::from_millis(100),
            Duration::from_millis(100),
        );
        executor.run_step(spec).await
    }

    #[tokio::test]
    async fn falls_through_to_first_working_strategy() {
        let driver = MockDriver::new().without("#a").without("#b");
        let spec = step("Push Button", vec![click("#a"), click("#b"), click("#c"), click("#d")]);

        run(&driver, &spec).await.unwrap();
        assert!(driver.called("click:#c"));
        assert!(!driver.called("click:#d"));
    }

    #[tokio::test]
    async fn exhaustion_is_tagged_with_step_name() {
        let driver = MockDriver::new().without("#a").without("#b");
        let spec = step("Push Button", vec![click("#a"), click("#b")]);

        match run(&driver, &spec).await.unwrap_err() {
            LinkError::StepExhausted { step, detail } => {
                assert_eq!(step, "Push Button");
                assert!(detail.starts_with("all 2 strategies failed"));
                assert!(detail.contains("#b"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn warn_steps_continue_after_exhaustion() {
        let driver = MockDriver::new().without("#a");
        let mut spec = step("Expand Integrations", vec![click("#a")]);
        spec.on_exhausted = OnExhausted::Warn;

        assert!(run(&driver, &spec).await.is_ok());
    }

    #[tokio::test]
    async fn absent_guard_skips_step_without_trying_strategies() {
        let driver = MockDriver::new().without("#conflict");
        let mut spec = step("Conflict Resolution", vec![click("#keep")]);
        spec.guard = Some(Guard {
            selector: "#conflict".to_string(),
            timeout_ms: Some(50),
        });

        run(&driver, &spec).await.unwrap();
        assert!(!driver.called("click:#keep"));
    }

    #[tokio::test]
    async fn sequence_needs_every_action() {
        let driver = MockDriver::new().without("#link-in-dialog");
        let spec = step(
            "Conflict Resolution",
            vec![
                Strategy::Sequence {
                    strategies: vec![click("#keep"), click("#link-in-dialog")],
                },
                Strategy::Sequence {
                    strategies: vec![click("#keep-alt"), click("#link")],
                },
            ],
        );

        run(&driver, &spec).await.unwrap();
        assert!(driver.called("click:#keep"));
        assert!(driver.called("click:#link"));
    }

    #[tokio::test]
    async fn failed_followup_does_not_fail_step() {
        let driver = MockDriver::new().without("#second-confirm");
        let mut spec = step("Link Button", vec![click("#link")]);
        spec.followups = vec![click("#second-confirm")];

        run(&driver, &spec).await.unwrap();
        assert!(driver.called("click:#second-confirm"));
    }

    #[tokio::test]
    async fn fill_substitutes_story_id_and_presses_tab() {
        let driver = MockDriver::new();
        let spec = step(
            "Work Item ID Entry",
            vec![Strategy::Fill {
                selector: "input".to_string(),
                text: "{story_id}".to_string(),
                dispatch_events: true,
                then_press: Some("Tab".to_string()),
                timeout_ms: None,
            }],
        );

        run(&driver, &spec).await.unwrap();
        assert_eq!(
            driver.calls(),
            vec!["fill:input=4711", "evaluate", "press:Tab"]
        );
    }

    #[tokio::test]
    async fn scan_click_without_hit_fails_strategy() {
        let driver = MockDriver::new().script_result(scripts::SCAN_CLICK, Value::Bool(false));
        let spec = step(
            "Item Preview Selection",
            vec![Strategy::ScanClick {
                text: "{story_id}".to_string(),
                tags: "div".to_string(),
            }],
        );

        let err = run(&driver, &spec).await.unwrap_err();
        assert!(err.to_string().contains("no visible element contains '4711'"));
    }

    #[tokio::test]
    async fn select_option_skips_opener_when_list_is_open() {
        let driver = MockDriver::new();
        let spec = step(
            "Project Dropdown Selection",
            vec![Strategy::SelectOption {
                opener: "#combo".to_string(),
                option: "[role=\"option\"]:has-text(\"{project}\")".to_string(),
                timeout_ms: None,
            }],
        );

        run(&driver, &spec).await.unwrap();
        assert!(!driver.called("click:#combo"));
        assert!(driver.called("click:[role=\"option\"]:has-text(\"Platform\")"));
    }
}
