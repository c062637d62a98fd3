use pblink_browser::testing::{MockDriver, MockLauncher};
use pblink_core::{LinkWorkflow, LinkerConfig, StepPlan, scripts};
use pblink_models::{AuthBundle, CookieRecord, LinkRequest, WorkflowOutcome};
use serde_json::Value;
use std::sync::Arc;

const STORY_URL: &str = "https://acme.productboard.com/detail/abc123";

const PROJECT_OPENER: &str = r#"[role="dialog"] [role="combobox"]"#;
const PROJECT_INPUT: &str = r#"[role="dialog"] [role="combobox"] input"#;
const PROJECT_OPTION: &str = r#"[role="option"]:has-text("Platform")"#;
const CONFLICT_DIALOG: &str = r#"[role="dialog"]:has-text("conflict")"#;
const KEEP_SOURCE: &str = r#"label:has-text("Keep source data")"#;

fn request() -> LinkRequest {
    LinkRequest::new(STORY_URL, "Platform", "4711")
}

fn auth() -> AuthBundle {
    AuthBundle {
        cookies: vec![
            CookieRecord::new("pb_session", "s3cr3t", ".productboard.com"),
            CookieRecord::new("XSRF-TOKEN", "t0k3n", "acme.productboard.com"),
        ],
        ..AuthBundle::default()
    }
}

fn config() -> LinkerConfig {
    let mut config = LinkerConfig::default();
    config.screenshots.enabled = false;
    config
}

fn workflow(launcher: &Arc<MockLauncher>, config: LinkerConfig) -> LinkWorkflow {
    LinkWorkflow::with_plan(launcher.clone(), config, StepPlan::builtin().unwrap())
}

async fn run_with(driver: MockDriver) -> (WorkflowOutcome, Arc<MockLauncher>) {
    let launcher = Arc::new(MockLauncher::new(driver));
    let outcome = workflow(&launcher, config()).run(&request(), &auth()).await;
    (outcome, launcher)
}

#[tokio::test(start_paused = true)]
async fn every_missing_field_fails_validation_without_a_browser() {
    let cases = [
        LinkRequest::new("", "Platform", "4711"),
        LinkRequest::new(STORY_URL, "", "4711"),
        LinkRequest::new(STORY_URL, "Platform", "   "),
        LinkRequest::default(),
    ];

    for request in cases {
        let launcher = Arc::new(MockLauncher::new(MockDriver::new()));
        let outcome = workflow(&launcher, config()).run(&request, &auth()).await;

        assert!(!outcome.success);
        assert_eq!(outcome.failed_step.as_deref(), Some("Input Validation"));
        assert_eq!(launcher.launch_count(), 0);
        assert_eq!(launcher.driver().close_count(), 0);
    }
}

#[tokio::test(start_paused = true)]
async fn fully_working_page_links_the_story() {
    let (outcome, launcher) = run_with(MockDriver::new()).await;

    assert!(outcome.success, "{}", outcome.message);
    assert!(outcome.failed_step.is_none());
    assert!(outcome.message.contains("4711"));

    let driver = launcher.driver();
    assert!(driver.called(&format!("goto:{}", STORY_URL)));
    assert!(driver.called(r#"click:[data-testid="integrations-section-header"]"#));
    assert!(driver.called(r#"click:button:text-is("Push")"#));
    assert!(driver.called(r#"fill:input[placeholder="Enter work item ID"]=4711"#));
    assert!(driver.called(r#"wait_for:Hidden:[role="dialog"]"#));
    assert_eq!(driver.close_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn launch_failure_reports_browser_launch() {
    let launcher = Arc::new(MockLauncher::failing());
    let outcome = workflow(&launcher, config()).run(&request(), &auth()).await;

    assert_eq!(outcome.failed_step.as_deref(), Some("Browser Launch"));
    assert_eq!(launcher.launch_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn foreign_cookies_are_dropped_without_failing_injection() {
    let launcher = Arc::new(MockLauncher::new(MockDriver::new()));
    let foreign = AuthBundle {
        cookies: vec![CookieRecord::new("sid", "v", "dev.azure.com")],
        ..AuthBundle::default()
    };

    let outcome = workflow(&launcher, config()).run(&request(), &foreign).await;

    assert!(outcome.success);
    assert!(launcher.driver().injected_cookies().is_empty());
}

#[tokio::test(start_paused = true)]
async fn login_redirect_stops_before_any_ui_step() {
    let driver = MockDriver::new().landing_on("https://app.productboard.com/login?next=%2Fdetail");
    let (outcome, launcher) = run_with(driver).await;

    assert!(!outcome.success);
    assert_eq!(outcome.failed_step.as_deref(), Some("Authentication Check"));
    assert!(outcome.message.starts_with("Error during step 'Authentication Check'"));

    let calls = launcher.driver().calls();
    assert!(!calls.iter().any(|call| call.starts_with("click:")));
    assert!(!calls.iter().any(|call| call.starts_with("hover:")));
    assert_eq!(launcher.driver().close_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn type_ahead_failure_falls_back_to_option_click() {
    let driver = MockDriver::new().without(PROJECT_INPUT);
    let (outcome, launcher) = run_with(driver).await;

    assert!(outcome.success, "{}", outcome.message);
    assert!(launcher.driver().called(&format!("click:{}", PROJECT_OPTION)));
}

#[tokio::test(start_paused = true)]
async fn exhausted_project_selection_names_the_step() {
    let driver = MockDriver::new()
        .without(PROJECT_OPENER)
        .without(PROJECT_OPTION)
        .failing_script(scripts::INJECT_VALUE);
    let (outcome, launcher) = run_with(driver).await;

    assert!(!outcome.success);
    assert_eq!(
        outcome.failed_step.as_deref(),
        Some("Project Dropdown Selection")
    );
    assert!(outcome.message.contains("all 3 strategies failed"));

    let calls = launcher.driver().calls();
    assert!(!calls.iter().any(|call| call.starts_with("fill:input[placeholder")));
    assert_eq!(launcher.driver().close_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn injected_value_rejected_by_page_counts_as_failure() {
    let driver = MockDriver::new()
        .without(PROJECT_OPENER)
        .without(PROJECT_OPTION)
        .script_result(scripts::INJECT_VALUE, Value::Bool(false));
    let (outcome, _) = run_with(driver).await;

    assert_eq!(
        outcome.failed_step.as_deref(),
        Some("Project Dropdown Selection")
    );
}

#[tokio::test(start_paused = true)]
async fn browser_is_closed_exactly_once_wherever_the_run_stops() {
    let scenarios = [
        MockDriver::new(),
        MockDriver::new().failing_navigation(),
        MockDriver::new().landing_on("https://accounts.google.com/signin"),
        MockDriver::new()
            .without(r#"button:text-is("Push")"#)
            .without(r#"button[data-testid="integration-push-button"]"#)
            .without(r#"[class*="IntegrationItem"]:has-text("Azure DevOps")"#),
        MockDriver::new()
            .without(r#"[role="dialog"] button:text-is("Link")"#)
            .without(r#"role=button[name="Link"]"#)
            .script_result(scripts::SCAN_CLICK, Value::Bool(false)),
    ];
    let expected = [
        None,
        Some("Navigation"),
        Some("Authentication Check"),
        Some("Push Button"),
        Some("Link Button"),
    ];

    for (driver, expected) in scenarios.into_iter().zip(expected) {
        let (outcome, launcher) = run_with(driver).await;
        assert_eq!(outcome.failed_step.as_deref(), expected);
        assert_eq!(launcher.driver().close_count(), 1);
    }
}

#[tokio::test(start_paused = true)]
async fn screenshot_failures_never_change_the_outcome() {
    let temp = tempfile::tempdir().unwrap();
    let mut config = config();
    config.screenshots.enabled = true;
    config.screenshots.dir = temp.path().to_path_buf();

    let launcher = Arc::new(MockLauncher::new(MockDriver::new().failing_screenshots()));
    let outcome = workflow(&launcher, config.clone())
        .run(&request(), &auth())
        .await;
    assert!(outcome.success, "{}", outcome.message);
    assert!(
        launcher
            .driver()
            .calls()
            .iter()
            .any(|call| call.starts_with("screenshot:"))
    );

    let launcher = Arc::new(MockLauncher::new(
        MockDriver::new()
            .failing_screenshots()
            .landing_on("https://app.productboard.com/sign-in"),
    ));
    let outcome = workflow(&launcher, config).run(&request(), &auth()).await;
    assert_eq!(outcome.failed_step.as_deref(), Some("Authentication Check"));
}

#[tokio::test(start_paused = true)]
async fn screenshots_are_written_per_step_and_on_error() {
    let temp = tempfile::tempdir().unwrap();
    let mut config = config();
    config.screenshots.enabled = true;
    config.screenshots.dir = temp.path().to_path_buf();

    let launcher = Arc::new(MockLauncher::new(
        MockDriver::new()
            .without(PROJECT_OPENER)
            .without(PROJECT_OPTION)
            .failing_script(scripts::INJECT_VALUE),
    ));
    workflow(&launcher, config).run(&request(), &auth()).await;

    let shots = launcher.driver().screenshots();
    let names: Vec<String> = shots
        .iter()
        .filter_map(|path| path.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .collect();
    assert!(names.iter().any(|name| name.ends_with("_story-loaded.png")));
    assert!(names.iter().any(|name| name.ends_with("_push-button.png")));
    assert!(
        names
            .iter()
            .any(|name| name.ends_with("_error-project-dropdown-selection.png"))
    );
    assert!(shots.iter().all(|path| path.starts_with(temp.path())));
}

#[tokio::test(start_paused = true)]
async fn absent_conflict_dialog_is_the_expected_path() {
    let driver = MockDriver::new().without(CONFLICT_DIALOG);
    let (outcome, launcher) = run_with(driver).await;

    assert!(outcome.success, "{}", outcome.message);
    assert!(!launcher.driver().called(&format!("click:{}", KEEP_SOURCE)));
}

#[tokio::test(start_paused = true)]
async fn present_conflict_dialog_keeps_source_and_links() {
    let (outcome, launcher) = run_with(MockDriver::new()).await;

    assert!(outcome.success, "{}", outcome.message);
    let driver = launcher.driver();
    assert!(driver.called(&format!("click:{}", KEEP_SOURCE)));
    assert!(driver.called(&format!(
        "click:{} button:text-is(\"Link\")",
        CONFLICT_DIALOG
    )));
}

#[tokio::test(start_paused = true)]
async fn outcome_never_contains_session_secrets() {
    let driver = MockDriver::new().landing_on("https://app.productboard.com/login");
    let (outcome, _) = run_with(driver).await;

    let json = serde_json::to_string(&outcome).unwrap();
    assert!(!json.contains("s3cr3t"));
    assert!(!json.contains("t0k3n"));
    assert!(json.contains("\"stepFailed\""));
}
