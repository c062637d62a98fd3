//! Session bootstrapper: one isolated browser context per run.

use crate::error::LinkError;
use crate::scripts;
use pblink_browser::{BrowserLauncher, LaunchOptions, PageDriver};
use serde_json::json;
use tracing::{debug, info};

/// Launch the browser and register the fingerprint overrides.
///
/// Any failure here is fatal; a half-initialized driver is closed before
/// the error is returned so the caller never owns it.
pub async fn bootstrap(
    launcher: &dyn BrowserLauncher,
    options: &LaunchOptions,
) -> Result<Box<dyn PageDriver>, LinkError> {
    info!(
        headless = options.headless,
        viewport = %format!("{}x{}", options.viewport.width, options.viewport.height),
        locale = %options.locale,
        "Launching browser"
    );

    let driver = launcher
        .launch(options)
        .await
        .map_err(|err| LinkError::Bootstrap(format!("{:#}", err)))?;

    let languages = vec![options.locale.clone(), primary_language(&options.locale)];
    if let Err(err) = driver
        .add_init_script(scripts::STEALTH, json!({ "languages": languages }))
        .await
    {
        let _ = driver.close().await;
        return Err(LinkError::Bootstrap(format!(
            "failed to register init script: {:#}",
            err
        )));
    }

    debug!("Browser context ready");
    Ok(driver)
}

fn primary_language(locale: &str) -> String {
    locale.split('-').next().unwrap_or(locale).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pblink_browser::testing::{MockDriver, MockLauncher};

    #[tokio::test]
    async fn registers_stealth_script_with_locale_languages() {
        let launcher = MockLauncher::new(MockDriver::new());
        let driver = bootstrap(&launcher, &LaunchOptions::default())
            .await
            .unwrap();
        drop(driver);

        let scripts = launcher.driver().init_scripts();
        assert_eq!(scripts.len(), 1);
        assert_eq!(scripts[0].0, scripts::STEALTH);
        assert_eq!(scripts[0].1["languages"], json!(["en-US", "en"]));
    }

    #[tokio::test]
    async fn launch_failure_is_a_bootstrap_error() {
        let launcher = MockLauncher::failing();
        let err = bootstrap(&launcher, &LaunchOptions::default())
            .await
            .err()
            .unwrap();
        assert_eq!(err.step(), "Browser Launch");
    }

    #[tokio::test]
    async fn init_script_failure_closes_the_driver() {
        let launcher = MockLauncher::new(MockDriver::new().failing_init_scripts());
        let err = bootstrap(&launcher, &LaunchOptions::default())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, LinkError::Bootstrap(_)));
        assert_eq!(launcher.driver().close_count(), 1);
    }
}
