use crate::error::LinkError;
use pblink_browser::{PageDriver, WaitUntil};
use std::time::Duration;
use tracing::{info, warn};

const LOGIN_MARKERS: [&str; 3] = ["login", "signin", "sign-in"];

/// Open the story and make sure the session survived the navigation.
///
/// Waits for DOM content only; ProductBoard keeps long-poll connections open
/// so network idle may never come. On success sleeps `settle` once to let the
/// single-page app hydrate.
pub async fn open_story(
    driver: &dyn PageDriver,
    url: &str,
    target_domain: &str,
    timeout: Duration,
    settle: Duration,
) -> Result<String, LinkError> {
    info!(url, "Navigating to story");

    driver
        .goto(url, WaitUntil::DomContentLoaded, timeout)
        .await
        .map_err(|err| LinkError::Navigation {
            url: url.to_string(),
            detail: format!("{:#}", err),
        })?;

    let landed = driver
        .current_url()
        .await
        .map_err(|err| LinkError::Navigation {
            url: url.to_string(),
            detail: format!("could not read current URL: {:#}", err),
        })?;

    verify_authenticated(&landed, target_domain)?;
    info!(url = %landed, "Session authenticated");

    if !settle.is_zero() {
        tokio::time::sleep(settle).await;
    }
    Ok(landed)
}

/// The landed URL must stay on the target domain and not be a login page.
pub fn verify_authenticated(landed_url: &str, target_domain: &str) -> Result<(), LinkError> {
    let lowered = landed_url.to_ascii_lowercase();
    let on_login = LOGIN_MARKERS.iter().any(|marker| lowered.contains(marker));
    let target = target_domain.trim().to_ascii_lowercase();
    let on_domain = !target.is_empty() && lowered.contains(&target);

    if on_login || !on_domain {
        warn!(url = landed_url, on_login, on_domain, "Authentication check failed");
        return Err(LinkError::AuthenticationFailed {
            url: landed_url.to_string(),
        });
    }
    Ok(())
}
