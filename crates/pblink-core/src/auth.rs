//! Auth injector and the reverse direction used by session capture.

use crate::scripts;
use anyhow::Result;
use pblink_browser::{BrowserCookie, PageDriver};
use pblink_models::{AuthBundle, CookieRecord, SameSite};
use serde_json::json;
use tracing::{info, warn};

/// What the injector actually put into the browser context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InjectionReport {
    pub cookies_injected: usize,
    pub cookies_dropped: usize,
    pub local_storage_keys: usize,
}

/// Load the captured session into the context before navigation.
///
/// Never fails: every problem is logged and the navigator's authentication
/// check decides whether the run can go on.
pub async fn inject_auth(
    driver: &dyn PageDriver,
    bundle: &AuthBundle,
    target_domain: &str,
) -> InjectionReport {
    let mut report = InjectionReport::default();

    let cookies: Vec<BrowserCookie> = bundle
        .cookies_for_domain(target_domain)
        .map(to_browser_cookie)
        .collect();
    report.cookies_dropped = bundle.cookies.len() - cookies.len();

    if report.cookies_dropped > 0 {
        warn!(
            dropped = report.cookies_dropped,
            domain = target_domain,
            "Dropping cookies that do not belong to the target domain"
        );
    }

    if cookies.is_empty() {
        warn!(domain = target_domain, "No cookies to inject for target domain");
    } else {
        match driver.add_cookies(&cookies).await {
            Ok(()) => report.cookies_injected = cookies.len(),
            Err(err) => warn!("Cookie injection failed, continuing: {:#}", err),
        }
    }

    if !bundle.local_storage.is_empty() && target_domain.trim().is_empty() {
        warn!("No target domain, skipping local storage injection");
    } else if !bundle.local_storage.is_empty() {
        let arg = json!({
            "domain": target_domain,
            "entries": bundle.local_storage,
        });
        match driver
            .add_init_script(scripts::SEED_LOCAL_STORAGE, arg)
            .await
        {
            Ok(()) => report.local_storage_keys = bundle.local_storage.len(),
            Err(err) => warn!("Local storage injection failed, continuing: {:#}", err),
        }
    }

    info!(
        cookies = report.cookies_injected,
        dropped = report.cookies_dropped,
        local_storage_keys = report.local_storage_keys,
        "Auth injection finished"
    );
    report
}

/// Map a captured cookie onto the browser schema with session-cookie defaults.
pub fn to_browser_cookie(cookie: &CookieRecord) -> BrowserCookie {
    BrowserCookie {
        name: cookie.name.clone(),
        value: cookie.value.clone(),
        domain: cookie.domain.clone(),
        path: cookie
            .path
            .clone()
            .filter(|path| !path.is_empty())
            .unwrap_or_else(|| "/".to_string()),
        expires: cookie.expires.unwrap_or(-1.0),
        http_only: cookie.http_only.unwrap_or(false),
        secure: cookie.secure.unwrap_or(false),
        same_site: same_site_name(cookie.same_site.unwrap_or_default()).to_string(),
    }
}

pub fn from_browser_cookie(cookie: &BrowserCookie) -> CookieRecord {
    CookieRecord {
        name: cookie.name.clone(),
        value: cookie.value.clone(),
        domain: cookie.domain.clone(),
        path: Some(cookie.path.clone()),
        expires: (cookie.expires >= 0.0).then_some(cookie.expires),
        http_only: Some(cookie.http_only),
        secure: Some(cookie.secure),
        same_site: match cookie.same_site.to_ascii_lowercase().as_str() {
            "strict" => Some(SameSite::Strict),
            "none" => Some(SameSite::None),
            "lax" => Some(SameSite::Lax),
            _ => None,
        },
    }
}

/// Read the live session out of a logged-in page.
pub async fn capture_auth(driver: &dyn PageDriver, target_domain: &str) -> Result<AuthBundle> {
    let cookies = driver
        .cookies()
        .await?
        .iter()
        .filter(|cookie| cookie.domain.contains(target_domain))
        .map(from_browser_cookie)
        .collect();
    let local_storage = driver.local_storage().await?;

    Ok(AuthBundle {
        cookies,
        local_storage,
    })
}

fn same_site_name(same_site: SameSite) -> &'static str {
    match same_site {
        SameSite::Strict => "Strict",
        SameSite::Lax => "Lax",
        SameSite::None => "None",
    }
}
