//! Captured ProductBoard session material.
//!
//! `Debug` output of everything in here is redacted: cookie values and
//! local-storage values are credentials and must never reach a log line.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum SameSite {
    #[serde(alias = "strict")]
    Strict,
    #[default]
    #[serde(alias = "lax", alias = "unspecified")]
    Lax,
    #[serde(alias = "none", alias = "no_restriction")]
    None,
}

/// One browser cookie as captured from a logged-in session.
///
/// Optional attributes are filled with session-cookie defaults when the
/// cookie is handed to the browser.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CookieRecord {
    pub name: String,
    pub value: String,
    pub domain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Unix seconds; absent or negative means a session cookie.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<SameSite>,
}

impl CookieRecord {
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: domain.into(),
            path: None,
            expires: None,
            http_only: None,
            secure: None,
            same_site: None,
        }
    }

    /// Substring match on the cookie domain, so `.productboard.com` and
    /// `acme.productboard.com` both match `productboard.com`.
    pub fn matches_domain(&self, target_domain: &str) -> bool {
        !target_domain.is_empty() && self.domain.contains(target_domain)
    }
}

impl fmt::Debug for CookieRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieRecord")
            .field("name", &self.name)
            .field("value", &"<redacted>")
            .field("domain", &self.domain)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Cookies plus local storage of a logged-in ProductBoard session.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthBundle {
    #[serde(default)]
    pub cookies: Vec<CookieRecord>,
    #[serde(default)]
    pub local_storage: BTreeMap<String, String>,
}

impl AuthBundle {
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty() && self.local_storage.is_empty()
    }

    /// Cookies that may be injected for `target_domain`, in captured order.
    pub fn cookies_for_domain<'a>(
        &'a self,
        target_domain: &'a str,
    ) -> impl Iterator<Item = &'a CookieRecord> + 'a {
        self.cookies
            .iter()
            .filter(move |cookie| cookie.matches_domain(target_domain))
    }
}

impl fmt::Debug for AuthBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthBundle")
            .field("cookies", &self.cookies.len())
            .field("local_storage", &self.local_storage.len())
            .finish()
    }
}

/// A stored auth bundle together with where and when it was captured.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedSession {
    pub id: String,
    pub captured_at_ms: i64,
    pub source: String,
    pub bundle: AuthBundle,
}

impl CapturedSession {
    pub fn new(bundle: AuthBundle, source: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            captured_at_ms: chrono::Utc::now().timestamp_millis(),
            source: source.into(),
            bundle,
        }
    }

    pub fn summary(&self) -> CapturedSessionSummary {
        CapturedSessionSummary {
            id: self.id.clone(),
            captured_at_ms: self.captured_at_ms,
            source: self.source.clone(),
            cookie_count: self.bundle.cookies.len(),
            local_storage_count: self.bundle.local_storage.len(),
        }
    }
}

/// Secret-free view of a [`CapturedSession`], safe to return over HTTP.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CapturedSessionSummary {
    pub id: String,
    pub captured_at_ms: i64,
    pub source: String,
    pub cookie_count: usize,
    pub local_storage_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_never_contains_secrets() {
        let mut bundle = AuthBundle::default();
        bundle
            .cookies
            .push(CookieRecord::new("session", "s3cr3t-cookie", ".productboard.com"));
        bundle
            .local_storage
            .insert("token".to_string(), "s3cr3t-token".to_string());

        let rendered = format!("{:?} {:?}", bundle, bundle.cookies[0]);
        assert!(!rendered.contains("s3cr3t"));
        assert!(rendered.contains("session"));
    }

    #[test]
    fn domain_filter_keeps_capture_order() {
        let bundle = AuthBundle {
            cookies: vec![
                CookieRecord::new("a", "1", ".productboard.com"),
                CookieRecord::new("b", "2", "login.microsoftonline.com"),
                CookieRecord::new("c", "3", "acme.productboard.com"),
            ],
            local_storage: BTreeMap::new(),
        };

        let names: Vec<_> = bundle
            .cookies_for_domain("productboard.com")
            .map(|cookie| cookie.name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn same_site_accepts_browser_export_spellings() {
        let cookie: CookieRecord = serde_json::from_str(
            r#"{"name":"a","value":"1","domain":"x","sameSite":"no_restriction","httpOnly":true}"#,
        )
        .unwrap();
        assert_eq!(cookie.same_site, Some(SameSite::None));
        assert_eq!(cookie.http_only, Some(true));
    }
}
