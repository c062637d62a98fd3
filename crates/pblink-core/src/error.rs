//! Fatal workflow errors.
//!
//! Conditions that only degrade a run (auth injection problems, a missing
//! conflict dialog, an unobserved dialog close, screenshot failures) are
//! warnings and never become a [`LinkError`].

/// Step names for the phases that run before the UI step plan.
pub mod steps {
    pub const INPUT_VALIDATION: &str = "Input Validation";
    pub const BROWSER_LAUNCH: &str = "Browser Launch";
    pub const AUTH_INJECTION: &str = "Auth Injection";
    pub const NAVIGATION: &str = "Navigation";
    pub const AUTHENTICATION_CHECK: &str = "Authentication Check";
}

#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("missing required fields: {}", .0.join(", "))]
    InputValidation(Vec<&'static str>),

    #[error("browser launch failed: {0}")]
    Bootstrap(String),

    #[error("navigation to {url} failed: {detail}")]
    Navigation { url: String, detail: String },

    #[error("session is not authenticated, landed on {url}")]
    AuthenticationFailed { url: String },

    #[error("{detail}")]
    StepExhausted { step: String, detail: String },
}

impl LinkError {
    /// Name of the step this error belongs to, as reported in `stepFailed`.
    pub fn step(&self) -> &str {
        match self {
            LinkError::InputValidation(_) => steps::INPUT_VALIDATION,
            LinkError::Bootstrap(_) => steps::BROWSER_LAUNCH,
            LinkError::Navigation { .. } => steps::NAVIGATION,
            LinkError::AuthenticationFailed { .. } => steps::AUTHENTICATION_CHECK,
            LinkError::StepExhausted { step, .. } => step,
        }
    }
}
