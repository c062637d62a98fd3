use crate::LinkRequest;
use serde::{Deserialize, Serialize};

/// Result of one named UI step. Consumed by diagnostics and then dropped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    pub step_name: String,
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot_ref: Option<String>,
}

impl StepResult {
    pub fn ok(step_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            step_name: step_name.into(),
            success: true,
            message: message.into(),
            screenshot_ref: None,
        }
    }

    pub fn failed(step_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            step_name: step_name.into(),
            success: false,
            message: message.into(),
            screenshot_ref: None,
        }
    }

    pub fn with_screenshot(mut self, screenshot_ref: Option<String>) -> Self {
        self.screenshot_ref = screenshot_ref;
        self
    }
}

/// Terminal result handed back to the caller, serialized as
/// `{ success, message, stepFailed? }`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkflowOutcome {
    pub success: bool,
    pub message: String,
    #[serde(
        rename = "stepFailed",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub failed_step: Option<String>,
}

impl WorkflowOutcome {
    pub fn succeeded(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            failed_step: None,
        }
    }

    pub fn failed(step: impl Into<String>, detail: impl AsRef<str>) -> Self {
        let step = step.into();
        Self {
            success: false,
            message: format!("Error during step '{}': {}", step, detail.as_ref()),
            failed_step: Some(step),
        }
    }
}

/// One finished run as kept in the link history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRunRecord {
    pub id: String,
    pub started_at_ms: i64,
    pub finished_at_ms: i64,
    pub request: LinkRequest,
    pub outcome: WorkflowOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn failed_outcome_serializes_step_failed() {
        let outcome = WorkflowOutcome::failed("Link Button", "no match");
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({
                "success": false,
                "message": "Error during step 'Link Button': no match",
                "stepFailed": "Link Button"
            })
        );
    }

    #[test]
    fn success_outcome_omits_step_failed() {
        let value = serde_json::to_value(WorkflowOutcome::succeeded("linked")).unwrap();
        assert!(value.get("stepFailed").is_none());
    }
}
