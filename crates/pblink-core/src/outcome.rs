//! Outcome reporter: folds the workflow result into the caller-facing shape.

use crate::error::LinkError;
use pblink_models::{LinkRequest, WorkflowOutcome};
use tracing::{error, info};

pub fn success_message(request: &LinkRequest) -> String {
    format!(
        "Successfully linked ProductBoard story to ADO work item {} in project {}",
        request.ado_story_id.trim(),
        request.ado_project_name.trim()
    )
}

/// Build the [`WorkflowOutcome`] for a finished run and log it.
pub fn report(request: &LinkRequest, result: Result<(), LinkError>) -> WorkflowOutcome {
    match result {
        Ok(()) => {
            let outcome = WorkflowOutcome::succeeded(success_message(request));
            info!(story = %request.ado_story_id, "{}", outcome.message);
            outcome
        }
        Err(err) => {
            let outcome = WorkflowOutcome::failed(err.step(), err.to_string());
            error!(step = err.step(), "{}", outcome.message);
            outcome
        }
    }
}
