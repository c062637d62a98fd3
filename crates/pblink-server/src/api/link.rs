//! Link trigger and run history handlers.

use crate::api::{response::ApiResponse, state::AppState};
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use chrono::Utc;
use pblink_models::{AuthBundle, LinkRequest, LinkRunRecord, WorkflowOutcome};
use serde::Deserialize;
use tracing::{info, warn};

/// Step reported when the run is cut off by the server-side timeout.
pub const RUN_TIMEOUT_STEP: &str = "Run Timeout";

const DEFAULT_RUNS_LIMIT: usize = 20;
const MAX_RUNS_LIMIT: usize = 200;

/// Link request, optionally carrying its own auth bundle. Without one the
/// newest captured session is used.
#[derive(Debug, Deserialize)]
pub struct LinkPayload {
    #[serde(flatten)]
    pub request: LinkRequest,
    #[serde(default)]
    pub auth: Option<AuthBundle>,
}

#[derive(Debug, Deserialize)]
pub struct RunsQuery {
    pub limit: Option<usize>,
}

/// Run the link workflow. 200 on success, 500 on failure, same body shape.
pub async fn link_story(
    State(state): State<AppState>,
    Json(payload): Json<LinkPayload>,
) -> (StatusCode, Json<WorkflowOutcome>) {
    let started_at_ms = Utc::now().timestamp_millis();
    let auth = match payload.auth {
        Some(bundle) => bundle,
        None => latest_bundle(&state),
    };

    let outcome = match tokio::time::timeout(
        state.run_timeout,
        state.workflow.run(&payload.request, &auth),
    )
    .await
    {
        Ok(outcome) => outcome,
        Err(_) => {
            warn!(
                timeout_secs = state.run_timeout.as_secs(),
                "Link run timed out, browser torn down"
            );
            WorkflowOutcome::failed(
                RUN_TIMEOUT_STEP,
                format!(
                    "run did not finish within {}s",
                    state.run_timeout.as_secs()
                ),
            )
        }
    };

    let runs = &state.storage.link_runs;
    if let Err(err) = runs
        .record(&payload.request, &outcome, started_at_ms)
        .and_then(|_| runs.prune(state.keep_runs))
    {
        warn!("Failed to record link run: {:#}", err);
    }

    let status = if outcome.success {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(outcome))
}

/// Recent link runs, newest first.
pub async fn list_runs(
    State(state): State<AppState>,
    Query(query): Query<RunsQuery>,
) -> Result<Json<ApiResponse<Vec<LinkRunRecord>>>, (StatusCode, String)> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_RUNS_LIMIT)
        .clamp(1, MAX_RUNS_LIMIT);
    match state.storage.link_runs.list(limit) {
        Ok(runs) => Ok(Json(ApiResponse::ok(runs))),
        Err(e) => Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

fn latest_bundle(state: &AppState) -> AuthBundle {
    match state.storage.auth_sessions.latest() {
        Ok(Some(session)) => {
            info!(session = %session.id, "Using latest captured session");
            session.bundle
        }
        Ok(None) => {
            warn!("No captured session stored, running without auth");
            AuthBundle::default()
        }
        Err(err) => {
            warn!("Failed to load captured session: {:#}", err);
            AuthBundle::default()
        }
    }
}
