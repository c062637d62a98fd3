//! Captured-session handlers. Responses carry metadata only.

use crate::api::{response::ApiResponse, state::AppState};
use axum::{Json, extract::State, http::StatusCode};
use pblink_models::{AuthBundle, CapturedSessionSummary};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ImportSessionRequest {
    #[serde(flatten)]
    pub bundle: AuthBundle,
    #[serde(default = "default_source")]
    pub source: String,
}

fn default_source() -> String {
    "api".to_string()
}

/// Store a new auth bundle as the newest session
pub async fn import_session(
    State(state): State<AppState>,
    Json(payload): Json<ImportSessionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CapturedSessionSummary>>), (StatusCode, String)> {
    if payload.bundle.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Session has neither cookies nor localStorage".to_string(),
        ));
    }

    let sessions = &state.storage.auth_sessions;
    let saved = sessions
        .save(payload.bundle, payload.source)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    sessions
        .prune(state.keep_sessions)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok_with_message(
            saved.summary(),
            "Session stored",
        )),
    ))
}

pub async fn latest_session(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<CapturedSessionSummary>>, (StatusCode, String)> {
    match state.storage.auth_sessions.latest() {
        Ok(Some(session)) => Ok(Json(ApiResponse::ok(session.summary()))),
        Ok(None) => Err((StatusCode::NOT_FOUND, "No captured session".to_string())),
        Err(e) => Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

pub async fn list_sessions(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<CapturedSessionSummary>>>, (StatusCode, String)> {
    match state.storage.auth_sessions.list() {
        Ok(sessions) => Ok(Json(ApiResponse::ok(sessions))),
        Err(e) => Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}
