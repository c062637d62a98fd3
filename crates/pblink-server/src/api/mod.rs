pub mod auth;
pub mod link;
pub mod response;
pub mod state;

pub use response::ApiResponse;
pub use state::{AppState, ServerState};

use axum::{
    Json, Router,
    http::{Method, StatusCode, header},
    routing::{get, post},
};
use tower_http::cors::CorsLayer;

#[derive(serde::Serialize)]
struct Health {
    status: String,
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "pblink is working!".to_string(),
    })
}

async fn not_found() -> (StatusCode, Json<ApiResponse<()>>) {
    (StatusCode::NOT_FOUND, Json(ApiResponse::error("Not found")))
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/health", get(health))
        .route("/api/link", post(link::link_story))
        .route("/api/link/runs", get(link::list_runs))
        .route(
            "/api/auth/sessions",
            get(auth::list_sessions).post(auth::import_session),
        )
        .route("/api/auth/sessions/latest", get(auth::latest_session))
        .fallback(not_found)
        .layer(cors)
        .with_state(state)
}
