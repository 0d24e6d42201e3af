use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use crate::models::{HealthResponse, ReadyResponse};
use crate::AppState;
use tracing::debug;

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    debug!("Health check requested");
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "Server is running".to_string(),
    })
}

/// Readiness check endpoint
pub async fn ready_check(State(app_state): State<Arc<AppState>>) -> (StatusCode, Json<ReadyResponse>) {
    debug!("Readiness check requested");
    // The router only exists once the bitfield was restored, so reaching the board means we can serve
    let sessions = app_state.board.lock().await.sessions.len() as u32;
    (
        StatusCode::OK,
        Json(ReadyResponse {
            status: "ok".to_string(),
            sessions,
        }),
    )
}
