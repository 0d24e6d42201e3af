use axum::{extract::State, http::{Method, StatusCode}, Json};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::models::{ErrorResponse, FullStateMessage};
use crate::AppState;

/// Current contents of the whole bitfield
pub async fn get_state(State(app_state): State<Arc<AppState>>) -> Json<FullStateMessage> {
    let state = app_state.board.lock().await.snapshot();
    debug!("State requested ({} bytes)", state.state.len());
    Json(state)
}

/// The state endpoint is read-only
pub async fn state_method_not_allowed(method: Method) -> (StatusCode, Json<ErrorResponse>) {
    warn!("Rejected {} on state endpoint", method);
    let status = StatusCode::METHOD_NOT_ALLOWED;
    (status, Json(ErrorResponse::new(status, format!("Method {} not allowed, use GET", method))))
}
