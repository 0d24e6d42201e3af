use crate::{handlers::{diagnostics, get_state, health_check, ready_check, state_method_not_allowed}, AppState};
use axum::{routing::get, Router};
use std::sync::Arc;

/// Create API routes
pub fn create_api_routes() -> Router<Arc<AppState>> {
    Router::<Arc<AppState>>::new()
        .route("/health", get(health_check))
        .route("/ready", get(ready_check))
        .route("/diagnostics", get(diagnostics))
        .route("/state", get(get_state).fallback(state_method_not_allowed))
}
