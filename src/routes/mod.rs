pub mod api;

use axum::{http::HeaderValue, routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::docs::ApiDoc;
use crate::handlers::{get_state, state_method_not_allowed};
use crate::websocket::handler::websocket_handler;
use crate::AppState;
pub use api::create_api_routes;

/// Assemble the full application router
pub fn create_app(app_state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        // Session endpoint
        .route("/ws", get(websocket_handler))
        // Same query endpoint at its historical path
        .route("/state", get(get_state).fallback(state_method_not_allowed))
        // Mount API routes
        .nest("/api", create_api_routes())
        // Mount Swagger UI
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi()));

    if let Some(dir) = &app_state.config.static_dir {
        info!("Serving static assets from {}", dir);
        app = app.fallback_service(ServeDir::new(dir));
    }

    if let Some(origins) = &app_state.config.cors_origins {
        app = app.layer(cors_layer(origins));
    }

    app.layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

fn cors_layer(origins: &str) -> CorsLayer {
    if origins.trim() == "*" {
        return CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    }
    let allowed: Vec<HeaderValue> = origins
        .split(',')
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring invalid CORS origin '{}': {}", origin, e);
                None
            }
        })
        .collect();
    CorsLayer::new().allow_origin(allowed).allow_methods(Any).allow_headers(Any)
}
