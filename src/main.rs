mod models;
mod handlers;
mod routes;
mod docs;
mod config;
mod board;
mod websocket;

use std::panic;
use std::sync::Arc;
use board::gate::MutationGate;
use board::persist::Persistence;
use board::{Board, SharedBoard, BITFIELD_BITS};
use config::Config;
use routes::create_app;
use tracing::{info, error, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use websocket::broadcaster::{persist_cycle, spawn_broadcast_tasks};

/// State shared by every request handler and background task
pub struct AppState {
    pub board: SharedBoard,
    pub gate: MutationGate,
    pub persistence: Persistence,
    pub config: Config,
}

impl AppState {
    pub fn new(board: Board, config: Config) -> Self {
        Self {
            board: board.shared(),
            gate: MutationGate::from_config(&config),
            persistence: Persistence::new(&config.state_file),
            config,
        }
    }
}

#[tokio::main]
async fn main() {

    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Load configuration before tracing so LOG_LEVEL can shape the default filter
    let config_result = Config::load();
    let log_level = config_result
        .as_ref()
        .map(|config| config.log_level.clone())
        .unwrap_or_else(|_| "info".to_string());

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            // Default to the configured level, but allow debug for our app
            format!("flipboard=debug,tower_http=debug,axum::rejection=trace,{}", log_level).into()
        }))
        .init();

    info!("Starting server...");

    let config = config_result.unwrap_or_else(|e| {
        error!("Failed to load configuration: {}", e);
        warn!("Using default configuration");
        Config::default()
    });
    if config.is_development() {
        info!("Running in development mode: {:?}", config);
    }

    // Restore persisted state; serving a partially loaded bitfield is not an option
    let app_state = Arc::new(AppState::new(Board::new(BITFIELD_BITS), config));
    {
        let mut board = app_state.board.lock().await;
        if let Err(e) = app_state.persistence.load(&mut board).await {
            error!("Error loading bitfield from {}: {}", app_state.persistence.path().display(), e);
            std::process::exit(1);
        }
    }

    // Diff, full-state and persistence cycles plus fan-out
    let background = spawn_broadcast_tasks(&app_state);

    let app = create_app(app_state.clone());
    let address = app_state.config.server_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .unwrap_or_else(|_| panic!("Failed to bind to {}", address));

    info!("🚀 Server listening on http://{}", address);
    info!("📡 WebSocket available at ws://{}/ws", address);
    info!("📚 Swagger UI available at http://{}/swagger", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server failed to start");

    for task in background {
        task.abort();
    }

    info!("Saving bitfield before exit");
    persist_cycle(&app_state.board, &app_state.persistence).await;
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl+C, shutting down gracefully...");
}
