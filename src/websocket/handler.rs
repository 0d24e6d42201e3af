use std::sync::Arc;
use axum::{
    extract::{State, ws::{Message, WebSocket, WebSocketUpgrade}},
    response::Response,
};
use tokio::sync::mpsc;
use tracing::{info, debug, warn};
use futures_util::{StreamExt, SinkExt};

use crate::AppState;
use crate::models::encode;
use crate::websocket::msg_flip_handler::handle_flip_message;


/// WebSocket handler
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
) -> Response {
    debug!("New WebSocket connection attempt");
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

/// Run one session from registration until its connection fails or closes
async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {

    // Split the socket into sender and receiver
    let (mut sender, mut receiver) = socket.split();
    let (outbox, mut outbox_rx) = mpsc::channel::<Arc<str>>(app_state.config.session_queue_capacity);

    // Register the session and queue its initial snapshot
    let session_id = {
        let mut board = app_state.board.lock().await;
        let session_id = board.sessions.add(outbox.clone());
        let state = encode(&board.snapshot());
        let score = board.score_message(session_id).map(|score| encode(&score));
        // A fresh queue of validated capacity has room for both
        if let Err(e) = outbox.try_send(state) {
            warn!("Initial state for session {} not queued: {}", session_id, e);
        }
        if let Some(score) = score {
            if let Err(e) = outbox.try_send(score) {
                warn!("Initial score for session {} not queued: {}", session_id, e);
            }
        }
        info!("Session {} connected ({} active)", session_id, board.sessions.len());
        session_id
    };
    // Only the registry may keep the queue alive
    drop(outbox);

    // Drain the outbound queue into the socket. Ends when the registry drops the session.
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = outbox_rx.recv().await {
            if sender.send(Message::Text(msg.to_string())).await.is_err() {
                break;
            }
        }
        let _ = sender.close().await;
    });

    // Read flip requests in order, one at a time
    let board = app_state.board.clone();
    let gate = app_state.gate.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(frame) = receiver.next().await {
            match frame {
                Ok(Message::Text(text)) => {
                    handle_flip_message(text.as_bytes(), session_id, &board, &gate).await;
                }
                Ok(Message::Binary(bytes)) => {
                    handle_flip_message(&bytes, session_id, &board, &gate).await;
                }
                Ok(Message::Close(_)) => break,
                Ok(_) => continue,
                Err(e) => {
                    debug!("Read from session {} failed: {}", session_id, e);
                    break;
                }
            }
        }
    });

    // Wait for either task to finish (and finish the other)
    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    let mut board = app_state.board.lock().await;
    board.sessions.remove(session_id);
    info!("Session {} disconnected ({} active)", session_id, board.sessions.len());
}
