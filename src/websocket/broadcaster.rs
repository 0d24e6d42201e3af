//! Periodic diff, full-state and persistence cycles, and the fan-out task that
//! delivers their messages to every session.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::board::persist::Persistence;
use crate::board::SharedBoard;
use crate::models::encode;
use crate::AppState;

/// Messages waiting for fan-out. Small: producers wait rather than pile up snapshots.
const OUTBOUND_CAPACITY: usize = 16;

/// Start the three periodic cycles and the fan-out task.
pub fn spawn_broadcast_tasks(app_state: &Arc<AppState>) -> Vec<JoinHandle<()>> {
    let config = &app_state.config;
    let (outbound, outbound_rx) = mpsc::channel::<Arc<str>>(OUTBOUND_CAPACITY);

    vec![
        tokio::spawn(run_fan_out(app_state.board.clone(), outbound_rx)),
        tokio::spawn(run_diff_cycle(app_state.board.clone(), outbound.clone(), config.diff_interval())),
        tokio::spawn(run_full_state_cycle(app_state.board.clone(), outbound, config.full_state_interval())),
        tokio::spawn(run_persist_cycle(
            app_state.board.clone(),
            app_state.persistence.clone(),
            config.persist_interval(),
        )),
    ]
}

fn ticker(period: Duration) -> tokio::time::Interval {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

/// Broadcast the bits changed since the previous cycle, if any.
async fn run_diff_cycle(board: SharedBoard, outbound: mpsc::Sender<Arc<str>>, period: Duration) {
    let mut ticker = ticker(period);
    // Skip the first tick since it fires immediately
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let Some(msg) = diff_cycle(&board).await else {
            continue;
        };
        if outbound.send(msg).await.is_err() {
            break;
        }
    }
}

/// One diff cycle. Returns the encoded diff when anything changed.
pub async fn diff_cycle(board: &SharedBoard) -> Option<Arc<str>> {
    let diff = board.lock().await.compute_diff();
    if diff.is_empty() {
        return None;
    }
    debug!("Queued state diff ({} changed bits)", diff.len());
    Some(encode(&diff))
}

/// Periodically resynchronise every session with the full vector.
async fn run_full_state_cycle(board: SharedBoard, outbound: mpsc::Sender<Arc<str>>, period: Duration) {
    let mut ticker = ticker(period);
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let msg = full_state_cycle(&board).await;
        if outbound.send(msg).await.is_err() {
            break;
        }
    }
}

/// One full-state cycle: recount `hot` and encode the whole vector.
pub async fn full_state_cycle(board: &SharedBoard) -> Arc<str> {
    let mut board = board.lock().await;
    let msg = encode(&board.full_state());
    debug!(
        "Queued full state ({} hot bits, {} cumulative clicks)",
        board.hot, board.clicks
    );
    msg
}

async fn run_persist_cycle(board: SharedBoard, persistence: Persistence, period: Duration) {
    let mut ticker = ticker(period);
    ticker.tick().await;

    loop {
        ticker.tick().await;
        persist_cycle(&board, &persistence).await;
    }
}

/// Save under the board lock. Failures are logged; the next cycle tries again.
pub async fn persist_cycle(board: &SharedBoard, persistence: &Persistence) {
    let board = board.lock().await;
    if let Err(e) = persistence.save(&board).await {
        error!("Error saving bitfield to {}: {}", persistence.path().display(), e);
    }
}

/// Deliver each queued message to every session, followed by its score.
async fn run_fan_out(board: SharedBoard, mut outbound_rx: mpsc::Receiver<Arc<str>>) {
    while let Some(msg) = outbound_rx.recv().await {
        let mut board = board.lock().await;
        let dropped = board.broadcast(&msg);
        debug!(
            "Sent {} bytes to {} sessions ({} dropped)",
            msg.len(),
            board.sessions.len(),
            dropped
        );
    }
    info!("Broadcast channel closed, fan-out stopped");
}
