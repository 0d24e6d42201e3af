use tokio::time::Instant;
use tracing::{debug, warn};

use crate::board::gate::{FlipOutcome, MutationGate};
use crate::board::sessions::SessionId;
use crate::board::SharedBoard;
use crate::models::FlipMessage;

/// Handle one inbound frame from a session. Returns `None` for frames that are not flip messages.
///
/// The flip is decided and applied under the board lock; a rate-limit penalty
/// is slept off after the lock is released, blocking only this session's reader.
pub async fn handle_flip_message(raw: &[u8], session_id: SessionId, board: &SharedBoard, gate: &MutationGate) -> Option<FlipOutcome> {
    let flip_msg: FlipMessage = match serde_json::from_slice(raw) {
        Ok(msg) => msg,
        Err(e) => {
            warn!("Invalid message format from session {}: {}", session_id, e);
            return None;
        }
    };

    let outcome = {
        let mut board = board.lock().await;
        gate.apply(&mut board, session_id, flip_msg.flip, Instant::now())
    };

    match outcome {
        FlipOutcome::Applied { bit } => {
            debug!("Session {} flipped bit {} to {}", session_id, flip_msg.flip, bit as u8);
        }
        FlipOutcome::RateLimited => {
            let penalty = gate.penalty();
            debug!("Session {} flipping too fast, pausing for {:?}", session_id, penalty);
            tokio::time::sleep(penalty).await;
        }
        FlipOutcome::OutOfBounds | FlipOutcome::UnknownSession => {}
    }
    Some(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn setup() -> (SharedBoard, SessionId, MutationGate, mpsc::Receiver<std::sync::Arc<str>>) {
        let mut board = Board::new(16);
        let (tx, rx) = mpsc::channel(8);
        let id = board.sessions.add(tx);
        let gate = MutationGate::new(
            Duration::from_millis(50),
            Duration::from_millis(500),
            Duration::from_millis(700),
        );
        (board.shared(), id, gate, rx)
    }

    #[tokio::test]
    async fn malformed_frames_are_ignored() {
        let (board, id, gate, _rx) = setup();
        assert_eq!(handle_flip_message(b"{oops", id, &board, &gate).await, None);
        assert_eq!(handle_flip_message(br#"{"flap": 1}"#, id, &board, &gate).await, None);
        assert_eq!(board.lock().await.clicks, 0);
    }

    #[tokio::test]
    async fn out_of_range_index_is_dropped() {
        let (board, id, gate, _rx) = setup();
        let outcome = handle_flip_message(br#"{"flip": 16}"#, id, &board, &gate).await;
        assert_eq!(outcome, Some(FlipOutcome::OutOfBounds));
        assert_eq!(board.lock().await.clicks, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limited_flip_sleeps_without_holding_the_lock() {
        let (board, id, gate, _rx) = setup();
        let outcome = handle_flip_message(br#"{"flip": 1}"#, id, &board, &gate).await;
        assert_eq!(outcome, Some(FlipOutcome::Applied { bit: true }));

        let started = Instant::now();
        let task = {
            let board = board.clone();
            let gate = gate.clone();
            tokio::spawn(async move { handle_flip_message(br#"{"flip": 2}"#, id, &board, &gate).await })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!task.is_finished());
        assert!(board.try_lock().is_ok());

        assert_eq!(task.await.unwrap(), Some(FlipOutcome::RateLimited));
        let waited = started.elapsed();
        assert!(waited >= Duration::from_millis(500), "waited {:?}", waited);
        assert!(waited <= Duration::from_millis(710), "waited {:?}", waited);

        let board = board.lock().await;
        assert_eq!(board.bits.get(2), Some(false));
        assert_eq!(board.clicks, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn flips_spaced_beyond_the_window_are_accepted() {
        let (board, id, gate, _rx) = setup();
        handle_flip_message(br#"{"flip": 4}"#, id, &board, &gate).await;
        tokio::time::sleep(Duration::from_millis(60)).await;
        let outcome = handle_flip_message(br#"{"flip": 4}"#, id, &board, &gate).await;
        assert_eq!(outcome, Some(FlipOutcome::Applied { bit: false }));
        let board = board.lock().await;
        assert_eq!((board.clicks, board.hot), (2, 0));
    }
}
