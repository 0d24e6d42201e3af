use rand::Rng;
use std::time::Duration;
use tokio::time::Instant;

use super::sessions::SessionId;
use super::Board;
use crate::config::Config;

/// Result of offering one flip request to the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipOutcome {
    /// The bit was toggled to `bit`.
    Applied { bit: bool },
    /// Index outside the vector; dropped without penalty.
    OutOfBounds,
    /// Too soon after the session's last accepted flip; the caller must apply a penalty.
    RateLimited,
    /// The session was already removed from the registry.
    UnknownSession,
}

/// Per-session admission control in front of the bitfield.
#[derive(Debug, Clone)]
pub struct MutationGate {
    min_interval: Duration,
    penalty_min: Duration,
    penalty_max: Duration,
}

impl MutationGate {
    pub fn new(min_interval: Duration, penalty_min: Duration, penalty_max: Duration) -> Self {
        Self {
            min_interval,
            penalty_min,
            penalty_max,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Duration::from_millis(config.min_flip_interval_ms),
            Duration::from_millis(config.penalty_min_ms),
            Duration::from_millis(config.penalty_max_ms),
        )
    }

    /// Decide on a flip and, when admitted, apply it together with the counter and score updates.
    ///
    /// Must be called with the board lock held; never sleeps.
    pub fn apply(&self, board: &mut Board, session_id: SessionId, index: i64, now: Instant) -> FlipOutcome {
        let index = match usize::try_from(index) {
            Ok(index) if index < board.bits.len() => index,
            _ => return FlipOutcome::OutOfBounds,
        };

        let Some(session) = board.sessions.get_mut(session_id) else {
            return FlipOutcome::UnknownSession;
        };
        if let Some(last) = session.last_flip {
            if now.saturating_duration_since(last) < self.min_interval {
                return FlipOutcome::RateLimited;
            }
        }

        let Some(bit) = board.bits.flip(index) else {
            return FlipOutcome::OutOfBounds;
        };
        let new_state = bit as i64;

        // +1 on a transition to one, back to zero on a transition to zero
        session.score = (session.score + new_state) * new_state;
        session.last_flip = Some(now);
        board.clicks += 1;
        board.hot += new_state * 2 - 1;

        FlipOutcome::Applied { bit }
    }

    /// Random backoff for a rate-limited session, uniform over the configured range.
    pub fn penalty(&self) -> Duration {
        let min = self.penalty_min.as_millis() as u64;
        let max = self.penalty_max.as_millis() as u64;
        if min >= max {
            return self.penalty_min;
        }
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn gate() -> MutationGate {
        MutationGate::new(
            Duration::from_millis(50),
            Duration::from_millis(500),
            Duration::from_millis(700),
        )
    }

    fn board_with_session(bits: usize) -> (Board, SessionId, mpsc::Receiver<std::sync::Arc<str>>) {
        let mut board = Board::new(bits);
        let (tx, rx) = mpsc::channel(16);
        let id = board.sessions.add(tx);
        (board, id, rx)
    }

    #[test]
    fn first_flip_is_always_admitted() {
        let (mut board, id, _rx) = board_with_session(8);
        let outcome = gate().apply(&mut board, id, 3, Instant::now());
        assert_eq!(outcome, FlipOutcome::Applied { bit: true });
        assert_eq!(board.clicks, 1);
        assert_eq!(board.hot, 1);
    }

    #[test]
    fn out_of_bounds_is_dropped_without_side_effects() {
        let (mut board, id, _rx) = board_with_session(8);
        let now = Instant::now();
        assert_eq!(gate().apply(&mut board, id, 8, now), FlipOutcome::OutOfBounds);
        assert_eq!(gate().apply(&mut board, id, -1, now), FlipOutcome::OutOfBounds);
        assert_eq!(board.clicks, 0);
        assert!(board.sessions.get(id).unwrap().last_flip.is_none());
        // no penalty was recorded, so an immediate valid flip still passes
        assert!(matches!(gate().apply(&mut board, id, 0, now), FlipOutcome::Applied { .. }));
    }

    #[test]
    fn flips_inside_the_window_are_rate_limited() {
        let (mut board, id, _rx) = board_with_session(8);
        let gate = gate();
        let start = Instant::now();
        assert!(matches!(gate.apply(&mut board, id, 1, start), FlipOutcome::Applied { .. }));

        let too_soon = start + Duration::from_millis(49);
        assert_eq!(gate.apply(&mut board, id, 2, too_soon), FlipOutcome::RateLimited);
        assert_eq!(board.bits.get(2), Some(false));
        assert_eq!(board.sessions.get(id).unwrap().score, 1);
        assert_eq!(board.clicks, 1);

        let later = start + Duration::from_millis(51);
        assert_eq!(gate.apply(&mut board, id, 2, later), FlipOutcome::Applied { bit: true });
        assert_eq!(board.clicks, 2);
    }

    #[test]
    fn score_counts_consecutive_sets_and_resets_on_clear() {
        let (mut board, id, _rx) = board_with_session(16);
        let gate = gate();
        let mut now = Instant::now();
        for (i, index) in [0, 1, 2].into_iter().enumerate() {
            gate.apply(&mut board, id, index, now);
            assert_eq!(board.sessions.get(id).unwrap().score, i as i64 + 1);
            now += Duration::from_millis(60);
        }
        assert_eq!(gate.apply(&mut board, id, 1, now), FlipOutcome::Applied { bit: false });
        assert_eq!(board.sessions.get(id).unwrap().score, 0);
        now += Duration::from_millis(60);
        gate.apply(&mut board, id, 5, now);
        assert_eq!(board.sessions.get(id).unwrap().score, 1);
    }

    #[test]
    fn double_flip_keeps_hot_and_adds_two_clicks() {
        let (mut board, id, _rx) = board_with_session(64);
        let gate = gate();
        let start = Instant::now();
        gate.apply(&mut board, id, 10, start);
        let hot = board.hot;
        let clicks = board.clicks;

        gate.apply(&mut board, id, 40, start + Duration::from_millis(50));
        gate.apply(&mut board, id, 40, start + Duration::from_millis(100));
        assert_eq!(board.bits.get(40), Some(false));
        assert_eq!(board.hot, hot);
        assert_eq!(board.clicks, clicks + 2);
    }

    #[test]
    fn unknown_session_is_rejected() {
        let (mut board, id, _rx) = board_with_session(8);
        board.sessions.remove(id);
        assert_eq!(gate().apply(&mut board, id, 1, Instant::now()), FlipOutcome::UnknownSession);
        assert_eq!(board.bits.count_ones(), 0);
    }

    #[test]
    fn penalty_stays_within_range() {
        let gate = gate();
        for _ in 0..100 {
            let penalty = gate.penalty();
            assert!(penalty >= Duration::from_millis(500));
            assert!(penalty <= Duration::from_millis(700));
        }
    }
}
