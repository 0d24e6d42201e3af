use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

/// Opaque handle of one connected session.
pub type SessionId = Uuid;

/// Outbound queue feeding a session's socket writer.
pub type Outbox = mpsc::Sender<Arc<str>>;

/// Per-connection state: rate limiting, score and the outbound queue.
#[derive(Debug)]
pub struct Session {
    /// Time of the last accepted flip; `None` until the first one, so it is always admitted.
    pub last_flip: Option<Instant>,
    pub score: i64,
    outbox: Outbox,
}

impl Session {
    fn new(outbox: Outbox) -> Self {
        Self {
            last_flip: None,
            score: 0,
            outbox,
        }
    }

    /// Queue a message without waiting. Fails when the writer is gone or the queue is full.
    pub fn send(&self, msg: Arc<str>) -> Result<(), TrySendError<Arc<str>>> {
        self.outbox.try_send(msg)
    }
}

/// Active sessions keyed by their handle. Removing a session drops its outbox,
/// which ends the writer task and closes the connection.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<SessionId, Session>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session and return its handle.
    pub fn add(&mut self, outbox: Outbox) -> SessionId {
        let id = Uuid::new_v4();
        self.sessions.insert(id, Session::new(outbox));
        id
    }

    /// Remove a session. Safe to call on a session that is already gone.
    pub fn remove(&mut self, id: SessionId) -> bool {
        self.sessions.remove(&id).is_some()
    }

    pub fn get(&self, id: SessionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    pub fn get_mut(&mut self, id: SessionId) -> Option<&mut Session> {
        self.sessions.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Apply `f` to every session registered at the time of the call.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(SessionId, &Session),
    {
        let ids: Vec<SessionId> = self.sessions.keys().copied().collect();
        for id in ids {
            if let Some(session) = self.sessions.get(&id) {
                f(id, session);
            }
        }
    }

    /// Deliver `msg` to every session, each followed by its personal message from `personal`.
    ///
    /// A session whose queue rejects either message is removed; delivery to the
    /// others continues. Returns the number of sessions removed.
    pub fn fan_out<F>(&mut self, msg: &Arc<str>, mut personal: F) -> usize
    where
        F: FnMut(&Session) -> Arc<str>,
    {
        let mut failed = Vec::new();
        self.for_each(|id, session| {
            let delivered = session
                .send(msg.clone())
                .and_then(|_| session.send(personal(session)));
            if let Err(e) = delivered {
                debug!("Send to session {} failed: {}", id, e);
                failed.push(id);
            }
        });

        for id in &failed {
            self.remove(*id);
            info!("Session {} dropped during fan-out ({} remaining)", id, self.sessions.len());
        }
        failed.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_is_idempotent() {
        let mut registry = SessionRegistry::new();
        let (tx, _rx) = mpsc::channel(4);
        let id = registry.add(tx);
        assert_eq!(registry.len(), 1);
        assert!(registry.remove(id));
        assert!(!registry.remove(id));
        assert!(registry.is_empty());
    }

    #[test]
    fn new_session_starts_unthrottled_with_zero_score() {
        let mut registry = SessionRegistry::new();
        let (tx, _rx) = mpsc::channel(4);
        let id = registry.add(tx);
        let session = registry.get(id).unwrap();
        assert_eq!(session.score, 0);
        assert!(session.last_flip.is_none());
    }

    #[test]
    fn fan_out_skips_and_removes_dead_sessions() {
        let mut registry = SessionRegistry::new();
        let (tx_a, mut rx_a) = mpsc::channel(4);
        let (tx_b, rx_b) = mpsc::channel(4);
        let (tx_c, mut rx_c) = mpsc::channel(4);
        let a = registry.add(tx_a);
        let b = registry.add(tx_b);
        let c = registry.add(tx_c);
        drop(rx_b);

        let msg: Arc<str> = Arc::from("hello");
        let removed = registry.fan_out(&msg, |s| Arc::from(format!("score {}", s.score)));

        assert_eq!(removed, 1);
        assert!(registry.get(b).is_none());
        assert!(registry.get(a).is_some());
        assert!(registry.get(c).is_some());
        for rx in [&mut rx_a, &mut rx_c] {
            assert_eq!(&*rx.try_recv().unwrap(), "hello");
            assert_eq!(&*rx.try_recv().unwrap(), "score 0");
        }
    }

    #[test]
    fn fan_out_keeps_live_session_with_minimum_queue() {
        let mut registry = SessionRegistry::new();
        let (tx, mut rx) = mpsc::channel(crate::config::MIN_SESSION_QUEUE_CAPACITY);
        let id = registry.add(tx);
        let msg: Arc<str> = Arc::from("x");

        for _ in 0..3 {
            assert_eq!(registry.fan_out(&msg, |_| Arc::from("y")), 0);
            assert!(registry.get(id).is_some());
            assert_eq!(&*rx.try_recv().unwrap(), "x");
            assert_eq!(&*rx.try_recv().unwrap(), "y");
        }
    }

    #[test]
    fn fan_out_drops_session_with_full_queue() {
        let mut registry = SessionRegistry::new();
        let (tx, _rx) = mpsc::channel(1);
        let id = registry.add(tx);
        let msg: Arc<str> = Arc::from("x");
        assert_eq!(registry.fan_out(&msg, |_| Arc::from("y")), 1);
        assert!(registry.get(id).is_none());
    }
}
