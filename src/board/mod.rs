pub mod bitfield;
pub mod diff;
pub mod gate;
pub mod persist;
pub mod sessions;

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::models::{encode, DiffMessage, FullStateMessage, ScoreMessage};
use bitfield::Bitfield;
use diff::Differ;
use sessions::{SessionId, SessionRegistry};

/// Number of bits in the shared vector.
pub const BITFIELD_BITS: usize = 1024 * 1024;

/// The shared bitfield, its counters and the sessions watching it.
///
/// Everything lives behind one lock: flips, scoring, diffing and fan-out all
/// read and write the same memory.
#[derive(Debug)]
pub struct Board {
    pub bits: Bitfield,
    differ: Differ,
    /// Accepted flips since the vector was created. Never decreases.
    pub clicks: i64,
    /// Number of set bits, adjusted on each flip and recounted on full-state cycles.
    pub hot: i64,
    pub sessions: SessionRegistry,
}

pub type SharedBoard = Arc<Mutex<Board>>;

impl Board {
    pub fn new(bits: usize) -> Self {
        let bits = Bitfield::new(bits);
        Self {
            differ: Differ::new(&bits),
            bits,
            clicks: 0,
            hot: 0,
            sessions: SessionRegistry::new(),
        }
    }

    pub fn shared(self) -> SharedBoard {
        Arc::new(Mutex::new(self))
    }

    /// Replace the vector and click counter with restored values.
    ///
    /// `hot` is recounted and the diff baseline reset so the restore itself is never broadcast.
    pub fn restore(&mut self, bytes: &[u8], clicks: i64) {
        self.bits.copy_from_bytes(bytes);
        self.clicks = clicks;
        self.hot = self.bits.count_ones();
        self.differ = Differ::new(&self.bits);
    }

    /// Bits changed since the previous call.
    pub fn compute_diff(&mut self) -> DiffMessage {
        self.differ.compute(&self.bits)
    }

    /// Recount `hot` exactly and snapshot the whole vector.
    pub fn full_state(&mut self) -> FullStateMessage {
        self.hot = self.bits.count_ones();
        self.snapshot()
    }

    /// Snapshot the vector without touching the counters.
    pub fn snapshot(&self) -> FullStateMessage {
        FullStateMessage {
            state: self.bits.as_bytes().to_vec(),
        }
    }

    pub fn score_message(&self, session_id: SessionId) -> Option<ScoreMessage> {
        self.sessions.get(session_id).map(|session| ScoreMessage {
            score: session.score,
            clicks: self.clicks,
            hot: self.hot,
        })
    }

    /// Send `msg` to every session followed by that session's score. Returns the number of sessions dropped.
    pub fn broadcast(&mut self, msg: &Arc<str>) -> usize {
        let clicks = self.clicks;
        let hot = self.hot;
        self.sessions.fan_out(msg, |session| {
            encode(&ScoreMessage {
                score: session.score,
                clicks,
                hot,
            })
        })
    }
}
