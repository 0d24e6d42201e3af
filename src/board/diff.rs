use super::bitfield::Bitfield;
use crate::models::DiffMessage;

/// Tracks the vector as of the previous diff cycle.
#[derive(Debug, Clone)]
pub struct Differ {
    previous: Vec<u8>,
}

impl Differ {
    /// Start from `live`, so only later changes are reported.
    pub fn new(live: &Bitfield) -> Self {
        Self {
            previous: live.as_bytes().to_vec(),
        }
    }

    /// Collect every bit that changed since the last call, then take a new snapshot.
    pub fn compute(&mut self, live: &Bitfield) -> DiffMessage {
        let mut diff = DiffMessage::default();
        let current = live.as_bytes();

        for (byte_index, (prev, cur)) in self.previous.iter().zip(current).enumerate() {
            let changed = prev ^ cur;
            if changed == 0 {
                continue;
            }
            for offset in 0..8 {
                let mask = 1u8 << offset;
                if changed & mask == 0 {
                    continue;
                }
                let index = (byte_index * 8 + offset) as u32;
                if cur & mask != 0 {
                    diff.one.push(index);
                } else {
                    diff.zero.push(index);
                }
            }
        }

        self.previous.copy_from_slice(current);
        diff
    }
}
