/// Fixed-size bit vector packed 8 bits per byte.
///
/// Bit `i` lives in byte `i / 8` at offset `i % 8` (least significant bit first).
/// The length never changes after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitfield {
    bits: usize,
    bytes: Vec<u8>,
}

impl Bitfield {
    /// Create an all-zero bitfield holding `bits` bits.
    pub fn new(bits: usize) -> Self {
        Self {
            bits,
            bytes: vec![0; bits.div_ceil(8)],
        }
    }

    /// Number of addressable bits.
    pub fn len(&self) -> usize {
        self.bits
    }

    /// Size of the packed representation in bytes.
    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Overwrite the whole vector with `bytes`, which must be exactly `byte_len()` long.
    pub fn copy_from_bytes(&mut self, bytes: &[u8]) {
        self.bytes.copy_from_slice(bytes);
    }

    #[allow(dead_code)]
    pub fn get(&self, index: usize) -> Option<bool> {
        if index >= self.bits {
            return None;
        }
        Some(self.bytes[index / 8] & (1 << (index % 8)) != 0)
    }

    /// Toggle bit `index` and return its new value, or `None` when out of range.
    pub fn flip(&mut self, index: usize) -> Option<bool> {
        if index >= self.bits {
            return None;
        }
        let mask = 1u8 << (index % 8);
        let byte = &mut self.bytes[index / 8];
        *byte ^= mask;
        Some(*byte & mask != 0)
    }

    /// Exact number of set bits. Scans the whole vector.
    pub fn count_ones(&self) -> i64 {
        self.bytes.iter().map(|b| b.count_ones() as i64).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flip_toggles_single_bit() {
        let mut bits = Bitfield::new(16);
        assert_eq!(bits.flip(9), Some(true));
        assert_eq!(bits.as_bytes(), &[0b0000_0000, 0b0000_0010]);
        assert_eq!(bits.get(9), Some(true));
        assert_eq!(bits.get(8), Some(false));
        assert_eq!(bits.flip(9), Some(false));
        assert_eq!(bits.as_bytes(), &[0, 0]);
    }

    #[test]
    fn flip_out_of_range_is_rejected() {
        let mut bits = Bitfield::new(8);
        assert_eq!(bits.flip(8), None);
        assert_eq!(bits.get(8), None);
        assert_eq!(bits.count_ones(), 0);
    }

    #[test]
    fn count_ones_matches_flips() {
        let mut bits = Bitfield::new(1024);
        for i in (0..1024).step_by(3) {
            bits.flip(i);
        }
        assert_eq!(bits.count_ones(), 342);
        assert_eq!(bits.byte_len(), 128);
    }

    #[test]
    fn double_flip_restores_every_index() {
        let mut bits = Bitfield::new(64);
        bits.flip(5);
        let original = bits.clone();
        for i in 0..64 {
            bits.flip(i);
            bits.flip(i);
        }
        assert_eq!(bits, original);
    }
}
