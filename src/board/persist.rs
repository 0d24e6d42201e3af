use std::path::{Path, PathBuf};
use tracing::{info, debug};

use super::Board;

/// Longest zig-zag LEB128 encoding of an `i64`.
const MAX_VARINT_LEN: usize = 10;

/// Flat-file snapshot of the bitfield: the raw vector bytes followed by the
/// click counter as a signed varint. No header, no checksum.
#[derive(Debug, Clone)]
pub struct Persistence {
    path: PathBuf,
}

#[derive(Debug)]
pub enum PersistError {
    Io(std::io::Error),
    Truncated { expected: usize, found: usize },
    BadVarint,
}

impl std::fmt::Display for PersistError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PersistError::Io(e) => write!(f, "I/O error: {}", e),
            PersistError::Truncated { expected, found } => {
                write!(f, "state file truncated: expected at least {} bytes, found {}", expected, found)
            }
            PersistError::BadVarint => write!(f, "malformed click counter"),
        }
    }
}

impl std::error::Error for PersistError {}

impl From<std::io::Error> for PersistError {
    fn from(e: std::io::Error) -> Self {
        PersistError::Io(e)
    }
}

impl Persistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the board to disk, replacing any previous file.
    ///
    /// The caller holds the board lock for the whole call so no flip lands mid-write.
    pub async fn save(&self, board: &Board) -> Result<usize, PersistError> {
        let data = encode(board);
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, &data).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        info!("Bitfield saved successfully; {} cumulative clicks", board.clicks);
        Ok(data.len())
    }

    /// Restore the board from disk. Returns `false` when there is no file yet.
    pub async fn load(&self, board: &mut Board) -> Result<bool, PersistError> {
        let data = match tokio::fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No state file at {}, starting empty", self.path.display());
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };

        let (bytes, clicks) = decode(&data, board.bits.byte_len())?;
        board.restore(bytes, clicks);
        info!(
            "Finished loading existing bitfield; {} cumulative clicks, {} hot bits",
            board.clicks, board.hot
        );
        Ok(true)
    }
}

fn encode(board: &Board) -> Vec<u8> {
    let bytes = board.bits.as_bytes();
    let mut data = Vec::with_capacity(bytes.len() + MAX_VARINT_LEN);
    data.extend_from_slice(bytes);
    put_varint(&mut data, board.clicks);
    data
}

fn decode(data: &[u8], byte_len: usize) -> Result<(&[u8], i64), PersistError> {
    if data.len() <= byte_len {
        return Err(PersistError::Truncated {
            expected: byte_len + 1,
            found: data.len(),
        });
    }
    let (bytes, tail) = data.split_at(byte_len);
    let (clicks, used) = read_varint(tail).ok_or(PersistError::BadVarint)?;
    if used < tail.len() {
        debug!("Ignoring {} trailing bytes after click counter", tail.len() - used);
    }
    Ok((bytes, clicks))
}

/// Append `value` as a zig-zag LEB128 varint.
fn put_varint(buf: &mut Vec<u8>, value: i64) {
    let mut ux = (value as u64) << 1;
    if value < 0 {
        ux = !ux;
    }
    while ux >= 0x80 {
        buf.push((ux as u8) | 0x80);
        ux >>= 7;
    }
    buf.push(ux as u8);
}

/// Decode a zig-zag LEB128 varint, returning the value and the bytes consumed.
fn read_varint(bytes: &[u8]) -> Option<(i64, usize)> {
    let mut ux: u64 = 0;
    let mut shift = 0u32;
    for (i, &b) in bytes.iter().enumerate().take(MAX_VARINT_LEN) {
        if i == MAX_VARINT_LEN - 1 && b > 1 {
            return None;
        }
        ux |= ((b & 0x7f) as u64) << shift;
        if b < 0x80 {
            let mut x = (ux >> 1) as i64;
            if ux & 1 != 0 {
                x = !x;
            }
            return Some((x, i + 1));
        }
        shift += 7;
    }
    None
}
