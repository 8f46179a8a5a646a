/// Why a blob was refused, or which part of it points outside itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BlobError {
    #[error("blob is {len} bytes, shorter than the {need}-byte header")]
    TooShort { len: usize, need: usize },
    #[error("bad magic {found:02X?}, expected {expected:?}")]
    BadMagic { found: [u8; 4], expected: &'static str },
    #[error("unsupported version {found}, expected {expected}")]
    BadVersion { found: u8, expected: u8 },
    #[error("tile record size {0} is smaller than 12 bytes")]
    RecordSize(u8),
    #[error("{what} at offset {offset} needs {size} bytes but the blob ends at {len}")]
    OutOfBounds {
        what: String,
        offset: usize,
        size: usize,
        len: usize,
    },
    #[error("message {id} at offset {offset} is not NUL-terminated")]
    Unterminated { id: u8, offset: usize },
    #[error("start room {room} does not exist")]
    NoStartRoom { room: u8 },
}

impl BlobError {
    pub(crate) fn out_of_bounds(what: impl Into<String>, offset: usize, size: usize, len: usize) -> Self {
        Self::OutOfBounds {
            what: what.into(),
            offset,
            size,
            len,
        }
    }
}

/// Byte at `at`, or 0 past the end.
pub(crate) fn byte(blob: &[u8], at: usize) -> u8 {
    blob.get(at).copied().unwrap_or(0)
}

/// Little-endian u16 at `at`, or 0 when it does not fit.
pub(crate) fn word(blob: &[u8], at: usize) -> u16 {
    match blob.get(at..at.saturating_add(2)) {
        Some(&[lo, hi]) => u16::from_le_bytes([lo, hi]),
        _ => 0,
    }
}

/// `[at, at + size)` lies inside `blob`.
pub(crate) fn fits(blob: &[u8], at: usize, size: usize) -> bool {
    at.checked_add(size).is_some_and(|end| end <= blob.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_past_the_end_are_zero() {
        let blob = [1, 2, 3];
        assert_eq!(byte(&blob, 2), 3);
        assert_eq!(byte(&blob, 3), 0);
        assert_eq!(word(&blob, 1), 0x0302);
        assert_eq!(word(&blob, 2), 0);
        assert_eq!(word(&blob, usize::MAX), 0);
        assert!(fits(&blob, 1, 2));
        assert!(!fits(&blob, 2, 2));
        assert!(!fits(&blob, usize::MAX, 2));
    }
}
