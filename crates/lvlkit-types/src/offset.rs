//! Offset newtypes.
//!
//! The level format mixes two kinds of 16-bit offsets: section and room
//! pointers are measured from the blob start, while the script offsets stored
//! in object records are measured from the start of the condition or action
//! stream. Keeping them as distinct types stops one being read as the other.

use std::fmt;

use serde::Serialize;

/// Offset from the first byte of a blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct BlobOffset(pub u16);

/// Offset from the first byte of a bytecode stream.
///
/// `StreamOffset::NONE` (0) is the "no script" sentinel: a condition at 0 is
/// always true and an action at 0 does nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct StreamOffset(pub u16);

impl BlobOffset {
    pub const fn get(self) -> usize {
        self.0 as usize
    }

    /// Position `delta` bytes further into the blob, if it still fits in u16.
    pub fn checked_add(self, delta: usize) -> Option<Self> {
        u16::try_from(self.get() + delta).ok().map(Self)
    }
}

impl StreamOffset {
    pub const NONE: Self = Self(0);

    pub const fn get(self) -> usize {
        self.0 as usize
    }

    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    /// Absolute blob position of this offset inside the stream at `base`.
    pub const fn resolve(self, base: BlobOffset) -> usize {
        base.get() + self.get()
    }
}

impl fmt::Display for BlobOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:04X}", self.0)
    }
}

impl fmt::Display for StreamOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "+{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_against_stream_base() {
        let base = BlobOffset(0x120);
        assert_eq!(StreamOffset(9).resolve(base), 0x129);
        assert_eq!(StreamOffset::NONE.resolve(base), 0x120);
    }

    #[test]
    fn checked_add_overflow() {
        assert_eq!(BlobOffset(10).checked_add(5), Some(BlobOffset(15)));
        assert_eq!(BlobOffset(u16::MAX).checked_add(1), None);
    }

    #[test]
    fn display() {
        assert_eq!(BlobOffset(0x16).to_string(), "$0016");
        assert_eq!(StreamOffset(3).to_string(), "+3");
    }
}
