use bitflags::bitflags;
use serde::Serialize;

use crate::UnknownName;

bitflags! {
    /// Per-tile behavior bits stored in the 16-bit flags field of a tile record.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
    pub struct TileFlags: u16 {
        const SOLID        = 1 << 0;
        const DECOR        = 1 << 1;
        const STANDABLE    = 1 << 2;
        const LADDER       = 1 << 3;
        const DOOR         = 1 << 4;
        const INTERACTABLE = 1 << 5;
        const FLOOR        = 1 << 6;
        const HAZARD       = 1 << 7;
    }
}

impl TileFlags {
    /// Parse a pipe-separated list such as `SOLID|FLOOR`. Empty means none.
    pub fn parse_list(list: &str) -> Result<Self, UnknownName> {
        let mut flags = Self::empty();
        for name in list.split('|').map(str::trim).filter(|n| !n.is_empty()) {
            flags |= Self::from_name(name).ok_or_else(|| UnknownName::new("tile flag", name))?;
        }
        Ok(flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values() {
        assert_eq!(TileFlags::SOLID.bits(), 1);
        assert_eq!(TileFlags::LADDER.bits(), 8);
        assert_eq!(TileFlags::FLOOR.bits(), 64);
        assert_eq!(TileFlags::HAZARD.bits(), 128);
    }

    #[test]
    fn parse_list() {
        let f = TileFlags::parse_list("SOLID|FLOOR").unwrap();
        assert_eq!(f, TileFlags::SOLID | TileFlags::FLOOR);
        assert_eq!(TileFlags::parse_list("").unwrap(), TileFlags::empty());
    }

    #[test]
    fn parse_unknown() {
        let err = TileFlags::parse_list("SOLID|SLIPPERY").unwrap_err();
        assert_eq!(err.name, "SLIPPERY");
    }
}
