use serde::Serialize;
use strum::{EnumCount, EnumIter, EnumString, FromRepr};

/// Screen edge an exit is attached to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, EnumIter, EnumCount, FromRepr, EnumString,
)]
#[repr(u8)]
pub enum ExitEdge {
    #[strum(serialize = "L")]
    Left = 0,
    #[strum(serialize = "R")]
    Right = 1,
    #[strum(serialize = "U")]
    Up = 2,
    #[strum(serialize = "D")]
    Down = 3,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn round_trip() {
        for e in ExitEdge::iter() {
            assert_eq!(ExitEdge::from_repr(e as u8), Some(e));
        }
    }

    #[test]
    fn letters() {
        assert_eq!(ExitEdge::from_str("L").ok(), Some(ExitEdge::Left));
        assert_eq!(ExitEdge::from_str("D").ok(), Some(ExitEdge::Down));
        assert!(ExitEdge::from_str("X").is_err());
        assert!(ExitEdge::from_str("left").is_err());
    }
}
