use serde::Serialize;
use strum::{EnumCount, EnumIter, EnumString, FromRepr};

/// The 16-entry C64 palette used by tile colors and the global registers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, EnumIter, EnumCount, FromRepr, EnumString,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[repr(u8)]
pub enum Color {
    Black = 0,
    White = 1,
    Red = 2,
    Cyan = 3,
    Purple = 4,
    Green = 5,
    Blue = 6,
    Yellow = 7,
    Orange = 8,
    Brown = 9,
    LightRed = 10,
    #[strum(serialize = "darkgray", serialize = "darkgrey")]
    DarkGray = 11,
    #[strum(serialize = "gray", serialize = "grey")]
    Gray = 12,
    LightGreen = 13,
    LightBlue = 14,
    #[strum(serialize = "lightgray", serialize = "lightgrey")]
    LightGray = 15,
}

impl Color {
    pub const MAX: u8 = 15;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn count() {
        assert_eq!(Color::COUNT, 16);
    }

    #[test]
    fn discriminants() {
        assert_eq!(Color::Black as u8, 0);
        assert_eq!(Color::White as u8, 1);
        assert_eq!(Color::Orange as u8, 8);
        assert_eq!(Color::LightGray as u8, 15);
    }

    #[test]
    fn round_trip() {
        for c in Color::iter() {
            assert_eq!(Color::from_repr(c as u8), Some(c));
        }
    }

    #[test]
    fn names() {
        assert_eq!(Color::from_str("lightblue").ok(), Some(Color::LightBlue));
        assert_eq!(Color::from_str("GREY").ok(), Some(Color::Gray));
        assert_eq!(Color::from_str("darkgrey").ok(), Some(Color::DarkGray));
        assert!(Color::from_str("magenta").is_err());
    }
}
