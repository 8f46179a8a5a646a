use serde::Serialize;
use strum::{EnumCount, EnumIter, EnumString, FromRepr, IntoStaticStr};

/// Condition stream opcodes. Every instruction is `(op, a, b)`; a script is
/// an AND-chain that ends at `End`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    EnumIter,
    EnumCount,
    FromRepr,
    EnumString,
    IntoStaticStr,
)]
#[repr(u8)]
pub enum CondOp {
    #[strum(serialize = "END")]
    End = 0,
    #[strum(serialize = "TRUE")]
    True = 1,
    #[strum(serialize = "FLAGSET")]
    FlagSet = 2,
    #[strum(serialize = "FLAGCLR")]
    FlagClr = 3,
    #[strum(serialize = "HAS")]
    HasItem = 4,
    #[strum(serialize = "VAREQ")]
    VarEq = 5,
}

/// Action stream opcodes. Instructions run in order until `End`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    EnumIter,
    EnumCount,
    FromRepr,
    EnumString,
    IntoStaticStr,
)]
#[repr(u8)]
pub enum ActOp {
    #[strum(serialize = "END")]
    End = 0,
    #[strum(serialize = "MSG")]
    ShowMsg = 1,
    #[strum(serialize = "SETFLAG")]
    SetFlag = 2,
    #[strum(serialize = "CLRFLAG")]
    ClrFlag = 3,
    #[strum(serialize = "GIVE")]
    GiveItem = 4,
    #[strum(serialize = "TAKE")]
    TakeItem = 5,
    #[strum(serialize = "SETVAR")]
    SetVar = 6,
    #[strum(serialize = "SFX")]
    Sfx = 7,
    #[strum(serialize = "TRANSITION")]
    Transition = 8,
}

impl CondOp {
    /// Number of source operands the mnemonic takes.
    pub const fn arity(self) -> usize {
        match self {
            Self::End | Self::True => 0,
            Self::FlagSet | Self::FlagClr | Self::HasItem => 1,
            Self::VarEq => 2,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        self.into()
    }
}

impl ActOp {
    pub const fn arity(self) -> usize {
        match self {
            Self::End => 0,
            Self::ShowMsg
            | Self::SetFlag
            | Self::ClrFlag
            | Self::GiveItem
            | Self::TakeItem
            | Self::Sfx => 1,
            Self::SetVar | Self::Transition => 2,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        self.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn count() {
        assert_eq!(CondOp::COUNT, 6);
        assert_eq!(ActOp::COUNT, 9);
    }

    #[test]
    fn discriminants() {
        assert_eq!(CondOp::End as u8, 0);
        assert_eq!(CondOp::HasItem as u8, 4);
        assert_eq!(CondOp::VarEq as u8, 5);
        assert_eq!(ActOp::ShowMsg as u8, 1);
        assert_eq!(ActOp::Sfx as u8, 7);
        assert_eq!(ActOp::Transition as u8, 8);
    }

    #[test]
    fn round_trip() {
        for op in CondOp::iter() {
            assert_eq!(CondOp::from_repr(op as u8), Some(op));
        }
        for op in ActOp::iter() {
            assert_eq!(ActOp::from_repr(op as u8), Some(op));
        }
    }

    #[test]
    fn mnemonics() {
        assert_eq!(CondOp::from_str("FLAGSET").ok(), Some(CondOp::FlagSet));
        assert_eq!(CondOp::from_str("HAS").ok(), Some(CondOp::HasItem));
        assert_eq!(ActOp::from_str("GIVE").ok(), Some(ActOp::GiveItem));
        assert_eq!(ActOp::Transition.mnemonic(), "TRANSITION");
        assert_eq!(ActOp::End.mnemonic(), "END");
        assert!(CondOp::from_str("flagset").is_err());
        assert!(ActOp::from_str("JUMP").is_err());
    }

    #[test]
    fn unknown_opcode_has_no_repr() {
        assert_eq!(CondOp::from_repr(6), None);
        assert_eq!(ActOp::from_repr(0xFF), None);
    }
}
