use bitflags::bitflags;
use serde::Serialize;

use crate::UnknownName;

bitflags! {
    /// Verbs an object responds to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
    pub struct Verbs: u8 {
        const LOOK    = 1 << 0;
        const TAKE    = 1 << 1;
        const USE     = 1 << 2;
        const TALK    = 1 << 3;
        const OPERATE = 1 << 4;
    }
}

impl Verbs {
    /// Parse a pipe-separated verb list such as `LOOK|USE`.
    pub fn parse_list(list: &str) -> Result<Self, UnknownName> {
        let mut verbs = Self::empty();
        for name in list.split('|').map(str::trim).filter(|n| !n.is_empty()) {
            let upper = name.to_ascii_uppercase();
            verbs |= Self::from_name(&upper).ok_or_else(|| UnknownName::new("verb", name))?;
        }
        Ok(verbs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values() {
        assert_eq!(Verbs::LOOK.bits(), 1);
        assert_eq!(Verbs::TAKE.bits(), 2);
        assert_eq!(Verbs::USE.bits(), 4);
        assert_eq!(Verbs::TALK.bits(), 8);
        assert_eq!(Verbs::OPERATE.bits(), 16);
    }

    #[test]
    fn parse_list() {
        assert_eq!(
            Verbs::parse_list("LOOK|operate").unwrap(),
            Verbs::LOOK | Verbs::OPERATE
        );
        assert!(Verbs::parse_list("LOOK|SMELL").is_err());
    }
}
