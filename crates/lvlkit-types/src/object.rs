//! Object kinds and the table that routes each kind's source keys onto the
//! generic object record fields.
//!
//! An object record has two generic parameter bytes (`p0`, `p1`) and eight
//! script slots. What a key like `ok=` or `code=` means depends on the object
//! kind; [`ObjectSchema`] is the one place that mapping is written down. The
//! compiler uses it to decide where to write, the runtime to decide where to
//! read, and [`schema_markdown`] renders it for authors.

use std::fmt::Write as _;

use serde::Serialize;
use strum::{EnumCount, EnumIter, EnumString, FromRepr, IntoEnumIterator, IntoStaticStr};

use crate::format::lvl;

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
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum ObjectKind {
    Sign = 1,
    Pickup = 2,
    LockerKeypad = 3,
    BreakerPanel = 4,
    HatchPanel = 5,
    ExitTrigger = 6,
    NpcIntercom = 7,
}

/// A 16-bit script offset field of the object record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, EnumIter, EnumCount)]
pub enum ScriptSlot {
    Cond,
    Look,
    Take,
    Use,
    Talk,
    Operate,
    Alt0,
    Alt1,
}

/// One of the two generic parameter bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ParamSlot {
    P0,
    P1,
}

/// How a parameter key's value is turned into parameter bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ParamEncoding {
    /// Numeric literal 0..=255.
    Literal(ParamSlot),
    /// Item name resolved to its id.
    Item(ParamSlot),
    /// Variable name resolved to its id.
    Var(ParamSlot),
    /// Three-bit pattern 0..=7.
    Bits3(ParamSlot),
    /// Decimal code 0..=999, hundreds in `p0` and the remainder in `p1`.
    KeypadCode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParamBinding {
    pub key: &'static str,
    pub encoding: ParamEncoding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScriptBinding {
    pub key: &'static str,
    pub slot: ScriptSlot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ObjectSchema {
    pub kind: ObjectKind,
    pub summary: &'static str,
    pub params: &'static [ParamBinding],
    pub scripts: &'static [ScriptBinding],
}

/// Parameter keys accepted by every kind. Kind-specific keys override them.
pub const COMMON_PARAMS: &[ParamBinding] = &[
    ParamBinding {
        key: "p0",
        encoding: ParamEncoding::Literal(ParamSlot::P0),
    },
    ParamBinding {
        key: "p1",
        encoding: ParamEncoding::Literal(ParamSlot::P1),
    },
];

/// Script keys accepted by every kind.
pub const COMMON_SCRIPTS: &[ScriptBinding] = &[
    ScriptBinding {
        key: "cond",
        slot: ScriptSlot::Cond,
    },
    ScriptBinding {
        key: "look",
        slot: ScriptSlot::Look,
    },
    ScriptBinding {
        key: "take",
        slot: ScriptSlot::Take,
    },
    ScriptBinding {
        key: "use",
        slot: ScriptSlot::Use,
    },
    ScriptBinding {
        key: "talk",
        slot: ScriptSlot::Talk,
    },
    ScriptBinding {
        key: "operate",
        slot: ScriptSlot::Operate,
    },
];

const OK_BAD: &[ScriptBinding] = &[
    ScriptBinding {
        key: "ok",
        slot: ScriptSlot::Alt0,
    },
    ScriptBinding {
        key: "bad",
        slot: ScriptSlot::Alt1,
    },
];

static SCHEMAS: [ObjectSchema; ObjectKind::COUNT] = [
    ObjectSchema {
        kind: ObjectKind::Sign,
        summary: "static text; verbs run their own slots",
        params: &[],
        scripts: &[],
    },
    ObjectSchema {
        kind: ObjectKind::Pickup,
        summary: "TAKE gives item p0, then runs the take slot",
        params: &[ParamBinding {
            key: "item",
            encoding: ParamEncoding::Item(ParamSlot::P0),
        }],
        scripts: &[],
    },
    ObjectSchema {
        kind: ObjectKind::LockerKeypad,
        summary: "entering a code runs alt0 on a match, alt1 otherwise",
        params: &[ParamBinding {
            key: "code",
            encoding: ParamEncoding::KeypadCode,
        }],
        scripts: OK_BAD,
    },
    ObjectSchema {
        kind: ObjectKind::BreakerPanel,
        summary: "switches toggle bits of var p0; OPERATE runs alt0 when it equals p1, alt1 otherwise",
        params: &[
            ParamBinding {
                key: "var",
                encoding: ParamEncoding::Var(ParamSlot::P0),
            },
            ParamBinding {
                key: "expect",
                encoding: ParamEncoding::Bits3(ParamSlot::P1),
            },
        ],
        scripts: OK_BAD,
    },
    ObjectSchema {
        kind: ObjectKind::HatchPanel,
        summary: "using item p0 runs alt0, item p1 runs alt1, anything else runs the use slot",
        params: &[
            ParamBinding {
                key: "fuse_item",
                encoding: ParamEncoding::Item(ParamSlot::P0),
            },
            ParamBinding {
                key: "badge_item",
                encoding: ParamEncoding::Item(ParamSlot::P1),
            },
        ],
        scripts: &[
            ScriptBinding {
                key: "fuse",
                slot: ScriptSlot::Alt0,
            },
            ScriptBinding {
                key: "badge",
                slot: ScriptSlot::Alt1,
            },
            ScriptBinding {
                key: "reject",
                slot: ScriptSlot::Use,
            },
        ],
    },
    ObjectSchema {
        kind: ObjectKind::ExitTrigger,
        summary: "verbs run their own slots, usually gated by cond",
        params: &[],
        scripts: &[],
    },
    ObjectSchema {
        kind: ObjectKind::NpcIntercom,
        summary: "verbs run their own slots",
        params: &[],
        scripts: &[],
    },
];

impl ObjectKind {
    pub fn schema(self) -> &'static ObjectSchema {
        &SCHEMAS[self as usize - 1]
    }

    pub fn name(self) -> &'static str {
        self.into()
    }
}

impl ObjectSchema {
    /// Script slot a source key writes, kind-specific keys first.
    pub fn script_slot(&self, key: &str) -> Option<ScriptSlot> {
        self.scripts
            .iter()
            .chain(COMMON_SCRIPTS)
            .find(|b| b.key == key)
            .map(|b| b.slot)
    }

    /// Parameter binding for a source key, kind-specific keys first.
    pub fn param(&self, key: &str) -> Option<&'static ParamBinding> {
        self.params
            .iter()
            .chain(COMMON_PARAMS)
            .find(|b| b.key == key)
    }

    /// Whether `key` means anything for this kind apart from `at`/`type`/`verbs`.
    pub fn accepts(&self, key: &str) -> bool {
        self.script_slot(key).is_some() || self.param(key).is_some()
    }
}

impl ScriptSlot {
    /// Byte offset of this slot's u16 inside an object record.
    pub const fn record_offset(self) -> usize {
        6 + 2 * (self as usize)
    }

    pub const fn is_condition(self) -> bool {
        matches!(self, Self::Cond)
    }

    /// Slot a plain verb runs.
    pub fn for_verb(verb: crate::Verbs) -> Option<Self> {
        match verb {
            v if v == crate::Verbs::LOOK => Some(Self::Look),
            v if v == crate::Verbs::TAKE => Some(Self::Take),
            v if v == crate::Verbs::USE => Some(Self::Use),
            v if v == crate::Verbs::TALK => Some(Self::Talk),
            v if v == crate::Verbs::OPERATE => Some(Self::Operate),
            _ => None,
        }
    }
}

impl ParamSlot {
    pub const fn record_offset(self) -> usize {
        match self {
            Self::P0 => lvl::OBJ_P0_OFS,
            Self::P1 => lvl::OBJ_P1_OFS,
        }
    }
}

/// Split a keypad code into its `(p0, p1)` bytes.
pub const fn split_keypad_code(code: u16) -> (u8, u8) {
    ((code / 100) as u8, (code % 100) as u8)
}

/// Reassemble a keypad code from its parameter bytes.
pub const fn keypad_code(p0: u8, p1: u8) -> u16 {
    p0 as u16 * 100 + p1 as u16
}

fn describe_encoding(encoding: ParamEncoding) -> String {
    match encoding {
        ParamEncoding::Literal(s) => format!("number 0..255 -> {s:?}"),
        ParamEncoding::Item(s) => format!("item name -> {s:?}"),
        ParamEncoding::Var(s) => format!("var name -> {s:?}"),
        ParamEncoding::Bits3(s) => format!("bits 0..7 -> {s:?}"),
        ParamEncoding::KeypadCode => "code 0..999 -> P0 = code/100, P1 = code%100".into(),
    }
}

/// Render the routing table as Markdown.
pub fn schema_markdown() -> String {
    let mut out = String::from("# Object schema\n\n");
    out.push_str("Keys accepted by every kind:\n\n");
    for b in COMMON_SCRIPTS {
        let _ = writeln!(out, "- `{}=ACT` -> {:?}", b.key, b.slot);
    }
    for b in COMMON_PARAMS {
        let _ = writeln!(out, "- `{}=` {}", b.key, describe_encoding(b.encoding));
    }
    out.push('\n');
    out.push_str("| kind | id | params | scripts | behavior |\n");
    out.push_str("|------|----|--------|---------|----------|\n");
    for kind in ObjectKind::iter() {
        let schema = kind.schema();
        let params = schema
            .params
            .iter()
            .map(|b| format!("`{}` ({})", b.key, describe_encoding(b.encoding)))
            .collect::<Vec<_>>()
            .join(", ");
        let scripts = schema
            .scripts
            .iter()
            .map(|b| format!("`{}` -> {:?}", b.key, b.slot))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(
            out,
            "| `{}` | {} | {} | {} | {} |",
            kind.name(),
            kind as u8,
            if params.is_empty() { "-" } else { &params },
            if scripts.is_empty() { "-" } else { &scripts },
            schema.summary,
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::str::FromStr;

    #[test]
    fn discriminants() {
        assert_eq!(ObjectKind::Sign as u8, 1);
        assert_eq!(ObjectKind::LockerKeypad as u8, 3);
        assert_eq!(ObjectKind::NpcIntercom as u8, 7);
        assert_eq!(ObjectKind::from_repr(0), None);
    }

    #[test]
    fn names() {
        assert_eq!(
            ObjectKind::from_str("BREAKER_PANEL").ok(),
            Some(ObjectKind::BreakerPanel)
        );
        assert_eq!(ObjectKind::HatchPanel.name(), "HATCH_PANEL");
    }

    #[test]
    fn schema_table_is_indexed_by_kind() {
        for kind in ObjectKind::iter() {
            assert_eq!(kind.schema().kind, kind);
        }
    }

    #[test]
    fn slot_offsets_cover_record() {
        assert_eq!(ScriptSlot::Cond.record_offset(), 6);
        assert_eq!(ScriptSlot::Operate.record_offset(), 16);
        assert_eq!(ScriptSlot::Alt1.record_offset() + 2, lvl::OBJECT_RECORD_SIZE);
    }

    #[test]
    fn routing() {
        let keypad = ObjectKind::LockerKeypad.schema();
        assert_eq!(keypad.script_slot("ok"), Some(ScriptSlot::Alt0));
        assert_eq!(keypad.script_slot("bad"), Some(ScriptSlot::Alt1));
        assert_eq!(keypad.script_slot("look"), Some(ScriptSlot::Look));
        assert!(!keypad.accepts("fuse"));

        let hatch = ObjectKind::HatchPanel.schema();
        assert_eq!(hatch.script_slot("reject"), Some(ScriptSlot::Use));
        assert_eq!(hatch.script_slot("badge"), Some(ScriptSlot::Alt1));
        assert!(!hatch.accepts("ok"));

        let pickup = ObjectKind::Pickup.schema();
        assert_eq!(
            pickup.param("item").map(|b| b.encoding),
            Some(ParamEncoding::Item(ParamSlot::P0))
        );
        assert!(pickup.accepts("p1"));
    }

    #[test]
    fn kind_keys_are_unique() {
        for kind in ObjectKind::iter() {
            let schema = kind.schema();
            let mut seen = HashSet::new();
            for key in schema
                .scripts
                .iter()
                .map(|b| b.key)
                .chain(schema.params.iter().map(|b| b.key))
            {
                assert!(seen.insert(key), "{kind:?} repeats {key}");
            }
        }
    }

    #[test]
    fn keypad_code_split() {
        assert_eq!(split_keypad_code(729), (7, 29));
        assert_eq!(keypad_code(7, 29), 729);
        assert_eq!(split_keypad_code(5), (0, 5));
    }

    #[test]
    fn markdown_lists_every_kind() {
        let md = schema_markdown();
        for kind in ObjectKind::iter() {
            assert!(md.contains(kind.name()));
        }
        assert!(md.contains("`reject` -> Use"));
    }
}
