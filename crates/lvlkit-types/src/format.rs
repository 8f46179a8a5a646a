//! Byte layout constants for the `LVL1` and `TSET` blob formats.
//!
//! All multi-byte fields are little-endian `u16`. Offsets named `*_OFS` are
//! positions inside the header or inside a fixed-size record.

/// Size of one bytecode instruction: `(opcode, a, b)`.
pub const INSTRUCTION_SIZE: usize = 3;

/// Largest blob any offset field can address.
pub const MAX_BLOB_SIZE: usize = u16::MAX as usize;

/// Largest count that fits a single-byte count field.
pub const MAX_COUNT: usize = u8::MAX as usize;

pub mod lvl {
    pub const MAGIC: [u8; 4] = *b"LVL1";
    pub const VERSION: u8 = 1;
    pub const HEADER_SIZE: usize = 22;

    pub const VERSION_OFS: usize = 4;
    pub const ROOM_COUNT_OFS: usize = 5;
    pub const MAP_W_OFS: usize = 6;
    pub const MAP_H_OFS: usize = 7;
    pub const FLAG_COUNT_OFS: usize = 8;
    pub const VAR_COUNT_OFS: usize = 9;
    pub const ITEM_COUNT_OFS: usize = 10;
    pub const MSG_COUNT_OFS: usize = 11;
    pub const START_ROOM_OFS: usize = 12;
    pub const START_SPAWN_OFS: usize = 13;
    pub const ROOM_DIR_OFS: usize = 14;
    pub const COND_STREAM_OFS: usize = 16;
    pub const ACT_STREAM_OFS: usize = 18;
    pub const MSG_TABLE_OFS: usize = 20;

    /// Room directory entry: map, spawns, exits, objects (blob offsets).
    pub const ROOM_DIR_ENTRY_SIZE: usize = 8;
    pub const ROOM_MAP_OFS: usize = 0;
    pub const ROOM_SPAWNS_OFS: usize = 2;
    pub const ROOM_EXITS_OFS: usize = 4;
    pub const ROOM_OBJECTS_OFS: usize = 6;

    pub const SPAWN_RECORD_SIZE: usize = 2;
    pub const EXIT_RECORD_SIZE: usize = 3;

    pub const OBJECT_RECORD_SIZE: usize = 22;
    pub const OBJ_X_OFS: usize = 0;
    pub const OBJ_Y_OFS: usize = 1;
    pub const OBJ_TYPE_OFS: usize = 2;
    pub const OBJ_VERBS_OFS: usize = 3;
    pub const OBJ_P0_OFS: usize = 4;
    pub const OBJ_P1_OFS: usize = 5;
    // Script slots start at 6; see `ScriptSlot::record_offset`.
}

pub mod tset {
    pub const MAGIC: [u8; 4] = *b"TSET";
    pub const VERSION: u8 = 1;
    pub const HEADER_SIZE: usize = 17;

    pub const VERSION_OFS: usize = 4;
    pub const TILE_W_OFS: usize = 5;
    pub const TILE_H_OFS: usize = 6;
    pub const TILE_COUNT_OFS: usize = 7;
    pub const RECORD_SIZE_OFS: usize = 8;
    pub const RECORDS_OFS: usize = 9;
    pub const NAMES_OFS: usize = 11;
    pub const BG_COLOR_OFS: usize = 13;
    pub const MC1_COLOR_OFS: usize = 14;
    pub const MC2_COLOR_OFS: usize = 15;
    pub const RESERVED_OFS: usize = 16;

    pub const RECORD_SIZE: usize = 12;
    pub const REC_ID_OFS: usize = 0;
    pub const REC_CHARS_OFS: usize = 1;
    pub const REC_COLOR_MODE_OFS: usize = 5;
    pub const REC_COLORS_OFS: usize = 6;
    pub const REC_FLAGS_OFS: usize = 10;

    pub const COLOR_MODE_SINGLE: u8 = 0;
    pub const COLOR_MODE_PER_QUADRANT: u8 = 1;

    /// Metatile geometry: 2x2 glyphs.
    pub const TILE_W: u8 = 2;
    pub const TILE_H: u8 = 2;

    /// Bytes per glyph in a companion charset.
    pub const GLYPH_SIZE: usize = 8;
    pub const MAX_CHARSET_SIZE: usize = 256 * GLYPH_SIZE;

    /// A charset must hold whole glyphs and at most 256 of them.
    pub const fn charset_len_ok(len: usize) -> bool {
        len > 0 && len % GLYPH_SIZE == 0 && len <= MAX_CHARSET_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_fields_fit_header() {
        assert_eq!(lvl::MSG_TABLE_OFS + 2, lvl::HEADER_SIZE);
        assert_eq!(tset::RESERVED_OFS + 1, tset::HEADER_SIZE);
    }

    #[test]
    fn charset_sizes() {
        assert!(!tset::charset_len_ok(0));
        assert!(!tset::charset_len_ok(7));
        assert!(tset::charset_len_ok(8));
        assert!(tset::charset_len_ok(2048));
        assert!(!tset::charset_len_ok(2056));
    }

    #[test]
    fn tile_record_layout() {
        assert_eq!(tset::REC_FLAGS_OFS + 2, tset::RECORD_SIZE);
        assert_eq!(tset::REC_COLORS_OFS - tset::REC_CHARS_OFS, 5);
    }
}
