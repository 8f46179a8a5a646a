//! Fixed-offset reader over an `LVL1` blob.
//!
//! Nothing is parsed up front: every accessor computes a position from the
//! header and reads one or two bytes. Reads that fall outside the blob yield
//! zero, and indices beyond a declared count yield `None`, so a damaged blob
//! degrades to "nothing there" instead of a panic.

use lvlkit_types::format::{INSTRUCTION_SIZE, lvl};
use lvlkit_types::{BlobOffset, ExitEdge, ObjectKind, ScriptSlot, StreamOffset, Verbs};
use serde::Serialize;
use strum::{EnumCount, IntoEnumIterator};

use crate::error::{BlobError, byte, fits, word};

/// One-room, 1x1 level used when nothing valid has been installed.
#[rustfmt::skip]
pub static DEFAULT_LEVEL: [u8; 43] = [
    b'L', b'V', b'L', b'1', lvl::VERSION,
    1, 1, 1,          // rooms, w, h
    0, 0, 0, 0,       // flags, vars, items, messages
    0, 0,             // start room, start spawn
    22, 0, 36, 0, 39, 0, 42, 0,
    30, 0, 31, 0, 34, 0, 35, 0,
    0,                // map
    1, 0, 0,          // one spawn at 0,0
    0,                // no exits
    0,                // no objects
    0, 0, 0,          // condition stream
    0, 0, 0,          // action stream
    0,                // no messages
];

/// Section offsets of one room, all from the blob start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RoomEntry {
    pub map: BlobOffset,
    pub spawns: BlobOffset,
    pub exits: BlobOffset,
    pub objects: BlobOffset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Spawn {
    pub x: u8,
    pub y: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Exit {
    pub edge: ExitEdge,
    pub room: u8,
    pub spawn: u8,
}

/// A decoded object record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ObjectRecord {
    pub x: u8,
    pub y: u8,
    /// Raw type byte; see [`ObjectRecord::kind`].
    pub type_id: u8,
    pub verbs: Verbs,
    pub p0: u8,
    pub p1: u8,
    pub slots: [StreamOffset; ScriptSlot::COUNT],
}

impl ObjectRecord {
    pub fn kind(&self) -> Option<ObjectKind> {
        ObjectKind::from_repr(self.type_id)
    }

    pub fn slot(&self, slot: ScriptSlot) -> StreamOffset {
        self.slots[slot as usize]
    }

    pub fn condition(&self) -> StreamOffset {
        self.slot(ScriptSlot::Cond)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LevelReader<'a> {
    blob: &'a [u8],
}

impl Default for LevelReader<'static> {
    fn default() -> Self {
        Self {
            blob: &DEFAULT_LEVEL,
        }
    }
}

impl<'a> LevelReader<'a> {
    /// Accept `blob` if its magic, version and header fit.
    pub fn new(blob: &'a [u8]) -> Result<Self, BlobError> {
        if blob.len() < lvl::HEADER_SIZE {
            return Err(BlobError::TooShort {
                len: blob.len(),
                need: lvl::HEADER_SIZE,
            });
        }
        if blob[..4] != lvl::MAGIC {
            return Err(BlobError::BadMagic {
                found: [blob[0], blob[1], blob[2], blob[3]],
                expected: "LVL1",
            });
        }
        if blob[lvl::VERSION_OFS] != lvl::VERSION {
            return Err(BlobError::BadVersion {
                found: blob[lvl::VERSION_OFS],
                expected: lvl::VERSION,
            });
        }
        Ok(Self { blob })
    }

    /// `blob` if valid, otherwise the built-in default level.
    pub fn or_default(blob: &'a [u8]) -> Self {
        Self::new(blob).unwrap_or_else(|e| {
            log::warn!("level blob rejected ({e}); using the default level");
            Self {
                blob: &DEFAULT_LEVEL,
            }
        })
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.blob
    }

    pub fn is_default(&self) -> bool {
        std::ptr::eq(self.blob, DEFAULT_LEVEL.as_slice())
    }

    pub fn room_count(&self) -> u8 {
        byte(self.blob, lvl::ROOM_COUNT_OFS)
    }

    pub fn width(&self) -> u8 {
        byte(self.blob, lvl::MAP_W_OFS)
    }

    pub fn height(&self) -> u8 {
        byte(self.blob, lvl::MAP_H_OFS)
    }

    pub fn flag_count(&self) -> u8 {
        byte(self.blob, lvl::FLAG_COUNT_OFS)
    }

    pub fn var_count(&self) -> u8 {
        byte(self.blob, lvl::VAR_COUNT_OFS)
    }

    pub fn item_count(&self) -> u8 {
        byte(self.blob, lvl::ITEM_COUNT_OFS)
    }

    pub fn message_count(&self) -> u8 {
        byte(self.blob, lvl::MSG_COUNT_OFS)
    }

    pub fn start_room(&self) -> u8 {
        byte(self.blob, lvl::START_ROOM_OFS)
    }

    pub fn start_spawn(&self) -> u8 {
        byte(self.blob, lvl::START_SPAWN_OFS)
    }

    pub fn room_dir(&self) -> BlobOffset {
        BlobOffset(word(self.blob, lvl::ROOM_DIR_OFS))
    }

    pub fn cond_base(&self) -> BlobOffset {
        BlobOffset(word(self.blob, lvl::COND_STREAM_OFS))
    }

    pub fn act_base(&self) -> BlobOffset {
        BlobOffset(word(self.blob, lvl::ACT_STREAM_OFS))
    }

    pub fn msg_table(&self) -> BlobOffset {
        BlobOffset(word(self.blob, lvl::MSG_TABLE_OFS))
    }

    fn map_size(&self) -> usize {
        self.width() as usize * self.height() as usize
    }

    /// Directory entry of `room`.
    pub fn room(&self, room: u8) -> Option<RoomEntry> {
        if room >= self.room_count() {
            return None;
        }
        let at = self.room_dir().get() + room as usize * lvl::ROOM_DIR_ENTRY_SIZE;
        let ofs = |field| BlobOffset(word(self.blob, at + field));
        Some(RoomEntry {
            map: ofs(lvl::ROOM_MAP_OFS),
            spawns: ofs(lvl::ROOM_SPAWNS_OFS),
            exits: ofs(lvl::ROOM_EXITS_OFS),
            objects: ofs(lvl::ROOM_OBJECTS_OFS),
        })
    }

    /// Row-major tile ids of a room, empty if the block does not fit.
    pub fn map(&self, entry: &RoomEntry) -> &'a [u8] {
        let start = entry.map.get();
        self.blob
            .get(start..start + self.map_size())
            .unwrap_or_default()
    }

    /// Tile id at `x,y`, or 0 outside the map.
    pub fn tile(&self, entry: &RoomEntry, x: u8, y: u8) -> u8 {
        if x >= self.width() || y >= self.height() {
            return 0;
        }
        let idx = y as usize * self.width() as usize + x as usize;
        byte(self.blob, entry.map.get() + idx)
    }

    fn record(&self, list: BlobOffset, idx: u8, size: usize) -> Option<usize> {
        (idx < byte(self.blob, list.get())).then(|| list.get() + 1 + idx as usize * size)
    }

    pub fn spawn_count(&self, entry: &RoomEntry) -> u8 {
        byte(self.blob, entry.spawns.get())
    }

    pub fn spawn(&self, entry: &RoomEntry, idx: u8) -> Option<Spawn> {
        let at = self.record(entry.spawns, idx, lvl::SPAWN_RECORD_SIZE)?;
        Some(Spawn {
            x: byte(self.blob, at),
            y: byte(self.blob, at + 1),
        })
    }

    pub fn exit_count(&self, entry: &RoomEntry) -> u8 {
        byte(self.blob, entry.exits.get())
    }

    /// Exit `idx` of a room; `None` also when its edge byte is not an edge.
    pub fn exit(&self, entry: &RoomEntry, idx: u8) -> Option<Exit> {
        let at = self.record(entry.exits, idx, lvl::EXIT_RECORD_SIZE)?;
        Some(Exit {
            edge: ExitEdge::from_repr(byte(self.blob, at))?,
            room: byte(self.blob, at + 1),
            spawn: byte(self.blob, at + 2),
        })
    }

    pub fn object_count(&self, entry: &RoomEntry) -> u8 {
        byte(self.blob, entry.objects.get())
    }

    pub fn object(&self, entry: &RoomEntry, idx: u8) -> Option<ObjectRecord> {
        let at = self.record(entry.objects, idx, lvl::OBJECT_RECORD_SIZE)?;
        let mut slots = [StreamOffset::NONE; ScriptSlot::COUNT];
        for (slot, out) in ScriptSlot::iter().zip(slots.iter_mut()) {
            *out = StreamOffset(word(self.blob, at + slot.record_offset()));
        }
        Some(ObjectRecord {
            x: byte(self.blob, at + lvl::OBJ_X_OFS),
            y: byte(self.blob, at + lvl::OBJ_Y_OFS),
            type_id: byte(self.blob, at + lvl::OBJ_TYPE_OFS),
            verbs: Verbs::from_bits_truncate(byte(self.blob, at + lvl::OBJ_VERBS_OFS)),
            p0: byte(self.blob, at + lvl::OBJ_P0_OFS),
            p1: byte(self.blob, at + lvl::OBJ_P1_OFS),
            slots,
        })
    }

    /// Message text by id; empty for an unknown id or a damaged table.
    pub fn message(&self, id: u8) -> &'a str {
        if id >= self.message_count() {
            return "";
        }
        let at = word(self.blob, self.msg_table().get() + 1 + id as usize * 2) as usize;
        let Some(tail) = self.blob.get(at..) else {
            return "";
        };
        let end = tail.iter().position(|&b| b == 0).unwrap_or(tail.len());
        std::str::from_utf8(&tail[..end]).unwrap_or_default()
    }

    /// Instruction `(op, a, b)` at an absolute blob position.
    pub fn instruction(&self, at: usize) -> Option<[u8; 3]> {
        match self.blob.get(at..at.checked_add(INSTRUCTION_SIZE)?) {
            Some(&[op, a, b]) => Some([op, a, b]),
            _ => None,
        }
    }

    /// Walk every section and room block and confirm it lies inside the blob.
    pub fn check_integrity(&self) -> Result<(), BlobError> {
        let len = self.blob.len();
        let check = |what: &str, at: usize, size: usize| {
            if fits(self.blob, at, size) {
                Ok(())
            } else {
                Err(BlobError::out_of_bounds(what, at, size, len))
            }
        };

        let rooms = self.room_count() as usize;
        check("room directory", self.room_dir().get(), rooms * lvl::ROOM_DIR_ENTRY_SIZE)?;
        check("condition stream", self.cond_base().get(), INSTRUCTION_SIZE)?;
        check("action stream", self.act_base().get(), INSTRUCTION_SIZE)?;

        for room in 0..self.room_count() {
            let Some(e) = self.room(room) else { continue };
            check(&format!("room {room} map"), e.map.get(), self.map_size())?;
            for (name, list, size) in [
                ("spawns", e.spawns, lvl::SPAWN_RECORD_SIZE),
                ("exits", e.exits, lvl::EXIT_RECORD_SIZE),
                ("objects", e.objects, lvl::OBJECT_RECORD_SIZE),
            ] {
                check(&format!("room {room} {name}"), list.get(), 1)?;
                let count = byte(self.blob, list.get()) as usize;
                check(&format!("room {room} {name}"), list.get(), 1 + count * size)?;
            }
        }

        let table = self.msg_table().get();
        check("message table", table, 1)?;
        check("message table", table, 1 + self.message_count() as usize * 2)?;
        for id in 0..self.message_count() {
            let at = word(self.blob, table + 1 + id as usize * 2) as usize;
            check(&format!("message {id}"), at, 1)?;
            if !self.blob[at..].contains(&0) {
                return Err(BlobError::Unterminated { id, offset: at });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_level_is_sound() {
        let r = LevelReader::new(&DEFAULT_LEVEL).unwrap();
        r.check_integrity().unwrap();
        assert_eq!(r.room_count(), 1);
        assert_eq!((r.width(), r.height()), (1, 1));
        let room = r.room(0).unwrap();
        assert_eq!(r.map(&room), &[0]);
        assert_eq!(r.spawn(&room, 0), Some(Spawn { x: 0, y: 0 }));
        assert_eq!(r.exit(&room, 0), None);
        assert_eq!(r.instruction(r.cond_base().get()), Some([0, 0, 0]));
        assert!(r.is_default());
    }

    #[test]
    fn rejects_bad_headers() {
        assert!(matches!(
            LevelReader::new(b"LVL1"),
            Err(BlobError::TooShort { len: 4, .. })
        ));
        let mut blob = DEFAULT_LEVEL;
        blob[0] = b'X';
        assert!(matches!(LevelReader::new(&blob), Err(BlobError::BadMagic { .. })));
        let mut blob = DEFAULT_LEVEL;
        blob[lvl::VERSION_OFS] = 2;
        assert_eq!(
            LevelReader::new(&blob).unwrap_err(),
            BlobError::BadVersion {
                found: 2,
                expected: 1
            }
        );
    }

    #[test]
    fn or_default_falls_back() {
        let r = LevelReader::or_default(b"garbage garbage garbage");
        assert!(r.is_default());
        assert_eq!(r.room_count(), 1);
    }

    #[test]
    fn out_of_range_reads_are_neutral() {
        let r = LevelReader::default();
        assert_eq!(r.room(1), None);
        let room = r.room(0).unwrap();
        assert_eq!(r.spawn(&room, 1), None);
        assert_eq!(r.object(&room, 0), None);
        assert_eq!(r.tile(&room, 5, 5), 0);
        assert_eq!(r.message(0), "");
        assert_eq!(r.instruction(usize::MAX - 1), None);
    }

    #[test]
    fn truncated_room_block_fails_integrity() {
        let mut blob = DEFAULT_LEVEL.to_vec();
        // claim 9 objects in the single room
        blob[35] = 9;
        let r = LevelReader::new(&blob).unwrap();
        assert!(matches!(
            r.check_integrity(),
            Err(BlobError::OutOfBounds { ref what, .. }) if what == "room 0 objects"
        ));
        // accessors still stay inside the blob
        let room = r.room(0).unwrap();
        let obj = r.object(&room, 8).unwrap();
        assert_eq!(obj.type_id, 0);
        assert_eq!(obj.kind(), None);
    }

    #[test]
    fn unterminated_message() {
        let mut blob = DEFAULT_LEVEL.to_vec();
        blob[lvl::MSG_COUNT_OFS] = 1;
        blob[42] = 1;
        blob.extend_from_slice(&[45, 0, b'h', b'i']);
        let r = LevelReader::new(&blob).unwrap();
        assert_eq!(
            r.check_integrity(),
            Err(BlobError::Unterminated { id: 0, offset: 45 })
        );
        assert_eq!(r.message(0), "hi");
    }
}
