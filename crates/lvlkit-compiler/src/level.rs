//! Level source → `LVL1` blob.
//!
//! Compilation runs in two passes: every name (flags, vars, items, messages,
//! rooms, spawns, scripts) is collected first, then rooms and objects are
//! laid out with all references resolved. Errors are collected across the
//! whole file; no blob is produced unless there are none.

use std::collections::{BTreeMap, HashMap, HashSet};

use lvlkit_types::format::{MAX_COUNT, lvl};
use lvlkit_types::{
    BlobOffset, ExitEdge, ObjectKind, ParamBinding, ParamEncoding, ParamSlot, ScriptSlot,
    StreamOffset, Verbs, split_keypad_code,
};
use serde::Serialize;
use strum::{EnumCount, IntoEnumIterator};

use crate::error::{CompileError, Diagnostics};
use crate::layout::{BlobWriter, LayoutError, ScriptStream, SymbolTable};
use crate::level_parser::{
    LevelHeader, LevelSource, Named, ObjectDecl, RoomDecl, TileRef, parse_level,
};
use crate::script::{self, ScriptNames};
use crate::source;
use crate::stamp::{Stamp, expand_stamps};
use crate::tileset::CompiledTileset;

/// Highest variable count the runtime stores.
pub const MAX_VARS: usize = 64;

#[derive(Debug, Clone, Serialize)]
pub struct CompiledLevel {
    pub name: String,
    #[serde(skip)]
    pub blob: Vec<u8>,
    pub debug: LevelDebug,
}

/// Everything the `.sym` and `.json` side artifacts describe.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LevelDebug {
    pub name: String,
    pub width: u8,
    pub height: u8,
    pub start_room: u8,
    pub start_spawn: u8,
    pub room_dir: BlobOffset,
    pub cond_stream: BlobOffset,
    pub act_stream: BlobOffset,
    pub msg_table: BlobOffset,
    pub size: usize,
    pub flags: Vec<String>,
    pub vars: Vec<String>,
    pub items: Vec<String>,
    pub messages: Vec<MessageDebug>,
    pub conds: Vec<ScriptDebug>,
    pub acts: Vec<ScriptDebug>,
    pub rooms: Vec<RoomDebug>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageDebug {
    pub id: u8,
    pub name: String,
    pub offset: BlobOffset,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScriptDebug {
    pub name: String,
    pub offset: StreamOffset,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomDebug {
    pub id: u8,
    pub key: String,
    pub name: String,
    pub map: BlobOffset,
    pub spawns_at: BlobOffset,
    pub exits_at: BlobOffset,
    pub objects_at: BlobOffset,
    pub spawns: Vec<SpawnDebug>,
    pub exits: Vec<ExitDebug>,
    pub objects: Vec<ObjectDebug>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpawnDebug {
    pub name: String,
    pub x: u8,
    pub y: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExitDebug {
    pub edge: ExitEdge,
    pub room: u8,
    pub spawn: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct ObjectDebug {
    pub name: String,
    pub x: u8,
    pub y: u8,
    pub kind: ObjectKind,
    pub verbs: Verbs,
    pub p0: u8,
    pub p1: u8,
    pub scripts: Vec<(ScriptSlot, StreamOffset)>,
}

struct Symbols {
    flags: SymbolTable,
    vars: SymbolTable,
    items: SymbolTable,
    messages: SymbolTable,
    rooms: SymbolTable,
    spawns: Vec<SymbolTable>,
}

impl Symbols {
    fn script_names(&self) -> ScriptNames<'_> {
        ScriptNames {
            flags: &self.flags,
            vars: &self.vars,
            items: &self.items,
            messages: &self.messages,
            rooms: &self.rooms,
            spawns: &self.spawns,
        }
    }
}

struct CharMap {
    tiles: HashMap<char, u8>,
    stamps: BTreeMap<char, Stamp>,
    available: bool,
}

struct Streams {
    cond: ScriptStream,
    act: ScriptStream,
}

impl Streams {
    fn cond(&self, name: &str) -> Option<StreamOffset> {
        self.cond
            .offset(name)
            .or((name == script::ALWAYS).then_some(StreamOffset::NONE))
    }

    fn act(&self, name: &str) -> Option<StreamOffset> {
        self.act
            .offset(name)
            .or((name == script::NOOP).then_some(StreamOffset::NONE))
    }
}

/// One object record, ready to write.
struct ObjectRecord {
    x: u8,
    y: u8,
    kind: ObjectKind,
    verbs: Verbs,
    params: [u8; 2],
    slots: [StreamOffset; ScriptSlot::COUNT],
}

impl ObjectRecord {
    fn bytes(&self) -> [u8; lvl::OBJECT_RECORD_SIZE] {
        let mut rec = [0u8; lvl::OBJECT_RECORD_SIZE];
        rec[lvl::OBJ_X_OFS] = self.x;
        rec[lvl::OBJ_Y_OFS] = self.y;
        rec[lvl::OBJ_TYPE_OFS] = self.kind as u8;
        rec[lvl::OBJ_VERBS_OFS] = self.verbs.bits();
        rec[ParamSlot::P0.record_offset()] = self.params[0];
        rec[ParamSlot::P1.record_offset()] = self.params[1];
        for (slot, offset) in ScriptSlot::iter().zip(self.slots) {
            let at = slot.record_offset();
            rec[at..at + 2].copy_from_slice(&offset.0.to_le_bytes());
        }
        rec
    }
}

/// Compile level source text. `tileset` supplies tile names, the CHARMAP and
/// stamps; `file` is only used in diagnostics.
pub fn compile_level(
    file: &str,
    text: &str,
    tileset: Option<&CompiledTileset>,
) -> Result<CompiledLevel, CompileError> {
    let mut diags = Diagnostics::new(file);
    let src = parse_level(text, &mut diags);
    let compiled = src
        .header
        .as_ref()
        .and_then(|header| compile_parsed(&src, header, tileset, &mut diags));
    match compiled {
        Some(level) => diags.finish(level),
        None => Err(CompileError::Invalid(diags)),
    }
}

fn compile_parsed(
    src: &LevelSource,
    header: &LevelHeader,
    tileset: Option<&CompiledTileset>,
    diags: &mut Diagnostics,
) -> Option<CompiledLevel> {
    let syms = declare_symbols(src, diags);
    let charmap = build_charmap(src, tileset, diags);

    let mut streams = Streams {
        cond: ScriptStream::new("condition"),
        act: ScriptStream::new("action"),
    };
    let names = syms.script_names();
    for decl in &src.conds {
        script::compile_condition(decl, &names, &mut streams.cond, diags);
    }
    for decl in &src.acts {
        script::compile_action(decl, &names, &mut streams.act, diags);
    }

    if src.rooms.is_empty() {
        diags.structural(header.line, "level has no rooms");
    }
    let (start_room, start_spawn) = resolve_start(header, &syms, diags);

    let mut maps = Vec::with_capacity(src.rooms.len());
    let mut objects = Vec::with_capacity(src.rooms.len());
    for room in &src.rooms {
        maps.push(room_map(room, header, &charmap, diags));
        objects.push(resolve_objects(room, header, &syms, &streams, diags));
        check_room(room, header, &syms, diags);
    }

    if !diags.is_empty() || header.w == 0 || header.h == 0 {
        return None;
    }

    let mut debug = LevelDebug {
        name: header.name.clone(),
        width: header.w,
        height: header.h,
        start_room,
        start_spawn,
        flags: syms.flags.names().to_vec(),
        vars: syms.vars.names().to_vec(),
        items: syms.items.names().to_vec(),
        conds: script_debug(&streams.cond),
        acts: script_debug(&streams.act),
        ..LevelDebug::default()
    };

    let mut w = BlobWriter::new();
    w.bytes(&lvl::MAGIC);
    w.u8(lvl::VERSION);
    w.u8(syms.rooms.count());
    w.u8(header.w);
    w.u8(header.h);
    w.u8(syms.flags.count());
    w.u8(syms.vars.count());
    w.u8(syms.items.count());
    w.u8(syms.messages.count());
    w.u8(start_room);
    w.u8(start_spawn);
    let dir_slot = w.reserve_u16();
    let cond_slot = w.reserve_u16();
    let act_slot = w.reserve_u16();
    let msg_slot = w.reserve_u16();
    debug_assert_eq!(w.len(), lvl::HEADER_SIZE);

    debug.room_dir = w.here();
    w.patch(dir_slot, debug.room_dir.0);
    let dir = w.reserve(src.rooms.len() * lvl::ROOM_DIR_ENTRY_SIZE);

    for (idx, room) in src.rooms.iter().enumerate() {
        let entry = dir + idx * lvl::ROOM_DIR_ENTRY_SIZE;
        let map = w.here();
        w.bytes(&maps[idx]);

        let spawns_at = w.here();
        let spawn_debug = room
            .spawns
            .iter()
            .map(|s| SpawnDebug {
                name: s.name.clone(),
                x: s.x,
                y: s.y,
            })
            .collect::<Vec<_>>();
        w.u8(room.spawns.len() as u8);
        for s in &room.spawns {
            w.u8(s.x);
            w.u8(s.y);
        }

        let exits_at = w.here();
        let mut exit_debug = Vec::with_capacity(room.exits.len());
        w.u8(room.exits.len() as u8);
        for e in &room.exits {
            let dest = syms.rooms.id(&e.room).unwrap_or_default();
            let spawn = syms.spawns[dest as usize].id(&e.spawn).unwrap_or_default();
            w.bytes(&[e.edge as u8, dest, spawn]);
            exit_debug.push(ExitDebug {
                edge: e.edge,
                room: dest,
                spawn,
            });
        }

        let objects_at = w.here();
        let mut object_debug = Vec::with_capacity(room.objects.len());
        w.u8(objects[idx].len() as u8);
        for (decl, rec) in room.objects.iter().zip(&objects[idx]) {
            w.bytes(&rec.bytes());
            object_debug.push(ObjectDebug {
                name: decl.name.clone(),
                x: rec.x,
                y: rec.y,
                kind: rec.kind,
                verbs: rec.verbs,
                p0: rec.params[0],
                p1: rec.params[1],
                scripts: ScriptSlot::iter()
                    .zip(rec.slots)
                    .filter(|(_, off)| !off.is_none())
                    .collect(),
            });
        }

        w.patch_at(entry + lvl::ROOM_MAP_OFS, map.0);
        w.patch_at(entry + lvl::ROOM_SPAWNS_OFS, spawns_at.0);
        w.patch_at(entry + lvl::ROOM_EXITS_OFS, exits_at.0);
        w.patch_at(entry + lvl::ROOM_OBJECTS_OFS, objects_at.0);
        log::debug!(
            "room {} ({}): map {map} spawns {spawns_at} exits {exits_at} objects {objects_at}",
            idx,
            room.id
        );
        debug.rooms.push(RoomDebug {
            id: idx as u8,
            key: room.id.clone(),
            name: room.name.clone(),
            map,
            spawns_at,
            exits_at,
            objects_at,
            spawns: spawn_debug,
            exits: exit_debug,
            objects: object_debug,
        });
    }

    debug.cond_stream = w.here();
    w.patch(cond_slot, debug.cond_stream.0);
    w.bytes(streams.cond.bytes());
    debug.act_stream = w.here();
    w.patch(act_slot, debug.act_stream.0);
    w.bytes(streams.act.bytes());

    debug.msg_table = w.here();
    w.patch(msg_slot, debug.msg_table.0);
    w.u8(syms.messages.count());
    let table = w.reserve(src.messages.len() * 2);
    for (idx, m) in src.messages.iter().enumerate() {
        let at = w.here();
        w.patch_at(table + idx * 2, at.0);
        w.bytes(m.text.as_bytes());
        w.u8(0);
        debug.messages.push(MessageDebug {
            id: idx as u8,
            name: m.name.clone(),
            offset: at,
            text: m.text.clone(),
        });
    }

    let blob = match w.finish("level") {
        Ok(b) => b,
        Err(e) => {
            diags.limit(0, e.to_string());
            return None;
        }
    };
    debug.size = blob.len();
    log::info!(
        "level {}: {} rooms, {} bytes",
        header.name,
        src.rooms.len(),
        blob.len()
    );
    Some(CompiledLevel {
        name: header.name.clone(),
        blob,
        debug,
    })
}

fn script_debug(stream: &ScriptStream) -> Vec<ScriptDebug> {
    stream
        .scripts()
        .iter()
        .map(|(name, offset)| ScriptDebug {
            name: name.clone(),
            offset: *offset,
        })
        .collect()
}

fn declare_all<'a>(
    kind: &'static str,
    limit: usize,
    decls: impl Iterator<Item = (usize, &'a str)>,
    diags: &mut Diagnostics,
) -> SymbolTable {
    let mut table = SymbolTable::new(kind, limit);
    for (line, name) in decls {
        match table.declare(name) {
            Ok(_) => {}
            Err(e @ LayoutError::Full { .. }) => diags.limit(line, e.to_string()),
            Err(e) => diags.structural(line, e.to_string()),
        }
    }
    table
}

fn named(list: &[Named]) -> impl Iterator<Item = (usize, &str)> {
    list.iter().map(|n| (n.line, n.name.as_str()))
}

fn declare_symbols(src: &LevelSource, diags: &mut Diagnostics) -> Symbols {
    let flags = declare_all("flag", MAX_COUNT, named(&src.flags), diags);
    let vars = declare_all("var", MAX_VARS, named(&src.vars), diags);
    let items = declare_all("item", MAX_COUNT, named(&src.items), diags);
    let messages = declare_all(
        "message",
        MAX_COUNT,
        src.messages.iter().map(|m| (m.line, m.name.as_str())),
        diags,
    );
    let rooms = declare_all(
        "room",
        MAX_COUNT,
        src.rooms.iter().map(|r| (r.line, r.id.as_str())),
        diags,
    );
    let spawns = src
        .rooms
        .iter()
        .map(|r| {
            declare_all(
                "spawn",
                MAX_COUNT,
                r.spawns.iter().map(|s| (s.line, s.name.as_str())),
                diags,
            )
        })
        .collect();
    Symbols {
        flags,
        vars,
        items,
        messages,
        rooms,
        spawns,
    }
}

fn build_charmap(
    src: &LevelSource,
    tileset: Option<&CompiledTileset>,
    diags: &mut Diagnostics,
) -> CharMap {
    let stamps = tileset.map(|t| t.stamps.clone()).unwrap_or_default();
    if src.tiles.is_empty() {
        return match tileset {
            Some(t) => CharMap {
                tiles: t.charmap.iter().map(|(c, id)| (*c, *id)).collect(),
                stamps,
                available: true,
            },
            None => CharMap {
                tiles: HashMap::new(),
                stamps,
                available: false,
            },
        };
    }

    let mut tiles = HashMap::new();
    for b in &src.tiles {
        if tiles.contains_key(&b.ch) {
            diags.structural(b.line, format!("duplicate TILES char `{}`", b.ch));
            continue;
        }
        if stamps.contains_key(&b.ch) {
            diags.structural(
                b.line,
                format!("map char `{}` is both a tile and an object stamp", b.ch),
            );
            continue;
        }
        let id = match (&b.tile, tileset) {
            (TileRef::Id(id), Some(t)) if *id >= t.header.tile_count => {
                diags.referential(
                    b.line,
                    format!("tile id {id} not in tileset ({} tiles)", t.header.tile_count),
                );
                continue;
            }
            (TileRef::Id(id), _) => *id,
            (TileRef::Name(name), Some(t)) => match t.tile_id(name) {
                Some(id) => id,
                None => {
                    diags.referential(b.line, format!("unknown tile `{name}` for `{}`", b.ch));
                    continue;
                }
            },
            (TileRef::Name(name), None) => {
                diags.referential(
                    b.line,
                    format!("tile name `{name}` needs a tileset (LEVEL tset=...)"),
                );
                continue;
            }
        };
        tiles.insert(b.ch, id);
    }
    CharMap {
        tiles,
        stamps,
        available: true,
    }
}

fn resolve_start(header: &LevelHeader, syms: &Symbols, diags: &mut Diagnostics) -> (u8, u8) {
    if header.start_room.is_empty() {
        return (0, 0);
    }
    let Some(room) = syms.rooms.id(&header.start_room) else {
        diags.referential(
            header.line,
            format!("start room `{}` is not declared", header.start_room),
        );
        return (0, 0);
    };
    match syms.spawns[room as usize].id(&header.start_spawn) {
        Some(spawn) => (room, spawn),
        None => {
            diags.referential(
                header.line,
                format!(
                    "start spawn `{}` is not declared in room `{}`",
                    header.start_spawn, header.start_room
                ),
            );
            (room, 0)
        }
    }
}

fn room_map(
    room: &RoomDecl,
    header: &LevelHeader,
    charmap: &CharMap,
    diags: &mut Diagnostics,
) -> Vec<u8> {
    let (w, h) = (header.w as usize, header.h as usize);
    let blank = vec![0u8; w * h];
    if w == 0 || h == 0 {
        return blank;
    }
    if !charmap.available {
        diags.structural(
            room.line,
            format!(
                "room {}: no character map (add a TILES section or LEVEL tset=...)",
                room.id
            ),
        );
        return blank;
    }

    let mut shape_ok = true;
    if room.map.len() != h {
        diags.structural(
            room.line,
            format!("room {}: MAP has {} rows, expected {h}", room.id, room.map.len()),
        );
        shape_ok = false;
    }
    for (y, (line, row)) in room.map.iter().enumerate() {
        let len = row.chars().count();
        if len != w {
            diags.structural(
                *line,
                format!("room {}: MAP row {y} has {len} columns, expected {w}", room.id),
            );
            shape_ok = false;
        }
    }
    if !shape_ok {
        return blank;
    }

    let grid: Vec<Vec<char>> = room.map.iter().map(|(_, row)| row.chars().collect()).collect();
    let (stamped, errors) = expand_stamps(&grid, &charmap.stamps);
    for e in errors {
        diags.geometric(room.map[e.row()].0, format!("room {}: {e}", room.id));
    }

    let mut bytes = Vec::with_capacity(w * h);
    let mut unmapped = HashSet::new();
    for (y, row) in grid.iter().enumerate() {
        for (x, ch) in row.iter().enumerate() {
            let id = stamped[y][x].or_else(|| charmap.tiles.get(ch).copied());
            match id {
                Some(id) => bytes.push(id),
                None => {
                    if unmapped.insert(*ch) {
                        diags.referential(
                            room.map[y].0,
                            format!("room {}: map char `{ch}` at {x},{y} has no tile mapping", room.id),
                        );
                    }
                    bytes.push(0);
                }
            }
        }
    }
    bytes
}

fn check_room(room: &RoomDecl, header: &LevelHeader, syms: &Symbols, diags: &mut Diagnostics) {
    for (what, count) in [
        ("spawns", room.spawns.len()),
        ("exits", room.exits.len()),
        ("objects", room.objects.len()),
    ] {
        if count > MAX_COUNT {
            diags.limit(
                room.line,
                format!("room {}: {count} {what}, at most {MAX_COUNT}", room.id),
            );
        }
    }
    for s in &room.spawns {
        if s.x >= header.w || s.y >= header.h {
            diags.geometric(
                s.line,
                format!("room {}: spawn {} at {},{} is outside the map", room.id, s.name, s.x, s.y),
            );
        }
    }
    for e in &room.exits {
        let Some(dest) = syms.rooms.id(&e.room) else {
            diags.referential(e.line, format!("room {}: exit to unknown room `{}`", room.id, e.room));
            continue;
        };
        if syms.spawns[dest as usize].id(&e.spawn).is_none() {
            diags.referential(
                e.line,
                format!(
                    "room {}: exit to unknown spawn `{}` in room `{}`",
                    room.id, e.spawn, e.room
                ),
            );
        }
    }
}

fn resolve_objects(
    room: &RoomDecl,
    header: &LevelHeader,
    syms: &Symbols,
    streams: &Streams,
    diags: &mut Diagnostics,
) -> Vec<ObjectRecord> {
    let mut seen = HashSet::new();
    room.objects
        .iter()
        .filter_map(|obj| {
            if !seen.insert(obj.name.as_str()) {
                diags.structural(
                    obj.line,
                    format!("room {}: duplicate object `{}`", room.id, obj.name),
                );
            }
            resolve_object(room, obj, header, syms, streams, diags)
        })
        .collect()
}

fn resolve_object(
    room: &RoomDecl,
    obj: &ObjectDecl,
    header: &LevelHeader,
    syms: &Symbols,
    streams: &Streams,
    diags: &mut Diagnostics,
) -> Option<ObjectRecord> {
    let line = obj.line;
    let schema = obj.kind.schema();
    let label = format!("room {}: object {}", room.id, obj.name);

    if obj.x >= header.w || obj.y >= header.h {
        diags.geometric(
            line,
            format!("{label} at {},{} is outside the map", obj.x, obj.y),
        );
    }

    let mut slots = [StreamOffset::NONE; ScriptSlot::COUNT];
    let mut slot_keys: [Option<&str>; ScriptSlot::COUNT] = [None; ScriptSlot::COUNT];
    let mut params: Vec<(&ParamBinding, &str)> = Vec::new();
    let mut ok = true;

    for (key, value) in &obj.keys {
        if let Some(slot) = schema.script_slot(key) {
            let (what, offset) = if slot.is_condition() {
                ("condition", streams.cond(value))
            } else {
                ("action", streams.act(value))
            };
            let Some(offset) = offset else {
                diags.referential(line, format!("{label}: unknown {what} `{value}` in {key}="));
                ok = false;
                continue;
            };
            if let Some(prev) = slot_keys[slot as usize] {
                diags.structural(
                    line,
                    format!("{label}: {prev}= and {key}= both set the {slot:?} slot"),
                );
                ok = false;
                continue;
            }
            slots[slot as usize] = offset;
            slot_keys[slot as usize] = Some(key.as_str());
        } else if let Some(binding) = schema.param(key) {
            params.push((binding, value.as_str()));
        } else {
            diags.referential(
                line,
                format!("{label}: key `{key}` is not valid for {}", obj.kind.name()),
            );
            ok = false;
        }
    }

    // Generic p0=/p1= literals first so kind-specific keys win.
    params.sort_by_key(|(b, _)| !matches!(b.encoding, ParamEncoding::Literal(_)));
    let mut bytes = [0u8; 2];
    for (binding, value) in params {
        let key = binding.key;
        match binding.encoding {
            ParamEncoding::Literal(slot) => match source::parse_u8(value) {
                Ok(v) => bytes[slot as usize] = v,
                Err(e) => {
                    diags.limit(line, format!("{label}: {key}=: {e}"));
                    ok = false;
                }
            },
            ParamEncoding::Item(slot) => match syms.items.id(value) {
                Some(v) => bytes[slot as usize] = v,
                None => {
                    diags.referential(line, format!("{label}: unknown item `{value}` in {key}="));
                    ok = false;
                }
            },
            ParamEncoding::Var(slot) => match syms.vars.id(value) {
                Some(v) => bytes[slot as usize] = v,
                None => {
                    diags.referential(line, format!("{label}: unknown var `{value}` in {key}="));
                    ok = false;
                }
            },
            ParamEncoding::Bits3(slot) => match source::parse_in_range(value, 0, 7) {
                Ok(v) => bytes[slot as usize] = v as u8,
                Err(e) => {
                    diags.limit(line, format!("{label}: {key}=: {e}"));
                    ok = false;
                }
            },
            ParamEncoding::KeypadCode => match source::parse_in_range(value, 0, 999) {
                Ok(code) => {
                    let (p0, p1) = split_keypad_code(code as u16);
                    bytes = [p0, p1];
                }
                Err(e) => {
                    diags.limit(line, format!("{label}: {key}=: {e}"));
                    ok = false;
                }
            },
        }
    }

    ok.then_some(ObjectRecord {
        x: obj.x,
        y: obj.y,
        kind: obj.kind,
        verbs: obj.verbs,
        params: bytes,
        slots,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn rd16(blob: &[u8], at: usize) -> usize {
        u16::from_le_bytes([blob[at], blob[at + 1]]) as usize
    }

    const LEVEL: &str = r#"
LEVEL name="Unit" w=3 h=2 start=R0:S0
TILES
  . 1
  # 2
END
FLAGS
  OPEN
END
VARS
  V
END
ITEMS
  KEY
END
MESSAGES
  HI = "hi"
  BYE = "bye"
END
COND IS_OPEN
  FLAGSET OPEN
END
ACT SAY_HI
  MSG HI
END
ACT LEAVE
  TRANSITION R1 IN
END
ROOM R0
  SPAWNS
    S0 0,0
  END
  EXITS
    R R1:IN
  END
  OBJECTS
    PAD at 1,1 type=LOCKER_KEYPAD verbs=USE code=729 ok=SAY_HI bad=NOOP p1=3
    DOOR at 2,0 type=EXIT_TRIGGER verbs=OPERATE cond=IS_OPEN operate=LEAVE
  END
  MAP
    .#.
    ...
  END
ENDROOM
ROOM R1
  SPAWNS
    OUT 0,0
    IN 2,1
  END
  MAP
    ###
    #.#
  END
ENDROOM
"#;

    #[test]
    fn header_and_sections() {
        let level = compile_level("unit.lvl", LEVEL, None).unwrap();
        let b = &level.blob;
        assert_eq!(&b[..4], b"LVL1");
        assert_eq!(b[lvl::VERSION_OFS], 1);
        assert_eq!(b[lvl::ROOM_COUNT_OFS], 2);
        assert_eq!((b[lvl::MAP_W_OFS], b[lvl::MAP_H_OFS]), (3, 2));
        assert_eq!(b[lvl::FLAG_COUNT_OFS], 1);
        assert_eq!(b[lvl::MSG_COUNT_OFS], 2);
        assert_eq!(rd16(b, lvl::ROOM_DIR_OFS), lvl::HEADER_SIZE);
        assert_eq!(level.debug.size, b.len());
    }

    #[test]
    fn maps_and_rooms() {
        let level = compile_level("unit.lvl", LEVEL, None).unwrap();
        let b = &level.blob;
        let dir = rd16(b, lvl::ROOM_DIR_OFS);
        let map0 = rd16(b, dir);
        assert_eq!(&b[map0..map0 + 6], &[1, 2, 1, 1, 1, 1]);

        let exits = rd16(b, dir + lvl::ROOM_EXITS_OFS);
        assert_eq!(&b[exits..exits + 4], &[1, ExitEdge::Right as u8, 1, 1]);

        let r1 = dir + lvl::ROOM_DIR_ENTRY_SIZE;
        let spawns = rd16(b, r1 + lvl::ROOM_SPAWNS_OFS);
        assert_eq!(&b[spawns..spawns + 5], &[2, 0, 0, 2, 1]);
    }

    #[test]
    fn object_routing() {
        let level = compile_level("unit.lvl", LEVEL, None).unwrap();
        let b = &level.blob;
        let dir = rd16(b, lvl::ROOM_DIR_OFS);
        let objs = rd16(b, dir + lvl::ROOM_OBJECTS_OFS);
        assert_eq!(b[objs], 2);
        let pad = &b[objs + 1..objs + 1 + lvl::OBJECT_RECORD_SIZE];
        assert_eq!(pad[lvl::OBJ_TYPE_OFS], ObjectKind::LockerKeypad as u8);
        // code=729 overrides the generic p1=3
        assert_eq!((pad[lvl::OBJ_P0_OFS], pad[lvl::OBJ_P1_OFS]), (7, 29));
        assert_eq!(rd16(pad, ScriptSlot::Alt0.record_offset()), 3);
        assert_eq!(rd16(pad, ScriptSlot::Alt1.record_offset()), 0);
        assert_eq!(rd16(pad, ScriptSlot::Cond.record_offset()), 0);

        let door = &b[objs + 1 + lvl::OBJECT_RECORD_SIZE..];
        assert_eq!(rd16(door, ScriptSlot::Cond.record_offset()), 3);
        assert_eq!(rd16(door, ScriptSlot::Operate.record_offset()), 9);
    }

    #[test]
    fn streams_and_messages() {
        let level = compile_level("unit.lvl", LEVEL, None).unwrap();
        let b = &level.blob;
        let cond = rd16(b, lvl::COND_STREAM_OFS);
        assert_eq!(&b[cond..cond + 9], &[0, 0, 0, 2, 0, 0, 0, 0, 0]);
        let act = rd16(b, lvl::ACT_STREAM_OFS);
        assert_eq!(&b[act + 9..act + 15], &[8, 1, 1, 0, 0, 0]);

        let msg = rd16(b, lvl::MSG_TABLE_OFS);
        assert_eq!(b[msg], 2);
        let bye = rd16(b, msg + 3);
        assert_eq!(&b[bye..bye + 4], b"bye\0");
        assert_eq!(msg + 1 + 4 + 3 + 4, b.len());
    }

    fn errors(src: &str) -> Vec<(ErrorKind, String)> {
        compile_level("bad.lvl", src, None)
            .unwrap_err()
            .diagnostics()
            .iter()
            .map(|d| (d.kind, d.msg.clone()))
            .collect()
    }

    #[test]
    fn unknown_action_names_object() {
        let src = LEVEL.replace("operate=LEAVE", "operate=LEAVE use=VANISH");
        let errs = errors(&src);
        assert_eq!(errs.len(), 1, "{errs:?}");
        assert_eq!(errs[0].0, ErrorKind::Referential);
        assert!(errs[0].1.contains("object DOOR"));
        assert!(errs[0].1.contains("`VANISH`"));
    }

    #[test]
    fn key_not_valid_for_kind() {
        let src = LEVEL.replace("ok=SAY_HI", "fuse=SAY_HI");
        let errs = errors(&src);
        assert_eq!(errs.len(), 1, "{errs:?}");
        assert!(errs[0].1.contains("key `fuse` is not valid for LOCKER_KEYPAD"));
    }

    #[test]
    fn keypad_code_range() {
        let errs = errors(&LEVEL.replace("code=729", "code=1000"));
        assert_eq!(errs[0].0, ErrorKind::Limit);
    }

    #[test]
    fn map_shape() {
        let errs = errors(&LEVEL.replace("    #.#\n", "    #.\n"));
        assert_eq!(errs.len(), 1);
        assert!(errs[0].1.contains("MAP row 1 has 2 columns"));

        let errs = errors(&LEVEL.replace("    ###\n", ""));
        assert!(errs[0].1.contains("MAP has 1 rows, expected 2"));
    }

    #[test]
    fn unmapped_char() {
        let errs = errors(&LEVEL.replace(".#.", ".X."));
        assert_eq!(errs.len(), 1);
        assert!(errs[0].1.contains("map char `X`"));
    }

    #[test]
    fn bad_exit_and_start() {
        let src = LEVEL
            .replace("R R1:IN", "R R9:IN")
            .replace("start=R0:S0", "start=R0:S7");
        let errs = errors(&src);
        assert_eq!(errs.len(), 2, "{errs:?}");
        assert!(errs.iter().all(|(k, _)| *k == ErrorKind::Referential));
    }

    #[test]
    fn object_outside_map() {
        let errs = errors(&LEVEL.replace("PAD at 1,1", "PAD at 3,1"));
        assert_eq!(errs[0].0, ErrorKind::Geometric);
    }

    #[test]
    fn too_many_vars() {
        let mut src = String::from("LEVEL w=1 h=1 start=R0:S0\nTILES\n. 0\nEND\nVARS\n");
        for i in 0..=MAX_VARS {
            src.push_str(&format!("V{i}\n"));
        }
        src.push_str("END\nROOM R0\nSPAWNS\nS0 0,0\nEND\nMAP\n.\nEND\nENDROOM\n");
        let errs = errors(&src);
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].0, ErrorKind::Limit);
    }

    #[test]
    fn no_charmap_without_tileset() {
        let src = "LEVEL w=1 h=1 start=R0:S0\nROOM R0\nSPAWNS\nS0 0,0\nEND\nMAP\n.\nEND\nENDROOM\n";
        let errs = errors(src);
        assert!(errs[0].1.contains("no character map"));
    }
}
