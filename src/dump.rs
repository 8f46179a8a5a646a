//! `lvlkit dump`: decode a compiled blob through the runtime readers.

use std::fmt::Write as _;

use color_eyre::eyre::{Result, bail};
use lvlkit_runtime::{Exit, LevelReader, ObjectRecord, RoomState, Spawn, TileRecord, TilesetReader};
use lvlkit_types::format::{lvl, tset};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct LevelDump<'a> {
    rooms: u8,
    width: u8,
    height: u8,
    flags: u8,
    vars: u8,
    items: u8,
    start: (u8, u8),
    integrity: Option<String>,
    room_list: Vec<RoomDump>,
    messages: Vec<&'a str>,
}

#[derive(Debug, Serialize)]
struct RoomDump {
    id: u8,
    spawns: Vec<Spawn>,
    exits: Vec<Exit>,
    objects: Vec<ObjectRecord>,
}

#[derive(Debug, Serialize)]
struct TilesetDump {
    tile_size: (u8, u8),
    colors: (u8, u8, u8),
    tiles: Vec<TileRecord>,
}

/// Render `blob` as text, or JSON when `json` is set. The format is chosen
/// by magic.
pub fn dump(blob: &[u8], json: bool) -> Result<String> {
    match blob.get(..4) {
        Some(m) if m == lvl::MAGIC => dump_level(blob, json),
        Some(m) if m == tset::MAGIC => dump_tileset(blob, json),
        _ => bail!("not an LVL1 or TSET blob"),
    }
}

fn dump_level(blob: &[u8], json: bool) -> Result<String> {
    let level = LevelReader::new(blob)?;
    let report = LevelDump {
        rooms: level.room_count(),
        width: level.width(),
        height: level.height(),
        flags: level.flag_count(),
        vars: level.var_count(),
        items: level.item_count(),
        start: (level.start_room(), level.start_spawn()),
        integrity: level.check_integrity().err().map(|e| e.to_string()),
        room_list: (0..level.room_count())
            .filter_map(|id| RoomState::load(&level, id, 0))
            .map(|room| RoomDump {
                id: room.id,
                spawns: room.spawns(&level).collect(),
                exits: room.exits(&level).collect(),
                objects: room.objects(&level).collect(),
            })
            .collect(),
        messages: (0..level.message_count()).map(|id| level.message(id)).collect(),
    };
    if json {
        return Ok(serde_json::to_string_pretty(&report)?);
    }

    let mut out = String::new();
    writeln!(out, "LVL1 {} bytes", blob.len())?;
    writeln!(out, "map        {}x{}", report.width, report.height)?;
    writeln!(
        out,
        "counts     rooms={} flags={} vars={} items={} messages={}",
        report.rooms,
        report.flags,
        report.vars,
        report.items,
        report.messages.len()
    )?;
    writeln!(out, "start      room {} spawn {}", report.start.0, report.start.1)?;
    writeln!(
        out,
        "sections   rooms={} cond={} act={} msgs={}",
        level.room_dir(),
        level.cond_base(),
        level.act_base(),
        level.msg_table()
    )?;
    match &report.integrity {
        None => writeln!(out, "integrity  ok")?,
        Some(e) => writeln!(out, "integrity  FAILED: {e}")?,
    }
    for room in &report.room_list {
        writeln!(
            out,
            "room {}: {} spawn(s), {} exit(s), {} object(s)",
            room.id,
            room.spawns.len(),
            room.exits.len(),
            room.objects.len()
        )?;
        for exit in &room.exits {
            writeln!(out, "  exit {:?} -> {}:{}", exit.edge, exit.room, exit.spawn)?;
        }
        for (i, obj) in room.objects.iter().enumerate() {
            let kind = obj.kind().map_or("?", |k| k.name());
            writeln!(
                out,
                "  object {i} {kind} at {},{} p0={} p1={}",
                obj.x, obj.y, obj.p0, obj.p1
            )?;
        }
    }
    for (id, text) in report.messages.iter().enumerate() {
        writeln!(out, "msg {id}: {text:?}")?;
    }
    Ok(out)
}

fn dump_tileset(blob: &[u8], json: bool) -> Result<String> {
    let ts = TilesetReader::new(blob)?;
    let report = TilesetDump {
        tile_size: (ts.tile_w(), ts.tile_h()),
        colors: (ts.bg_color(), ts.mc1_color(), ts.mc2_color()),
        tiles: (0..ts.tile_count()).map(|id| ts.tile(id)).collect(),
    };
    if json {
        return Ok(serde_json::to_string_pretty(&report)?);
    }

    let mut out = String::new();
    writeln!(out, "TSET {} bytes", blob.len())?;
    writeln!(out, "tile size  {}x{}", report.tile_size.0, report.tile_size.1)?;
    writeln!(
        out,
        "colors     bg={} mc1={} mc2={}",
        report.colors.0, report.colors.1, report.colors.2
    )?;
    for t in &report.tiles {
        writeln!(
            out,
            "tile {:3} chars={:?} mode={} colors={:?} flags={:?}",
            t.id, t.chars, t.color_mode, t.colors, t.flags
        )?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lvlkit_runtime::DEFAULT_LEVEL;

    #[test]
    fn dumps_default_level() {
        let text = dump(&DEFAULT_LEVEL, false).expect("dump");
        assert!(text.contains("map        1x1"));
        assert!(text.contains("integrity  ok"));
        assert!(text.contains("room 0: 1 spawn(s), 0 exit(s), 0 object(s)"));

        let json = dump(&DEFAULT_LEVEL, true).expect("json");
        assert!(json.contains("\"room_list\""));
    }

    #[test]
    fn unknown_magic() {
        assert!(dump(b"NOPE....", false).is_err());
        assert!(dump(b"", false).is_err());
    }
}
