//! Output files: blobs, `.sym` text maps, `.json` debug dumps and `_ids.rs`
//! symbol constants.
//!
//! Everything a build produces is rendered into memory first. Writing then
//! stages each file as a temporary sibling, moves existing targets aside and
//! renames the staged files into place. If any rename fails the targets are
//! put back, so a failed write leaves the previous output untouched.

use std::fmt::Write as _;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use lvlkit_types::Color;
use tempfile::{NamedTempFile, TempPath};

use crate::error::CompileError;
use crate::level::CompiledLevel;
use crate::tileset::CompiledTileset;

/// One output file, fully rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

impl Artifact {
    pub fn new(path: impl Into<PathBuf>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            bytes: bytes.into(),
        }
    }
}

fn color_name(c: u8) -> String {
    Color::from_repr(c).map_or_else(|| c.to_string(), |c| format!("{c:?}"))
}

fn flag_names<I: Iterator<Item = (&'static str, T)>, T>(names: I) -> String {
    let list: Vec<_> = names.map(|(n, _)| n).collect();
    if list.is_empty() {
        "-".to_string()
    } else {
        list.join("|")
    }
}

/// Human-readable offset map of a compiled level.
pub fn level_sym(level: &CompiledLevel) -> String {
    let d = &level.debug;
    let mut out = String::new();
    let _ = writeln!(out, "; level {}  ({} bytes)", d.name, d.size);
    let _ = writeln!(out, "map        {}x{}", d.width, d.height);
    let _ = writeln!(out, "start      room {} spawn {}", d.start_room, d.start_spawn);
    let _ = writeln!(out, "room_dir   {}", d.room_dir);
    let _ = writeln!(out, "cond       {}", d.cond_stream);
    let _ = writeln!(out, "act        {}", d.act_stream);
    let _ = writeln!(out, "msg_table  {}", d.msg_table);

    for (title, names) in [("flags", &d.flags), ("vars", &d.vars), ("items", &d.items)] {
        let _ = writeln!(out, "\n[{title}]");
        for (id, name) in names.iter().enumerate() {
            let _ = writeln!(out, "{id:3}  {name}");
        }
    }

    for room in &d.rooms {
        let _ = writeln!(out, "\n[room {} {}] \"{}\"", room.id, room.key, room.name);
        let _ = writeln!(
            out,
            "map {}  spawns {}  exits {}  objects {}",
            room.map, room.spawns_at, room.exits_at, room.objects_at
        );
        for (id, s) in room.spawns.iter().enumerate() {
            let _ = writeln!(out, "  spawn {id} {} at {},{}", s.name, s.x, s.y);
        }
        for e in &room.exits {
            let _ = writeln!(out, "  exit {:?} -> room {} spawn {}", e.edge, e.room, e.spawn);
        }
        for (idx, o) in room.objects.iter().enumerate() {
            let _ = writeln!(
                out,
                "  object {idx} {} {} at {},{} verbs={} p0={} p1={}",
                o.name,
                o.kind.name(),
                o.x,
                o.y,
                flag_names(o.verbs.iter_names()),
                o.p0,
                o.p1
            );
            for (slot, offset) in &o.scripts {
                let _ = writeln!(out, "    {slot:?} {offset}");
            }
        }
    }

    let _ = writeln!(out, "\n[cond scripts]");
    for s in &d.conds {
        let _ = writeln!(out, "{:>6}  {}", s.offset.to_string(), s.name);
    }
    let _ = writeln!(out, "\n[act scripts]");
    for s in &d.acts {
        let _ = writeln!(out, "{:>6}  {}", s.offset.to_string(), s.name);
    }
    let _ = writeln!(out, "\n[messages]");
    for m in &d.messages {
        let _ = writeln!(out, "{:3} {}  {}  {:?}", m.id, m.offset, m.name, m.text);
    }
    out
}

/// `name` as an identifier: anything outside `[A-Za-z0-9_]` becomes `_`, and
/// a leading digit gets a `_` prefix.
fn ident(name: &str, upper: bool) -> String {
    let mut out: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    out = if upper {
        out.to_ascii_uppercase()
    } else {
        out.to_ascii_lowercase()
    };
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

fn const_block<'a>(out: &mut String, module: &str, names: impl Iterator<Item = &'a str>) {
    let _ = writeln!(out, "\npub mod {module} {{");
    for (id, name) in names.enumerate() {
        let _ = writeln!(out, "    pub const {}: u8 = {id};", ident(name, true));
    }
    let _ = writeln!(out, "}}");
}

/// Rust constants for every id a level assigns: flags, vars, items,
/// messages, rooms, and per room its spawns and object indices.
pub fn level_ids(level: &CompiledLevel) -> String {
    let d = &level.debug;
    let mut out = String::new();
    let _ = writeln!(out, "//! Ids of level \"{}\". Generated by lvlkit; do not edit.", d.name);
    const_block(&mut out, "flags", d.flags.iter().map(String::as_str));
    const_block(&mut out, "vars", d.vars.iter().map(String::as_str));
    const_block(&mut out, "items", d.items.iter().map(String::as_str));
    const_block(&mut out, "messages", d.messages.iter().map(|m| m.name.as_str()));
    const_block(&mut out, "rooms", d.rooms.iter().map(|r| r.key.as_str()));
    for room in &d.rooms {
        let _ = writeln!(out, "\npub mod {} {{", ident(&room.key, false));
        for (id, s) in room.spawns.iter().enumerate() {
            let _ = writeln!(out, "    pub const SPAWN_{}: u8 = {id};", ident(&s.name, true));
        }
        for (idx, o) in room.objects.iter().enumerate() {
            let _ = writeln!(out, "    pub const {}: u8 = {idx};", ident(&o.name, true));
        }
        let _ = writeln!(out, "}}");
    }
    out
}

/// Human-readable dump of a compiled tileset.
pub fn tileset_sym(ts: &CompiledTileset) -> String {
    let h = &ts.header;
    let mut out = String::new();
    let _ = writeln!(out, "; tileset {}  ({} bytes)", ts.name, ts.blob.len());
    let _ = writeln!(out, "tile       {}x{}", h.tile_w, h.tile_h);
    let _ = writeln!(out, "count      {}", h.tile_count);
    let _ = writeln!(out, "records    ${:04X} x {}", h.records_offset, h.record_size);
    let _ = writeln!(
        out,
        "colors     bg={} mc1={} mc2={}",
        color_name(h.bg_color),
        color_name(h.mc1_color),
        color_name(h.mc2_color)
    );
    let _ = writeln!(
        out,
        "charset    {}",
        ts.charset_path.as_deref().unwrap_or("-")
    );

    let _ = writeln!(out, "\n[tiles]");
    for t in &ts.tiles {
        let colors = t.colors.map(color_name).join(",");
        let _ = writeln!(
            out,
            "{:3}  {:<16} chars={:?} mode={} colors={} flags={}",
            t.id,
            t.name,
            t.chars,
            t.color_mode,
            colors,
            flag_names(t.flags.iter_names())
        );
    }
    if !ts.stamps.is_empty() {
        let _ = writeln!(out, "\n[stamps]");
        for (ch, s) in &ts.stamps {
            let _ = writeln!(out, "'{ch}'  {} {}x{} {:?}", s.name, s.w, s.h, s.tiles);
        }
    }
    if !ts.charmap.is_empty() {
        let _ = writeln!(out, "\n[charmap]");
        for (ch, id) in &ts.charmap {
            let _ = writeln!(out, "'{ch}'  {id}");
        }
    }
    out
}

/// Blob plus, when `debug` is set, its `.sym`, `.json` and `_ids.rs`
/// companions.
pub fn level_artifacts(
    level: &CompiledLevel,
    out_dir: &Path,
    stem: &str,
    debug: bool,
) -> Result<Vec<Artifact>, CompileError> {
    let mut out = vec![Artifact::new(
        out_dir.join(format!("{stem}.lvl.bin")),
        level.blob.clone(),
    )];
    if debug {
        out.push(Artifact::new(
            out_dir.join(format!("{stem}.lvl.sym")),
            level_sym(level),
        ));
        out.push(Artifact::new(
            out_dir.join(format!("{stem}.lvl.json")),
            serde_json::to_string_pretty(level)?,
        ));
        out.push(Artifact::new(
            out_dir.join(format!("{stem}_ids.rs")),
            level_ids(level),
        ));
    }
    Ok(out)
}

/// Blob, the charset companion when loaded, and optional debug files.
pub fn tileset_artifacts(
    ts: &CompiledTileset,
    out_dir: &Path,
    stem: &str,
    debug: bool,
) -> Result<Vec<Artifact>, CompileError> {
    let mut out = vec![Artifact::new(
        out_dir.join(format!("{stem}.tset.bin")),
        ts.blob.clone(),
    )];
    if let Some(charset) = &ts.charset {
        out.push(Artifact::new(
            out_dir.join(format!("{stem}.chr.bin")),
            charset.clone(),
        ));
    }
    if debug {
        out.push(Artifact::new(
            out_dir.join(format!("{stem}.tset.sym")),
            tileset_sym(ts),
        ));
        out.push(Artifact::new(
            out_dir.join(format!("{stem}.tset.json")),
            serde_json::to_string_pretty(ts)?,
        ));
    }
    Ok(out)
}

fn write_error(path: &Path) -> impl FnOnce(std::io::Error) -> CompileError + '_ {
    move |source| CompileError::Write {
        path: path.to_path_buf(),
        source,
    }
}

/// A target being replaced, with the previous file moved aside.
struct Placement<'a> {
    path: &'a Path,
    backup: Option<TempPath>,
    written: bool,
}

/// Put every target back the way it was before [`write_all`] started.
fn roll_back(placed: Vec<Placement<'_>>) {
    for p in placed.into_iter().rev() {
        match p.backup {
            Some(backup) => {
                if let Err(e) = std::fs::rename(&backup, p.path) {
                    log::error!("cannot restore {}: {e}", p.path.display());
                    if let Ok(kept) = backup.keep() {
                        log::error!("previous contents kept at {}", kept.display());
                    }
                }
            }
            None if p.written => {
                if let Err(e) = std::fs::remove_file(p.path) {
                    log::warn!("cannot remove {}: {e}", p.path.display());
                }
            }
            None => {}
        }
    }
}

fn target_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

/// Write every artifact or none of them.
///
/// Each file is first written to a temporary file in its target directory.
/// Existing targets are then moved aside to temporary backups and the staged
/// files renamed over their final paths. A failed rename restores every
/// backup and removes files that did not exist before.
pub fn write_all(artifacts: &[Artifact]) -> Result<(), CompileError> {
    let mut staged = Vec::with_capacity(artifacts.len());
    for a in artifacts {
        let dir = target_dir(&a.path);
        std::fs::create_dir_all(dir).map_err(write_error(dir))?;
        let mut tmp = NamedTempFile::new_in(dir).map_err(write_error(&a.path))?;
        tmp.write_all(&a.bytes).map_err(write_error(&a.path))?;
        tmp.flush().map_err(write_error(&a.path))?;
        staged.push((tmp, a.path.as_path()));
    }

    let mut placed: Vec<Placement<'_>> = Vec::with_capacity(staged.len());
    for &(_, path) in &staged {
        let mut backup = None;
        if path.is_file() {
            let moved = NamedTempFile::new_in(target_dir(path))
                .map(NamedTempFile::into_temp_path)
                .and_then(|aside| std::fs::rename(path, &aside).map(|()| aside));
            match moved {
                Ok(aside) => backup = Some(aside),
                Err(e) => {
                    roll_back(placed);
                    return Err(write_error(path)(e));
                }
            }
        }
        placed.push(Placement {
            path,
            backup,
            written: false,
        });
    }

    for (idx, (tmp, path)) in staged.into_iter().enumerate() {
        if let Err(e) = tmp.persist(path) {
            roll_back(placed);
            return Err(write_error(path)(e.error));
        }
        placed[idx].written = true;
    }
    for p in &placed {
        log::info!("wrote {}", p.path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::compile_level;
    use crate::tileset::compile_tileset;

    const TSET: &str = "TSET name=\"t\" tileSize=2x2 bgColor=black mc1Color=gray mc2Color=white\n\
                        TILES\nFLOOR chars=1,1,1,1 color=gray flags=FLOOR\nWALL chars=2,2,2,2 color=red flags=SOLID\nEND\n\
                        CHARMAP\n. FLOOR\n# WALL\nEND\n";

    const LVL: &str = "LEVEL name=\"Tiny\" w=2 h=1 start=R0:S0\nMESSAGES\nHI = \"hello\"\nEND\n\
                       ACT SAY\nMSG HI\nEND\nROOM R0\nSPAWNS\nS0 0,0\nEND\nOBJECTS\n\
                       BOARD at 1,0 type=SIGN verbs=LOOK look=SAY\nEND\nMAP\n.#\nEND\nENDROOM\n";

    #[test]
    fn level_sym_lists_offsets() {
        let ts = compile_tileset("t.tset", TSET).unwrap();
        let level = compile_level("tiny.lvl", LVL, Some(&ts)).unwrap();
        let sym = level_sym(&level);
        assert!(sym.contains("room_dir   $0016"));
        assert!(sym.contains("object 0 BOARD SIGN at 1,0 verbs=LOOK"));
        assert!(sym.contains("Look +3"));
        assert!(sym.contains("\"hello\""));
    }

    #[test]
    fn level_ids_as_constants() {
        let ts = compile_tileset("t.tset", TSET).unwrap();
        let level = compile_level("tiny.lvl", LVL, Some(&ts)).unwrap();
        let ids = level_ids(&level);
        assert!(ids.contains("pub mod messages {\n    pub const HI: u8 = 0;\n}"));
        assert!(ids.contains("pub mod rooms {\n    pub const R0: u8 = 0;\n}"));
        assert!(ids.contains("pub mod r0 {\n    pub const SPAWN_S0: u8 = 0;\n    pub const BOARD: u8 = 0;\n}"));
        assert!(ids.contains("pub mod flags {\n}"));
    }

    #[test]
    fn identifiers_are_sanitized() {
        assert_eq!(ident("door-2", true), "DOOR_2");
        assert_eq!(ident("9LIVES", true), "_9LIVES");
        assert_eq!(ident("Hall", false), "hall");
    }

    #[test]
    fn tileset_sym_decodes_records() {
        let ts = compile_tileset("t.tset", TSET).unwrap();
        let sym = tileset_sym(&ts);
        assert!(sym.contains("colors     bg=Black mc1=Gray mc2=White"));
        assert!(sym.contains("WALL"));
        assert!(sym.contains("flags=SOLID"));
        assert!(sym.contains("'#'  1"));
    }

    #[test]
    fn json_has_debug_fields() {
        let ts = compile_tileset("t.tset", TSET).unwrap();
        let level = compile_level("tiny.lvl", LVL, Some(&ts)).unwrap();
        let files = level_artifacts(&level, Path::new("out"), "tiny", true).unwrap();
        assert_eq!(files.len(), 4);
        assert_eq!(files[2].path, Path::new("out/tiny.lvl.json"));
        let json: serde_json::Value = serde_json::from_slice(&files[2].bytes).unwrap();
        assert_eq!(json["name"], "Tiny");
        assert_eq!(json["debug"]["rooms"][0]["objects"][0]["name"], "BOARD");
        assert!(json.get("blob").is_none());
    }

    #[test]
    fn no_debug_means_blob_only() {
        let ts = compile_tileset("t.tset", TSET).unwrap();
        let files = tileset_artifacts(&ts, Path::new("out"), "t", false).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, Path::new("out/t.tset.bin"));
    }

    #[test]
    fn write_all_places_every_file() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![
            Artifact::new(dir.path().join("a.bin"), vec![1, 2, 3]),
            Artifact::new(dir.path().join("sub/b.sym"), "text"),
        ];
        write_all(&files).unwrap();
        assert_eq!(std::fs::read(dir.path().join("a.bin")).unwrap(), vec![1, 2, 3]);
        assert_eq!(std::fs::read_to_string(dir.path().join("sub/b.sym")).unwrap(), "text");
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 2);
    }

    #[test]
    fn failed_write_restores_previous_output() {
        let dir = tempfile::tempdir().unwrap();
        let blob = dir.path().join("lvl.bin");
        let fresh = dir.path().join("fresh.bin");
        let sym = dir.path().join("lvl.sym");
        std::fs::write(&blob, "old").unwrap();
        // a non-empty directory where a file should go makes the last rename fail
        std::fs::create_dir(&sym).unwrap();
        std::fs::write(sym.join("blocker"), "x").unwrap();

        let files = vec![
            Artifact::new(&blob, vec![9, 9]),
            Artifact::new(&fresh, vec![1]),
            Artifact::new(&sym, "text"),
        ];
        let err = write_all(&files).unwrap_err();
        assert!(matches!(err, CompileError::Write { .. }), "{err}");
        assert_eq!(std::fs::read(&blob).unwrap(), b"old");
        assert!(!fresh.exists());
        assert!(sym.join("blocker").is_file());
        let mut left: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        left.sort();
        assert_eq!(left, vec!["lvl.bin", "lvl.sym"]);
    }

    #[test]
    fn rewrite_replaces_previous_output() {
        let dir = tempfile::tempdir().unwrap();
        let blob = dir.path().join("lvl.bin");
        std::fs::write(&blob, "old").unwrap();
        write_all(&[Artifact::new(&blob, vec![4, 2])]).unwrap();
        assert_eq!(std::fs::read(&blob).unwrap(), vec![4, 2]);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
