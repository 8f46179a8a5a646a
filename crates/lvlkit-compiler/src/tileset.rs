//! Tileset source → `TSET` blob.
//!
//! ```text
//! TSET name="boot" tileSize=2x2 bgColor=black mc1Color=gray mc2Color=white
//! TILES
//!   FLOOR chars=1,2,3,4 color=gray flags=FLOOR|STANDABLE
//!   WALL  chars=A,A,A,A colors=red,red,brown,brown flags=SOLID
//! END
//! OBJECTS
//!   CRATE size=2x2 tiles=WALL,WALL,FLOOR,FLOOR
//! END
//! CHARMAP
//!   . FLOOR
//!   # WALL
//!   C CRATE
//! END
//! ```

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use lvlkit_types::format::{MAX_COUNT, tset};
use lvlkit_types::{Color, TileFlags};
use serde::Serialize;

use crate::error::{CompileError, Diagnostics};
use crate::layout::{BlobWriter, SymbolTable};
use crate::source::{self, Fields, SourceLine};
use crate::stamp::Stamp;

/// A decoded tile record, as written to the blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TileDef {
    pub id: u8,
    pub name: String,
    pub chars: [u8; 4],
    pub color_mode: u8,
    pub colors: [u8; 4],
    pub flags: TileFlags,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TilesetHeader {
    pub tile_w: u8,
    pub tile_h: u8,
    pub tile_count: u8,
    pub record_size: u8,
    pub records_offset: u16,
    pub bg_color: u8,
    pub mc1_color: u8,
    pub mc2_color: u8,
}

/// Result of compiling one tileset source.
#[derive(Debug, Clone, Serialize)]
pub struct CompiledTileset {
    pub name: String,
    #[serde(skip)]
    pub blob: Vec<u8>,
    pub header: TilesetHeader,
    pub tiles: Vec<TileDef>,
    /// Map chars bound to a single tile.
    pub charmap: BTreeMap<char, u8>,
    /// Map chars bound to a multi-tile stamp.
    pub stamps: BTreeMap<char, Stamp>,
    /// `charset=` as written in the source.
    pub charset_path: Option<String>,
    /// Companion glyph data, passed through unchanged when loaded from disk.
    #[serde(skip)]
    pub charset: Option<Vec<u8>>,
}

impl CompiledTileset {
    pub fn tile_id(&self, name: &str) -> Option<u8> {
        self.tiles.iter().find(|t| t.name == name).map(|t| t.id)
    }
}

struct RawTile {
    line: usize,
    name: String,
    chars: [u8; 4],
    color_mode: u8,
    colors: [u8; 4],
    flags: TileFlags,
}

struct RawStamp {
    line: usize,
    name: String,
    w: u8,
    h: u8,
    tiles: Vec<String>,
}

struct RawCharmap {
    line: usize,
    ch: char,
    target: String,
}

#[derive(Default)]
struct Header {
    name: String,
    declared_count: Option<u32>,
    bg: u8,
    mc1: u8,
    mc2: u8,
    charset: Option<String>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Tiles,
    Objects,
    Charmap,
}

const ALLOWED_STAMP_SIZES: [(u8, u8); 4] = [(1, 1), (1, 2), (2, 1), (2, 2)];

/// Compile tileset source text. `file` is only used in diagnostics.
pub fn compile_tileset(file: &str, text: &str) -> Result<CompiledTileset, CompileError> {
    let mut diags = Diagnostics::new(file);
    let mut header: Option<Header> = None;
    let mut section = Section::None;
    let mut tiles = Vec::new();
    let mut stamps = Vec::new();
    let mut charmap = Vec::new();

    for line in source::source_lines(text) {
        if line.text == "END" {
            if section == Section::None {
                diags.structural(line.number, "END without an open section");
            }
            section = Section::None;
            continue;
        }

        let fields = match source::split_fields(line.text) {
            Ok(f) => f,
            Err(e) => {
                diags.structural(line.number, e.to_string());
                continue;
            }
        };
        let head = fields.word(0).unwrap_or_default();

        if head == "TSET" {
            if header.is_some() {
                diags.structural(line.number, "duplicate TSET header");
            }
            header = Some(parse_header(&fields, line.number, &mut diags));
            continue;
        }
        if header.is_none() {
            diags.structural(line.number, format!("expected TSET header, found `{head}`"));
            continue;
        }

        match head {
            "TILES" => section = Section::Tiles,
            "OBJECTS" => section = Section::Objects,
            "CHARMAP" => section = Section::Charmap,
            _ => match section {
                Section::Tiles => {
                    if let Some(t) = parse_tile(&fields, line, &mut diags) {
                        tiles.push(t);
                    }
                }
                Section::Objects => {
                    if let Some(s) = parse_stamp(&fields, line, &mut diags) {
                        stamps.push(s);
                    }
                }
                Section::Charmap => {
                    if let Some(c) = parse_charmap(&fields, line, &mut diags) {
                        charmap.push(c);
                    }
                }
                Section::None => {
                    diags.structural(line.number, format!("unexpected line `{}`", line.text));
                }
            },
        }
    }

    let Some(header) = header else {
        diags.structural(0, "missing TSET header");
        return Err(CompileError::Invalid(diags));
    };
    if section != Section::None {
        diags.structural(0, "unterminated section at end of file");
    }

    match resolve(header, tiles, stamps, charmap, &mut diags) {
        Some(ts) => diags.finish(ts),
        None => Err(CompileError::Invalid(diags)),
    }
}

fn parse_header(fields: &Fields<'_>, line: usize, diags: &mut Diagnostics) -> Header {
    let mut header = Header {
        name: fields.get("name").unwrap_or("UNNAMED").to_string(),
        ..Header::default()
    };
    if let Err(e) = source::check_text(&header.name) {
        diags.structural(line, e.to_string());
    }
    match fields.get("tileSize") {
        None => diags.structural(line, "TSET requires tileSize=2x2"),
        Some(size) => match source::parse_size(size) {
            Ok((w, h)) if w == tset::TILE_W && h == tset::TILE_H => {}
            Ok(_) => diags.geometric(line, format!("tileSize must be 2x2, got {size}")),
            Err(e) => diags.structural(line, e.to_string()),
        },
    }
    for (key, slot) in [
        ("bgColor", &mut header.bg),
        ("mc1Color", &mut header.mc1),
        ("mc2Color", &mut header.mc2),
    ] {
        match fields.get(key) {
            None => diags.structural(line, format!("TSET requires {key}=")),
            Some(v) => match parse_color(v) {
                Some(c) => *slot = c,
                None => diags.limit(line, format!("{key} must be 0..15 or a color name, got `{v}`")),
            },
        }
    }
    if let Some(count) = fields.get("count") {
        match source::parse_num(count) {
            Ok(n) => header.declared_count = Some(n),
            Err(e) => diags.structural(line, e.to_string()),
        }
    }
    header.charset = fields.get("charset").map(str::to_string);
    header
}

fn parse_color(text: &str) -> Option<u8> {
    let key: String = text.chars().filter(|c| *c != '_' && *c != '-').collect();
    if let Ok(c) = Color::from_str(&key) {
        return Some(c as u8);
    }
    source::parse_in_range(text, 0, Color::MAX as u32)
        .ok()
        .map(|v| v as u8)
}

/// `A`..`Z` map to screen codes 1..26; anything else is a number 0..255.
fn parse_char_code(text: &str) -> Result<u8, String> {
    let mut chars = text.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if c.is_ascii_alphabetic() {
            return Ok(c.to_ascii_uppercase() as u8 - b'A' + 1);
        }
    }
    source::parse_u8(text).map_err(|e| e.to_string())
}

fn parse_tile(fields: &Fields<'_>, line: SourceLine<'_>, diags: &mut Diagnostics) -> Option<RawTile> {
    let name = fields.word(0).unwrap_or_default();
    if fields.words.len() != 1 || !source::is_ident(name) {
        diags.structural(line.number, format!("bad tile line `{}`", line.text));
        return None;
    }
    for (key, _) in &fields.pairs {
        if !matches!(*key, "chars" | "color" | "colors" | "flags") {
            diags.structural(line.number, format!("tile {name}: unknown key `{key}`"));
        }
    }

    let Some(chars_text) = fields.get("chars") else {
        diags.structural(line.number, format!("tile {name}: missing chars="));
        return None;
    };
    let codes: Vec<_> = chars_text.split(',').map(|c| parse_char_code(c.trim())).collect();
    if codes.len() != 4 {
        diags.structural(
            line.number,
            format!("tile {name}: chars= needs exactly 4 values, got {}", codes.len()),
        );
        return None;
    }
    let mut chars = [0u8; 4];
    for (slot, code) in chars.iter_mut().zip(codes) {
        match code {
            Ok(c) => *slot = c,
            Err(e) => {
                diags.limit(line.number, format!("tile {name}: {e}"));
                return None;
            }
        }
    }

    let color_text = match (fields.get("color"), fields.get("colors")) {
        (Some(c), None) | (None, Some(c)) => c,
        (Some(_), Some(_)) => {
            diags.structural(line.number, format!("tile {name}: give color= or colors=, not both"));
            return None;
        }
        (None, None) => {
            diags.structural(line.number, format!("tile {name}: missing color= or colors="));
            return None;
        }
    };
    let parsed: Vec<_> = color_text.split(',').map(|c| parse_color(c.trim())).collect();
    let (color_mode, colors) = match parsed.as_slice() {
        [Some(c)] => (tset::COLOR_MODE_SINGLE, [*c, 0, 0, 0]),
        [Some(a), Some(b), Some(c), Some(d)] => (tset::COLOR_MODE_PER_QUADRANT, [*a, *b, *c, *d]),
        [_] | [_, _, _, _] => {
            diags.limit(line.number, format!("tile {name}: colors must be 0..15 or color names"));
            return None;
        }
        _ => {
            diags.structural(
                line.number,
                format!("tile {name}: expected 1 or 4 colors, got {}", parsed.len()),
            );
            return None;
        }
    };

    let flags = match TileFlags::parse_list(fields.get("flags").unwrap_or("")) {
        Ok(f) => f,
        Err(e) => {
            diags.referential(line.number, format!("tile {name}: {e}"));
            return None;
        }
    };

    Some(RawTile {
        line: line.number,
        name: name.to_string(),
        chars,
        color_mode,
        colors,
        flags,
    })
}

fn parse_stamp(fields: &Fields<'_>, line: SourceLine<'_>, diags: &mut Diagnostics) -> Option<RawStamp> {
    let name = fields.word(0).unwrap_or_default();
    if fields.words.len() != 1 || !source::is_ident(name) {
        diags.structural(line.number, format!("bad object line `{}`", line.text));
        return None;
    }
    if fields.get("char").is_some() {
        diags.structural(
            line.number,
            format!("object {name}: bind its char in CHARMAP, not with char="),
        );
    }
    let (w, h) = match fields.get("size").map(source::parse_size) {
        Some(Ok(size)) => size,
        Some(Err(e)) => {
            diags.structural(line.number, format!("object {name}: {e}"));
            return None;
        }
        None => {
            diags.structural(line.number, format!("object {name}: missing size="));
            return None;
        }
    };
    if !ALLOWED_STAMP_SIZES.contains(&(w, h)) {
        diags.geometric(
            line.number,
            format!("object {name}: size {w}x{h} not allowed (1x1, 1x2, 2x1, 2x2)"),
        );
        return None;
    }
    let tiles: Vec<String> = fields
        .get("tiles")
        .unwrap_or("")
        .split(',')
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    if tiles.len() != w as usize * h as usize {
        diags.geometric(
            line.number,
            format!(
                "object {name}: tiles count {} does not match size {w}x{h}",
                tiles.len()
            ),
        );
        return None;
    }
    Some(RawStamp {
        line: line.number,
        name: name.to_string(),
        w,
        h,
        tiles,
    })
}

fn parse_charmap(
    fields: &Fields<'_>,
    line: SourceLine<'_>,
    diags: &mut Diagnostics,
) -> Option<RawCharmap> {
    match (fields.words.as_slice(), fields.pairs.is_empty()) {
        ([key, target], true) if key.chars().count() == 1 => Some(RawCharmap {
            line: line.number,
            ch: key.chars().next()?,
            target: target.to_string(),
        }),
        _ => {
            diags.structural(
                line.number,
                format!("CHARMAP line must be `<char> <name>`, got `{}`", line.text),
            );
            None
        }
    }
}

fn resolve(
    header: Header,
    raw_tiles: Vec<RawTile>,
    raw_stamps: Vec<RawStamp>,
    raw_charmap: Vec<RawCharmap>,
    diags: &mut Diagnostics,
) -> Option<CompiledTileset> {
    let mut names = SymbolTable::new("tile", MAX_COUNT);
    let mut tiles = Vec::with_capacity(raw_tiles.len());
    for t in raw_tiles {
        match names.declare(&t.name) {
            Ok(id) => tiles.push(TileDef {
                id,
                name: t.name,
                chars: t.chars,
                color_mode: t.color_mode,
                colors: t.colors,
                flags: t.flags,
            }),
            Err(e @ crate::layout::LayoutError::Full { .. }) => {
                diags.limit(t.line, e.to_string());
                break;
            }
            Err(e) => diags.structural(t.line, e.to_string()),
        }
    }
    if tiles.is_empty() {
        diags.structural(0, "tileset defines no tiles");
    }
    if let Some(declared) = header.declared_count {
        if tiles.len() as u32 > declared {
            diags.limit(0, format!("defined {} tiles but count={declared}", tiles.len()));
        }
    }

    let mut stamp_defs: HashMap<String, Stamp> = HashMap::new();
    for s in raw_stamps {
        if names.id(&s.name).is_some() || stamp_defs.contains_key(&s.name) {
            diags.structural(s.line, format!("duplicate tile or object name `{}`", s.name));
            continue;
        }
        let mut ids = Vec::with_capacity(s.tiles.len());
        for t in &s.tiles {
            match names.id(t) {
                Some(id) => ids.push(id),
                None => diags.referential(s.line, format!("object {}: unknown tile `{t}`", s.name)),
            }
        }
        if ids.len() == s.tiles.len() {
            stamp_defs.insert(
                s.name.clone(),
                Stamp {
                    name: s.name,
                    w: s.w,
                    h: s.h,
                    tiles: ids,
                },
            );
        }
    }

    let mut charmap = BTreeMap::new();
    let mut stamps = BTreeMap::new();
    let mut bound_stamps: HashMap<String, char> = HashMap::new();
    for entry in raw_charmap {
        if charmap.contains_key(&entry.ch) || stamps.contains_key(&entry.ch) {
            diags.structural(entry.line, format!("duplicate CHARMAP key `{}`", entry.ch));
            continue;
        }
        if let Some(id) = names.id(&entry.target) {
            charmap.insert(entry.ch, id);
        } else if let Some(stamp) = stamp_defs.get(&entry.target) {
            if let Some(prev) = bound_stamps.insert(entry.target.clone(), entry.ch) {
                diags.structural(
                    entry.line,
                    format!("object {} already bound to `{prev}`", entry.target),
                );
                continue;
            }
            stamps.insert(entry.ch, stamp.clone());
        } else {
            diags.referential(
                entry.line,
                format!("CHARMAP `{}` names unknown tile or object `{}`", entry.ch, entry.target),
            );
        }
    }

    if !diags.is_empty() {
        return None;
    }

    let header_out = TilesetHeader {
        tile_w: tset::TILE_W,
        tile_h: tset::TILE_H,
        tile_count: names.count(),
        record_size: tset::RECORD_SIZE as u8,
        records_offset: tset::HEADER_SIZE as u16,
        bg_color: header.bg,
        mc1_color: header.mc1,
        mc2_color: header.mc2,
    };
    let blob = match write_blob(&header_out, &tiles) {
        Ok(b) => b,
        Err(e) => {
            diags.limit(0, e.to_string());
            return None;
        }
    };
    log::info!(
        "tileset {}: {} tiles, {} stamps, {} bytes",
        header.name,
        tiles.len(),
        stamps.len(),
        blob.len()
    );

    Some(CompiledTileset {
        name: header.name,
        blob,
        header: header_out,
        tiles,
        charmap,
        stamps,
        charset_path: header.charset,
        charset: None,
    })
}

fn write_blob(
    header: &TilesetHeader,
    tiles: &[TileDef],
) -> Result<Vec<u8>, crate::layout::LayoutError> {
    let mut w = BlobWriter::new();
    w.bytes(&tset::MAGIC);
    w.u8(tset::VERSION);
    w.u8(header.tile_w);
    w.u8(header.tile_h);
    w.u8(header.tile_count);
    w.u8(header.record_size);
    w.u16(header.records_offset);
    w.u16(0);
    w.u8(header.bg_color);
    w.u8(header.mc1_color);
    w.u8(header.mc2_color);
    w.u8(0);
    debug_assert_eq!(w.len(), tset::HEADER_SIZE);
    for t in tiles {
        w.u8(t.id);
        w.bytes(&t.chars);
        w.u8(t.color_mode);
        w.bytes(&t.colors);
        w.u16(t.flags.bits());
    }
    w.finish("tileset")
}
