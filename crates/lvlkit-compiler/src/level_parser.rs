//! Level source → [`LevelSource`] declarations.
//!
//! Parsing only checks line shape. Every name is resolved later by the level
//! compiler, once all declarations are known, so scripts, rooms and messages
//! may be referenced before they are declared.

use std::str::FromStr;

use lvlkit_types::{ExitEdge, ObjectKind, Verbs};

use crate::error::Diagnostics;
use crate::source::{self, Fields, SourceLine};

#[derive(Debug, Clone, Default)]
pub struct LevelSource {
    pub header: Option<LevelHeader>,
    /// Level-local char → tile bindings; empty means use the tileset CHARMAP.
    pub tiles: Vec<CharBinding>,
    pub flags: Vec<Named>,
    pub vars: Vec<Named>,
    pub items: Vec<Named>,
    pub messages: Vec<MessageDecl>,
    pub conds: Vec<ScriptDecl>,
    pub acts: Vec<ScriptDecl>,
    pub rooms: Vec<RoomDecl>,
}

#[derive(Debug, Clone)]
pub struct LevelHeader {
    pub line: usize,
    pub name: String,
    pub w: u8,
    pub h: u8,
    pub start_room: String,
    pub start_spawn: String,
    pub tset: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Named {
    pub line: usize,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileRef {
    Name(String),
    Id(u8),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharBinding {
    pub line: usize,
    pub ch: char,
    pub tile: TileRef,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDecl {
    pub line: usize,
    pub name: String,
    pub text: String,
}

/// One instruction line: mnemonic and operand words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrLine {
    pub line: usize,
    pub op: String,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptDecl {
    pub line: usize,
    pub name: String,
    pub body: Vec<InstrLine>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnDecl {
    pub line: usize,
    pub name: String,
    pub x: u8,
    pub y: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitDecl {
    pub line: usize,
    pub edge: ExitEdge,
    pub room: String,
    pub spawn: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectDecl {
    pub line: usize,
    pub name: String,
    pub x: u8,
    pub y: u8,
    pub kind: ObjectKind,
    pub verbs: Verbs,
    /// Every `key=value` except `type` and `verbs`, in source order.
    pub keys: Vec<(String, String)>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomDecl {
    pub line: usize,
    pub id: String,
    pub name: String,
    pub spawns: Vec<SpawnDecl>,
    pub exits: Vec<ExitDecl>,
    pub objects: Vec<ObjectDecl>,
    /// `(line, row)` pairs as written.
    pub map: Vec<(usize, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Tiles,
    Flags,
    Vars,
    Items,
    Messages,
    Cond,
    Act,
    Spawns,
    Exits,
    Objects,
    Map,
}

struct Parser<'d> {
    diags: &'d mut Diagnostics,
    out: LevelSource,
    section: Section,
    room: Option<RoomDecl>,
}

/// Parse level source text, recording problems in `diags`.
pub fn parse_level(text: &str, diags: &mut Diagnostics) -> LevelSource {
    let mut p = Parser {
        diags,
        out: LevelSource::default(),
        section: Section::None,
        room: None,
    };
    let mut last_line = 0;
    for line in source::source_lines(text) {
        last_line = line.number;
        p.line(line);
    }
    if matches!(p.section, Section::Cond | Section::Act) {
        p.diags
            .structural(last_line, "script not closed with END at end of file");
    }
    if let Some(room) = p.room.take() {
        p.diags.structural(
            last_line,
            format!("ROOM {} not closed with ENDROOM at end of file", room.id),
        );
    }
    if p.out.header.is_none() {
        p.diags.structural(0, "missing LEVEL header");
    }
    p.out
}

/// The `tset=` path of the LEVEL header, if the source names one.
pub fn declared_tileset(text: &str) -> Option<String> {
    source::source_lines(text)
        .filter_map(|line| source::split_fields(line.text).ok())
        .find(|f| f.word(0) == Some("LEVEL"))
        .and_then(|f| f.get("tset").map(str::to_string))
}

impl Parser<'_> {
    fn line(&mut self, line: SourceLine<'_>) {
        match line.text {
            "END" => return self.end(line.number),
            "ENDROOM" => return self.end_room(line.number),
            _ => {}
        }

        match self.section {
            Section::Cond | Section::Act => return self.instruction(line),
            Section::Map => {
                if let Some(room) = self.room.as_mut() {
                    room.map.push((line.number, line.text.to_string()));
                }
                return;
            }
            Section::Messages => return self.message(line),
            _ => {}
        }

        let fields = match source::split_fields(line.text) {
            Ok(f) => f,
            Err(e) => return self.diags.structural(line.number, e.to_string()),
        };
        let head = fields.word(0).unwrap_or_default();

        if head == "LEVEL" {
            return self.header(&fields, line.number);
        }
        if self.out.header.is_none() {
            return self
                .diags
                .structural(line.number, format!("expected LEVEL header, found `{head}`"));
        }

        match head {
            "TILES" => self.top_section(Section::Tiles, line.number, head),
            "FLAGS" => self.top_section(Section::Flags, line.number, head),
            "VARS" => self.top_section(Section::Vars, line.number, head),
            "ITEMS" => self.top_section(Section::Items, line.number, head),
            "MESSAGES" => self.top_section(Section::Messages, line.number, head),
            "COND" | "ACT" => self.script(&fields, line.number, head),
            "ROOM" => self.room(&fields, line.number),
            "SPAWNS" => self.room_section(Section::Spawns, line.number, head),
            "EXITS" => self.room_section(Section::Exits, line.number, head),
            "OBJECTS" => self.room_section(Section::Objects, line.number, head),
            "MAP" => self.room_section(Section::Map, line.number, head),
            _ => self.entry(&fields, line),
        }
    }

    fn end(&mut self, line: usize) {
        if self.section == Section::None {
            self.diags.structural(line, "END without an open block");
        }
        self.section = Section::None;
    }

    fn end_room(&mut self, line: usize) {
        if matches!(self.section, Section::Cond | Section::Act) {
            self.diags.structural(line, "ENDROOM inside a script");
        }
        match self.room.take() {
            Some(room) => self.out.rooms.push(room),
            None => self.diags.structural(line, "ENDROOM without ROOM"),
        }
        self.section = Section::None;
    }

    fn header(&mut self, fields: &Fields<'_>, line: usize) {
        if self.out.header.is_some() {
            return self.diags.structural(line, "duplicate LEVEL header");
        }
        let mut dim = |key: &str| match fields.get(key).map(source::parse_u8) {
            Some(Ok(v)) if v > 0 => Some(v),
            Some(Ok(_)) => {
                self.diags.limit(line, format!("LEVEL {key}= must be 1..255"));
                None
            }
            Some(Err(e)) => {
                self.diags.limit(line, format!("LEVEL {key}=: {e}"));
                None
            }
            None => {
                self.diags.structural(line, format!("LEVEL requires {key}="));
                None
            }
        };
        let w = dim("w");
        let h = dim("h");
        let start = match fields.get("start").map(source::parse_room_spawn) {
            Some(Ok((r, s))) => Some((r.to_string(), s.to_string())),
            Some(Err(e)) => {
                self.diags.structural(line, e.to_string());
                None
            }
            None => {
                self.diags.structural(line, "LEVEL requires start=ROOM:SPAWN");
                None
            }
        };
        let name = fields.get("name").unwrap_or("UNNAMED").to_string();
        if let Err(e) = source::check_text(&name) {
            self.diags.structural(line, e.to_string());
        }
        if let (Some(w), Some(h), Some((start_room, start_spawn))) = (w, h, start) {
            self.out.header = Some(LevelHeader {
                line,
                name,
                w,
                h,
                start_room,
                start_spawn,
                tset: fields.get("tset").map(str::to_string),
            });
        } else {
            // Keep parsing so later errors are reported too.
            self.out.header = Some(LevelHeader {
                line,
                name,
                w: 0,
                h: 0,
                start_room: String::new(),
                start_spawn: String::new(),
                tset: None,
            });
        }
    }

    fn top_section(&mut self, section: Section, line: usize, head: &str) {
        if self.room.is_some() {
            return self
                .diags
                .structural(line, format!("{head} section inside a ROOM"));
        }
        self.section = section;
    }

    fn room_section(&mut self, section: Section, line: usize, head: &str) {
        if self.room.is_none() {
            return self.diags.structural(line, format!("{head} outside ROOM"));
        }
        self.section = section;
    }

    fn script(&mut self, fields: &Fields<'_>, line: usize, head: &str) {
        if self.room.is_some() {
            return self.diags.structural(line, format!("{head} inside a ROOM"));
        }
        let name = match fields.words.as_slice() {
            [_, name] if source::is_ident(name) && fields.pairs.is_empty() => name.to_string(),
            _ => return self.diags.structural(line, format!("{head} needs exactly one name")),
        };
        let decl = ScriptDecl {
            line,
            name,
            body: Vec::new(),
        };
        if head == "COND" {
            self.out.conds.push(decl);
            self.section = Section::Cond;
        } else {
            self.out.acts.push(decl);
            self.section = Section::Act;
        }
    }

    fn instruction(&mut self, line: SourceLine<'_>) {
        let mut words = line.text.split_whitespace();
        let op = words.next().unwrap_or_default().to_string();
        let args = words.map(str::to_string).collect();
        let instr = InstrLine {
            line: line.number,
            op,
            args,
        };
        let target = if self.section == Section::Cond {
            self.out.conds.last_mut()
        } else {
            self.out.acts.last_mut()
        };
        if let Some(script) = target {
            script.body.push(instr);
        }
    }

    fn message(&mut self, line: SourceLine<'_>) {
        let parsed = line.text.split_once('=').and_then(|(name, text)| {
            let name = name.trim();
            source::is_ident(name).then_some((name, text))
        });
        let Some((name, text)) = parsed else {
            return self
                .diags
                .structural(line.number, format!("message line must be `NAME = \"text\"`, got `{}`", line.text));
        };
        match source::unquote(text).and_then(source::check_text) {
            Ok(text) => self.out.messages.push(MessageDecl {
                line: line.number,
                name: name.to_string(),
                text: text.to_string(),
            }),
            Err(e) => self.diags.structural(line.number, format!("message {name}: {e}")),
        }
    }

    fn room(&mut self, fields: &Fields<'_>, line: usize) {
        if let Some(open) = self.room.take() {
            self.diags.structural(
                line,
                format!("ROOM inside ROOM {} (missing ENDROOM)", open.id),
            );
            self.out.rooms.push(open);
        }
        if matches!(self.section, Section::Cond | Section::Act) {
            self.diags.structural(line, "ROOM inside a script");
        }
        let Some(id) = fields.word(1).filter(|id| source::is_ident(id)) else {
            return self.diags.structural(line, "ROOM needs an id");
        };
        let name = fields.get("name").unwrap_or(id).to_string();
        if let Err(e) = source::check_text(&name) {
            self.diags.structural(line, e.to_string());
        }
        self.room = Some(RoomDecl {
            line,
            id: id.to_string(),
            name,
            ..RoomDecl::default()
        });
        self.section = Section::None;
    }

    fn entry(&mut self, fields: &Fields<'_>, line: SourceLine<'_>) {
        match self.section {
            Section::Tiles => self.tile_binding(fields, line),
            Section::Flags => self.named(fields, line, |out| &mut out.flags),
            Section::Vars => self.named(fields, line, |out| &mut out.vars),
            Section::Items => self.named(fields, line, |out| &mut out.items),
            Section::Spawns => self.spawn(fields, line),
            Section::Exits => self.exit(fields, line),
            Section::Objects => self.object(fields, line),
            _ => self
                .diags
                .structural(line.number, format!("unexpected line `{}`", line.text)),
        }
    }

    fn named(
        &mut self,
        fields: &Fields<'_>,
        line: SourceLine<'_>,
        list: fn(&mut LevelSource) -> &mut Vec<Named>,
    ) {
        match fields.words.as_slice() {
            [name] if fields.pairs.is_empty() && source::is_ident(name) => list(&mut self.out).push(Named {
                line: line.number,
                name: name.to_string(),
            }),
            _ => self
                .diags
                .structural(line.number, format!("expected a single name, got `{}`", line.text)),
        }
    }

    fn tile_binding(&mut self, fields: &Fields<'_>, line: SourceLine<'_>) {
        let [key, value] = fields.words.as_slice() else {
            return self
                .diags
                .structural(line.number, format!("TILES line must be `<char> <tile>`, got `{}`", line.text));
        };
        let mut chars = key.chars();
        let (Some(ch), None) = (chars.next(), chars.next()) else {
            return self
                .diags
                .structural(line.number, format!("TILES key must be a single char: `{key}`"));
        };
        let tile = if value.starts_with(|c: char| c.is_ascii_digit() || c == '$') {
            match source::parse_u8(value) {
                Ok(id) => TileRef::Id(id),
                Err(e) => return self.diags.limit(line.number, e.to_string()),
            }
        } else {
            TileRef::Name(value.to_string())
        };
        self.out.tiles.push(CharBinding {
            line: line.number,
            ch,
            tile,
        });
    }

    fn spawn(&mut self, fields: &Fields<'_>, line: SourceLine<'_>) {
        let parsed = match fields.words.as_slice() {
            [name, pos] if source::is_ident(name) => {
                source::parse_coord(pos).map(|(x, y)| (name.to_string(), x, y))
            }
            _ => Err(source::SourceError::Coord(line.text.to_string())),
        };
        match (parsed, self.room.as_mut()) {
            (Ok((name, x, y)), Some(room)) => room.spawns.push(SpawnDecl {
                line: line.number,
                name,
                x,
                y,
            }),
            (Err(e), _) => self.diags.structural(line.number, format!("spawn: {e}")),
            (_, None) => {}
        }
    }

    fn exit(&mut self, fields: &Fields<'_>, line: SourceLine<'_>) {
        let [edge, dest] = fields.words.as_slice() else {
            return self
                .diags
                .structural(line.number, format!("exit must be `<edge> ROOM:SPAWN`, got `{}`", line.text));
        };
        let Ok(edge) = ExitEdge::from_str(edge) else {
            return self
                .diags
                .structural(line.number, format!("exit edge must be L, R, U or D, got `{edge}`"));
        };
        let (room_name, spawn) = match source::parse_room_spawn(dest) {
            Ok(rs) => rs,
            Err(e) => return self.diags.structural(line.number, e.to_string()),
        };
        if let Some(room) = self.room.as_mut() {
            room.exits.push(ExitDecl {
                line: line.number,
                edge,
                room: room_name.to_string(),
                spawn: spawn.to_string(),
            });
        }
    }

    fn object(&mut self, fields: &Fields<'_>, line: SourceLine<'_>) {
        let n = line.number;
        let [name, "at", pos] = fields.words.as_slice() else {
            return self
                .diags
                .structural(n, format!("object line must be `NAME at x,y key=value...`, got `{}`", line.text));
        };
        let (x, y) = match source::parse_coord(pos) {
            Ok(c) => c,
            Err(e) => return self.diags.structural(n, format!("object {name}: {e}")),
        };
        for key in fields.repeated_keys() {
            self.diags
                .structural(n, format!("object {name}: key `{key}` given more than once"));
        }
        let kind = match fields.get("type") {
            None => return self.diags.structural(n, format!("object {name}: missing type=")),
            Some(t) => match ObjectKind::from_str(t) {
                Ok(k) => k,
                Err(_) => {
                    return self
                        .diags
                        .referential(n, format!("object {name}: unknown object type `{t}`"));
                }
            },
        };
        let verbs = match fields.get("verbs").map(Verbs::parse_list) {
            None => return self.diags.structural(n, format!("object {name}: missing verbs=")),
            Some(Err(e)) => return self.diags.referential(n, format!("object {name}: {e}")),
            Some(Ok(v)) => v,
        };
        let keys = fields
            .pairs
            .iter()
            .filter(|(k, _)| *k != "type" && *k != "verbs")
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        if let Some(room) = self.room.as_mut() {
            room.objects.push(ObjectDecl {
                line: n,
                name: name.to_string(),
                x,
                y,
                kind,
                verbs,
                keys,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> (LevelSource, Diagnostics) {
        let mut d = Diagnostics::new("test.lvl");
        let src = parse_level(text, &mut d);
        (src, d)
    }

    const SMALL: &str = r#"
LEVEL name="Small" w=4 h=2 start=R0:S0
TILES
  . 0
  # WALL
END
FLAGS
  DOOR_OPEN
END
VARS
  BREAKER
END
ITEMS
  FUSE
END
MESSAGES
  HELLO = "Hello; world"
END
COND CAN_OPEN
  FLAGSET DOOR_OPEN
END
ACT OPEN
  MSG HELLO
  TRANSITION R0 S0
END
ROOM R0 name="Start"
  SPAWNS
    S0 1,1
  END
  EXITS
    R R0:S0
  END
  OBJECTS
    O1 at 2,0 type=SIGN verbs=LOOK look=OPEN cond=CAN_OPEN
  END
  MAP
    ####
    #..#
  END
ENDROOM
"#;

    #[test]
    fn parses_all_blocks() {
        let (src, d) = parse(SMALL);
        assert!(d.is_empty(), "{d}");
        let h = src.header.unwrap();
        assert_eq!((h.w, h.h), (4, 2));
        assert_eq!((h.start_room.as_str(), h.start_spawn.as_str()), ("R0", "S0"));
        assert_eq!(src.tiles[0].tile, TileRef::Id(0));
        assert_eq!(src.tiles[1].tile, TileRef::Name("WALL".into()));
        assert_eq!(src.flags[0].name, "DOOR_OPEN");
        assert_eq!(src.messages[0].text, "Hello; world");
        assert_eq!(src.acts[0].body.len(), 2);
        assert_eq!(src.acts[0].body[1].args, vec!["R0", "S0"]);

        let room = &src.rooms[0];
        assert_eq!(room.name, "Start");
        assert_eq!(room.spawns[0], SpawnDecl { line: 28, name: "S0".into(), x: 1, y: 1 });
        assert_eq!(room.exits[0].edge, ExitEdge::Right);
        let obj = &room.objects[0];
        assert_eq!(obj.kind, ObjectKind::Sign);
        assert_eq!(obj.verbs, Verbs::LOOK);
        assert_eq!(obj.keys.len(), 2);
        assert_eq!(room.map.len(), 2);
        assert_eq!(room.map[1].1, "#..#");
    }

    #[test]
    fn missing_header() {
        let (_, d) = parse("FLAGS\nA\nEND\n");
        assert!(d.iter().any(|x| x.msg.contains("expected LEVEL header")));
        assert!(d.iter().any(|x| x.msg.contains("missing LEVEL header")));
    }

    #[test]
    fn bad_edge_and_unknown_type() {
        let src = "LEVEL w=2 h=1 start=R0:S0\nROOM R0\nEXITS\nX R0:S0\nEND\nOBJECTS\n\
                   O1 at 0,0 type=DOOR verbs=LOOK\nO2 at 0,0 type=SIGN verbs=SNIFF\nEND\nENDROOM\n";
        let (_, d) = parse(src);
        let msgs: Vec<_> = d.iter().map(|x| x.msg.clone()).collect();
        assert_eq!(msgs.len(), 3, "{msgs:?}");
        assert!(msgs[0].contains("exit edge"));
        assert!(msgs[1].contains("unknown object type `DOOR`"));
        assert!(msgs[2].contains("SNIFF"));
    }

    #[test]
    fn unclosed_blocks() {
        let (_, d) = parse("LEVEL w=2 h=1 start=R0:S0\nACT A\nMSG X\n");
        assert!(d.iter().any(|x| x.msg.contains("script not closed")));
        let (_, d) = parse("LEVEL w=2 h=1 start=R0:S0\nROOM R0\nMAP\n..\nEND\n");
        assert!(d.iter().any(|x| x.msg.contains("ENDROOM")));
    }

    #[test]
    fn tileset_path_from_header() {
        let text = "; boot\nLEVEL w=1 h=1 start=R0:S0 tset=\"../tiles/boot.tset\"\n";
        assert_eq!(declared_tileset(text).as_deref(), Some("../tiles/boot.tset"));
        assert_eq!(declared_tileset(SMALL), None);
    }

    #[test]
    fn repeated_object_key() {
        let src = "LEVEL w=2 h=1 start=R0:S0\nROOM R0\nOBJECTS\n\
                   O1 at 0,0 type=SIGN verbs=LOOK look=A look=B\nEND\nENDROOM\n";
        let (_, d) = parse(src);
        assert!(d.iter().any(|x| x.msg.contains("`look` given more than once")));
    }
}
