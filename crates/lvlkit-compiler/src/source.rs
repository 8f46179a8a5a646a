//! Line-level reading shared by the tileset and level source formats.
//!
//! Both formats are line-oriented: `;` starts a comment (outside quotes),
//! blank lines are ignored, and most lines are a run of bare words and
//! `key=value` pairs. The small grammars for pairs, numbers, coordinates and
//! sizes are written with `winnow`.

use winnow::Parser;
use winnow::ascii::{digit1, hex_digit1, space0};
use winnow::combinator::{alt, delimited, preceded, repeat, separated_pair, terminated};
use winnow::error::ModalResult;
use winnow::token::{one_of, take_till, take_while};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    #[error("malformed line: {0}")]
    Fields(String),
    #[error("invalid number `{0}`")]
    Number(String),
    #[error("value {value} out of range {min}..={max}")]
    Range { value: u32, min: u32, max: u32 },
    #[error("expected `x,y`, got `{0}`")]
    Coord(String),
    #[error("expected `WxH`, got `{0}`")]
    Size(String),
    #[error("expected `ROOM:SPAWN`, got `{0}`")]
    RoomSpawn(String),
    #[error("expected a quoted string, got `{0}`")]
    Quoted(String),
    #[error("string must be ASCII without NUL: {0:?}")]
    Text(String),
}

/// A non-blank source line with its comment removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLine<'a> {
    /// 1-based.
    pub number: usize,
    pub text: &'a str,
}

/// Iterate the meaningful lines of a source file.
pub fn source_lines(input: &str) -> impl Iterator<Item = SourceLine<'_>> {
    input.lines().enumerate().filter_map(|(idx, raw)| {
        let text = strip_comment(raw).trim();
        (!text.is_empty()).then_some(SourceLine {
            number: idx + 1,
            text,
        })
    })
}

/// Cut a line at the first `;` that is not inside double quotes.
pub fn strip_comment(line: &str) -> &str {
    let mut in_quote = false;
    for (pos, c) in line.char_indices() {
        match c {
            '"' => in_quote = !in_quote,
            ';' if !in_quote => return &line[..pos],
            _ => {}
        }
    }
    line
}

/// Words and `key=value` pairs of one line, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields<'a> {
    pub words: Vec<&'a str>,
    pub pairs: Vec<(&'a str, &'a str)>,
}

impl<'a> Fields<'a> {
    pub fn get(&self, key: &str) -> Option<&'a str> {
        self.pairs.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
    }

    pub fn word(&self, idx: usize) -> Option<&'a str> {
        self.words.get(idx).copied()
    }

    /// Keys given more than once.
    pub fn repeated_keys(&self) -> Vec<&'a str> {
        let mut out = Vec::new();
        for (i, (k, _)) in self.pairs.iter().enumerate() {
            if self.pairs[..i].iter().any(|(prev, _)| prev == k) && !out.contains(k) {
                out.push(*k);
            }
        }
        out
    }
}

enum Field<'a> {
    Word(&'a str),
    Pair(&'a str, &'a str),
}

fn ident<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '_').parse_next(input)
}

fn quoted<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    delimited('"', take_till(0.., '"'), '"').parse_next(input)
}

fn bare<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    take_till(1.., |c: char| c.is_ascii_whitespace() || c == '"').parse_next(input)
}

fn field<'s>(input: &mut &'s str) -> ModalResult<Field<'s>> {
    alt((
        separated_pair(ident, '=', alt((quoted, bare))).map(|(k, v)| Field::Pair(k, v)),
        quoted.map(Field::Word),
        bare.map(Field::Word),
    ))
    .parse_next(input)
}

fn field_list<'s>(input: &mut &'s str) -> ModalResult<Vec<Field<'s>>> {
    terminated(repeat(0.., preceded(space0, field)), space0).parse_next(input)
}

/// Split a line into bare words and `key=value` pairs.
pub fn split_fields(line: &str) -> Result<Fields<'_>, SourceError> {
    let list = field_list
        .parse(line)
        .map_err(|_| SourceError::Fields(line.to_string()))?;
    let mut fields = Fields::default();
    for f in list {
        match f {
            Field::Word(w) => fields.words.push(w),
            Field::Pair(k, v) => fields.pairs.push((k, v)),
        }
    }
    Ok(fields)
}

fn number(input: &mut &str) -> ModalResult<u32> {
    alt((
        preceded(alt(("0x", "0X", "$")), hex_digit1).try_map(|h| u32::from_str_radix(h, 16)),
        preceded(alt(("0b", "0B")), take_while(1.., ['0', '1']))
            .try_map(|b| u32::from_str_radix(b, 2)),
        digit1.try_map(|d: &str| d.parse::<u32>()),
    ))
    .parse_next(input)
}

/// Parse a decimal, `0x`/`$` hex or `0b` binary literal.
pub fn parse_num(text: &str) -> Result<u32, SourceError> {
    number
        .parse(text.trim())
        .map_err(|_| SourceError::Number(text.to_string()))
}

pub fn parse_in_range(text: &str, min: u32, max: u32) -> Result<u32, SourceError> {
    let value = parse_num(text)?;
    if value < min || value > max {
        return Err(SourceError::Range { value, min, max });
    }
    Ok(value)
}

pub fn parse_u8(text: &str) -> Result<u8, SourceError> {
    parse_in_range(text, 0, u8::MAX as u32).map(|v| v as u8)
}

/// Parse `x,y`.
pub fn parse_coord(text: &str) -> Result<(u8, u8), SourceError> {
    let (x, y) = separated_pair(number, ',', number)
        .parse(text)
        .map_err(|_| SourceError::Coord(text.to_string()))?;
    match (u8::try_from(x), u8::try_from(y)) {
        (Ok(x), Ok(y)) => Ok((x, y)),
        _ => Err(SourceError::Coord(text.to_string())),
    }
}

/// Parse `WxH`.
pub fn parse_size(text: &str) -> Result<(u8, u8), SourceError> {
    let (w, h) = separated_pair(number, one_of(['x', 'X']), number)
        .parse(text)
        .map_err(|_| SourceError::Size(text.to_string()))?;
    match (u8::try_from(w), u8::try_from(h)) {
        (Ok(w), Ok(h)) if w > 0 && h > 0 => Ok((w, h)),
        _ => Err(SourceError::Size(text.to_string())),
    }
}

/// Parse `ROOM:SPAWN` into its two names.
pub fn parse_room_spawn(text: &str) -> Result<(&str, &str), SourceError> {
    separated_pair(ident, ':', ident)
        .parse(text)
        .map_err(|_| SourceError::RoomSpawn(text.to_string()))
}

/// Strip surrounding double quotes.
pub fn unquote(text: &str) -> Result<&str, SourceError> {
    quoted
        .parse(text.trim())
        .map_err(|_| SourceError::Quoted(text.to_string()))
}

/// Message and name text must be storable as a NUL-terminated ASCII string.
pub fn check_text(text: &str) -> Result<&str, SourceError> {
    if text.is_ascii() && !text.contains('\0') {
        Ok(text)
    } else {
        Err(SourceError::Text(text.to_string()))
    }
}

/// Whether `text` is a valid symbol name.
pub fn is_ident(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comments_and_blank_lines() {
        let src = "; header\nLEVEL w=2 ; trailing\n\n   \nMSG = \"a;b\" ; c\n";
        let lines: Vec<_> = source_lines(src).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].number, 2);
        assert_eq!(lines[0].text, "LEVEL w=2");
        assert_eq!(lines[1].number, 5);
        assert_eq!(lines[1].text, "MSG = \"a;b\"");
    }

    #[test]
    fn fields_mixed() {
        let f = split_fields("O1 at 3,4 type=SIGN verbs=LOOK|USE name=\"Big Sign\"").unwrap();
        assert_eq!(f.words, vec!["O1", "at", "3,4"]);
        assert_eq!(f.get("type"), Some("SIGN"));
        assert_eq!(f.get("verbs"), Some("LOOK|USE"));
        assert_eq!(f.get("name"), Some("Big Sign"));
        assert_eq!(f.get("look"), None);
    }

    #[test]
    fn fields_repeated_key() {
        let f = split_fields("O1 look=A look=B use=C").unwrap();
        assert_eq!(f.repeated_keys(), vec!["look"]);
    }

    #[test]
    fn fields_unterminated_quote() {
        assert!(split_fields("ROOM R0 name=\"oops").is_err());
    }

    #[test]
    fn numbers() {
        assert_eq!(parse_num("42").unwrap(), 42);
        assert_eq!(parse_num("0x1F").unwrap(), 31);
        assert_eq!(parse_num("$ff").unwrap(), 255);
        assert_eq!(parse_num("0b101").unwrap(), 5);
        assert_eq!(parse_num("0").unwrap(), 0);
        assert!(parse_num("12a").is_err());
        assert!(parse_num("").is_err());
        assert!(parse_u8("256").is_err());
        assert_eq!(
            parse_in_range("8", 0, 7),
            Err(SourceError::Range {
                value: 8,
                min: 0,
                max: 7
            })
        );
    }

    #[test]
    fn coords_and_sizes() {
        assert_eq!(parse_coord("3,14").unwrap(), (3, 14));
        assert!(parse_coord("3;4").is_err());
        assert!(parse_coord("300,1").is_err());
        assert_eq!(parse_size("2x2").unwrap(), (2, 2));
        assert_eq!(parse_size("1X2").unwrap(), (1, 2));
        assert!(parse_size("0x2").is_err());
        assert!(parse_size("2by2").is_err());
    }

    #[test]
    fn room_spawn_and_quotes() {
        assert_eq!(parse_room_spawn("R1:S0").unwrap(), ("R1", "S0"));
        assert!(parse_room_spawn("R1").is_err());
        assert_eq!(unquote("\"hello there\"").unwrap(), "hello there");
        assert!(unquote("hello").is_err());
        assert!(check_text("caf\u{e9}").is_err());
    }
}
