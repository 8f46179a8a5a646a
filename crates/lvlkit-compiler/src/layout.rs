//! Shared layout machinery: dense symbol ids, bytecode streams, and a byte
//! writer that reserves offset fields and patches them once the target is
//! known.

use std::collections::HashMap;

use lvlkit_types::format::{INSTRUCTION_SIZE, MAX_BLOB_SIZE};
use lvlkit_types::{BlobOffset, StreamOffset};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("duplicate {kind} `{name}`")]
    Duplicate { kind: &'static str, name: String },
    #[error("too many {kind}s: at most {limit}")]
    Full { kind: &'static str, limit: usize },
    #[error("{what} needs {size} bytes, more than the {max} a 16-bit offset can address")]
    TooLarge {
        what: &'static str,
        size: usize,
        max: usize,
    },
}

/// Names of one namespace mapped to dense ids in declaration order.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    kind: &'static str,
    limit: usize,
    ids: HashMap<String, u8>,
    names: Vec<String>,
}

impl SymbolTable {
    pub fn new(kind: &'static str, limit: usize) -> Self {
        Self {
            kind,
            limit: limit.min(u8::MAX as usize),
            ids: HashMap::new(),
            names: Vec::new(),
        }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn declare(&mut self, name: &str) -> Result<u8, LayoutError> {
        if self.ids.contains_key(name) {
            return Err(LayoutError::Duplicate {
                kind: self.kind,
                name: name.to_string(),
            });
        }
        if self.names.len() >= self.limit {
            return Err(LayoutError::Full {
                kind: self.kind,
                limit: self.limit,
            });
        }
        let id = self.names.len() as u8;
        self.ids.insert(name.to_string(), id);
        self.names.push(name.to_string());
        Ok(id)
    }

    pub fn id(&self, name: &str) -> Option<u8> {
        self.ids.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Declared names; the index is the id.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Count as stored in a u8 header field. `declare` keeps it in range.
    pub fn count(&self) -> u8 {
        self.names.len() as u8
    }
}

/// A condition or action stream being built.
///
/// The stream starts with one `END` instruction so that offset 0 is never a
/// real script: 0 stays free as the "no script" sentinel.
#[derive(Debug, Clone)]
pub struct ScriptStream {
    kind: &'static str,
    bytes: Vec<u8>,
    offsets: HashMap<String, StreamOffset>,
    order: Vec<(String, StreamOffset)>,
}

impl ScriptStream {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            bytes: vec![0; INSTRUCTION_SIZE],
            offsets: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Record `name` as starting at the current end of the stream.
    pub fn begin(&mut self, name: &str) -> Result<StreamOffset, LayoutError> {
        if self.offsets.contains_key(name) {
            return Err(LayoutError::Duplicate {
                kind: self.kind,
                name: name.to_string(),
            });
        }
        let offset = u16::try_from(self.bytes.len())
            .map(StreamOffset)
            .map_err(|_| LayoutError::TooLarge {
                what: self.kind,
                size: self.bytes.len(),
                max: MAX_BLOB_SIZE,
            })?;
        self.offsets.insert(name.to_string(), offset);
        self.order.push((name.to_string(), offset));
        Ok(offset)
    }

    pub fn emit(&mut self, op: u8, a: u8, b: u8) {
        self.bytes.extend_from_slice(&[op, a, b]);
    }

    /// Terminate the current script.
    pub fn end(&mut self) {
        self.emit(0, 0, 0);
    }

    pub fn offset(&self, name: &str) -> Option<StreamOffset> {
        self.offsets.get(name).copied()
    }

    /// Scripts in the order they were laid out.
    pub fn scripts(&self) -> &[(String, StreamOffset)] {
        &self.order
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Position of a reserved u16 field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot(usize);

/// Little-endian byte writer for one blob.
#[derive(Debug, Clone, Default)]
pub struct BlobWriter {
    buf: Vec<u8>,
}

impl BlobWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Offset of the next byte. Saturates; `finish` rejects oversize blobs.
    pub fn here(&self) -> BlobOffset {
        BlobOffset(u16::try_from(self.buf.len()).unwrap_or(u16::MAX))
    }

    pub fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn bytes(&mut self, b: &[u8]) {
        self.buf.extend_from_slice(b);
    }

    /// Zero-filled u16 to be patched later.
    pub fn reserve_u16(&mut self) -> Slot {
        let at = self.buf.len();
        self.u16(0);
        Slot(at)
    }

    /// Zero-filled area of `n` bytes; returns its first position.
    pub fn reserve(&mut self, n: usize) -> usize {
        let at = self.buf.len();
        self.buf.resize(at + n, 0);
        at
    }

    pub fn patch(&mut self, slot: Slot, v: u16) {
        self.buf[slot.0..slot.0 + 2].copy_from_slice(&v.to_le_bytes());
    }

    pub fn patch_at(&mut self, at: usize, v: u16) {
        self.patch(Slot(at), v);
    }

    pub fn set_u8(&mut self, at: usize, v: u8) {
        self.buf[at] = v;
    }

    pub fn finish(self, what: &'static str) -> Result<Vec<u8>, LayoutError> {
        if self.buf.len() > MAX_BLOB_SIZE {
            return Err(LayoutError::TooLarge {
                what,
                size: self.buf.len(),
                max: MAX_BLOB_SIZE,
            });
        }
        Ok(self.buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dense_ids_in_order() {
        let mut t = SymbolTable::new("flag", 255);
        assert_eq!(t.declare("DOOR_OPEN").unwrap(), 0);
        assert_eq!(t.declare("POWER_ON").unwrap(), 1);
        assert_eq!(t.id("POWER_ON"), Some(1));
        assert_eq!(t.id("power_on"), None);
        assert_eq!(t.count(), 2);
        assert_eq!(
            t.declare("DOOR_OPEN"),
            Err(LayoutError::Duplicate {
                kind: "flag",
                name: "DOOR_OPEN".into()
            })
        );
    }

    #[test]
    fn limit() {
        let mut t = SymbolTable::new("var", 2);
        t.declare("A").unwrap();
        t.declare("B").unwrap();
        assert_eq!(
            t.declare("C"),
            Err(LayoutError::Full {
                kind: "var",
                limit: 2
            })
        );
    }

    #[test]
    fn stream_reserves_offset_zero() {
        let mut s = ScriptStream::new("action");
        let first = s.begin("OPEN").unwrap();
        s.emit(2, 0, 0);
        s.end();
        let second = s.begin("CLOSE").unwrap();
        s.end();
        assert_eq!(first, StreamOffset(3));
        assert_eq!(second, StreamOffset(9));
        assert_eq!(&s.bytes()[..3], &[0, 0, 0]);
        assert_eq!(s.offset("CLOSE"), Some(StreamOffset(9)));
        assert!(s.begin("OPEN").is_err());
    }

    #[test]
    fn writer_patch() {
        let mut w = BlobWriter::new();
        w.u8(1);
        let slot = w.reserve_u16();
        w.bytes(b"xy");
        let target = w.here();
        w.patch(slot, target.0);
        let blob = w.finish("test").unwrap();
        assert_eq!(blob, vec![1, 5, 0, b'x', b'y']);
    }

    #[test]
    fn writer_too_large() {
        let mut w = BlobWriter::new();
        w.reserve(MAX_BLOB_SIZE + 1);
        assert_eq!(w.here(), BlobOffset(u16::MAX));
        assert!(matches!(
            w.finish("level"),
            Err(LayoutError::TooLarge { .. })
        ));
    }
}
