//! Fixed-offset reader over a `TSET` blob and its optional charset.

use lvlkit_types::TileFlags;
use lvlkit_types::format::tset;
use serde::Serialize;

use crate::error::{BlobError, byte, fits, word};

/// One decoded tile record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TileRecord {
    pub id: u8,
    /// Glyph codes: top-left, top-right, bottom-left, bottom-right.
    pub chars: [u8; 4],
    pub color_mode: u8,
    pub colors: [u8; 4],
    pub flags: TileFlags,
}

impl TileRecord {
    /// Blank tile used for unknown ids and missing tilesets.
    pub const DEFAULT: Self = Self {
        id: 0,
        chars: [32; 4],
        color_mode: tset::COLOR_MODE_SINGLE,
        colors: [1; 4],
        flags: TileFlags::empty(),
    };

    /// Color of quadrant `q` (0..4), honoring single-color mode.
    pub fn quadrant_color(&self, q: usize) -> u8 {
        if self.color_mode == tset::COLOR_MODE_SINGLE {
            self.colors[0]
        } else {
            self.colors.get(q).copied().unwrap_or(self.colors[0])
        }
    }
}

/// Reader over a validated tileset, or over nothing at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct TilesetReader<'a> {
    blob: Option<&'a [u8]>,
}

impl<'a> TilesetReader<'a> {
    pub fn new(blob: &'a [u8]) -> Result<Self, BlobError> {
        if blob.len() < tset::HEADER_SIZE {
            return Err(BlobError::TooShort {
                len: blob.len(),
                need: tset::HEADER_SIZE,
            });
        }
        if blob[..4] != tset::MAGIC {
            return Err(BlobError::BadMagic {
                found: [blob[0], blob[1], blob[2], blob[3]],
                expected: "TSET",
            });
        }
        if blob[tset::VERSION_OFS] != tset::VERSION {
            return Err(BlobError::BadVersion {
                found: blob[tset::VERSION_OFS],
                expected: tset::VERSION,
            });
        }
        let record_size = blob[tset::RECORD_SIZE_OFS];
        if (record_size as usize) < tset::RECORD_SIZE {
            return Err(BlobError::RecordSize(record_size));
        }
        let records = word(blob, tset::RECORDS_OFS) as usize;
        let count = blob[tset::TILE_COUNT_OFS] as usize;
        if !fits(blob, records, count * record_size as usize) {
            return Err(BlobError::out_of_bounds(
                "tile records",
                records,
                count * record_size as usize,
                blob.len(),
            ));
        }
        Ok(Self { blob: Some(blob) })
    }

    /// `blob` if valid; otherwise a reader that returns default tiles.
    pub fn or_default(blob: Option<&'a [u8]>) -> Self {
        match blob.map(Self::new) {
            Some(Ok(r)) => r,
            Some(Err(e)) => {
                log::warn!("tileset blob rejected ({e}); using blank tiles");
                Self::default()
            }
            None => Self::default(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.blob.is_some()
    }

    fn header(&self, at: usize) -> u8 {
        self.blob.map_or(0, |b| byte(b, at))
    }

    pub fn tile_w(&self) -> u8 {
        self.header(tset::TILE_W_OFS)
    }

    pub fn tile_h(&self) -> u8 {
        self.header(tset::TILE_H_OFS)
    }

    pub fn tile_count(&self) -> u8 {
        self.header(tset::TILE_COUNT_OFS)
    }

    pub fn bg_color(&self) -> u8 {
        self.header(tset::BG_COLOR_OFS)
    }

    pub fn mc1_color(&self) -> u8 {
        self.header(tset::MC1_COLOR_OFS)
    }

    pub fn mc2_color(&self) -> u8 {
        self.header(tset::MC2_COLOR_OFS)
    }

    /// Record for `id`; ids are record indices. Unknown ids read as
    /// [`TileRecord::DEFAULT`].
    pub fn tile(&self, id: u8) -> TileRecord {
        let Some(blob) = self.blob else {
            return TileRecord::DEFAULT;
        };
        if id >= self.tile_count() {
            return TileRecord::DEFAULT;
        }
        let size = byte(blob, tset::RECORD_SIZE_OFS) as usize;
        let at = word(blob, tset::RECORDS_OFS) as usize + id as usize * size;
        let quad = |base: usize| -> [u8; 4] { std::array::from_fn(|i| byte(blob, at + base + i)) };
        TileRecord {
            id: byte(blob, at + tset::REC_ID_OFS),
            chars: quad(tset::REC_CHARS_OFS),
            color_mode: byte(blob, at + tset::REC_COLOR_MODE_OFS),
            colors: quad(tset::REC_COLORS_OFS),
            flags: TileFlags::from_bits_truncate(word(blob, at + tset::REC_FLAGS_OFS)),
        }
    }
}

/// Companion glyph data: whole 8-byte glyphs, at most 256 of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Charset<'a> {
    bytes: &'a [u8],
}

impl<'a> Charset<'a> {
    /// `None` when the data is empty, ragged or too large.
    pub fn new(bytes: &'a [u8]) -> Option<Self> {
        if tset::charset_len_ok(bytes.len()) {
            Some(Self { bytes })
        } else {
            log::warn!("charset of {} bytes ignored", bytes.len());
            None
        }
    }

    pub fn glyph_count(&self) -> usize {
        self.bytes.len() / tset::GLYPH_SIZE
    }

    pub fn glyph(&self, code: u8) -> Option<&'a [u8]> {
        let at = code as usize * tset::GLYPH_SIZE;
        self.bytes.get(at..at + tset::GLYPH_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob() -> Vec<u8> {
        let mut b = b"TSET".to_vec();
        b.extend_from_slice(&[1, 2, 2, 2, 12, 17, 0, 0, 0, 0, 12, 15, 0]);
        // tile 0: single colour
        b.extend_from_slice(&[0, 1, 2, 3, 4, 0, 5, 0, 0, 0, 0x41, 0]);
        // tile 1: per quadrant
        b.extend_from_slice(&[1, 9, 9, 9, 9, 1, 2, 3, 4, 5, 0x01, 0]);
        b
    }

    #[test]
    fn reads_records() {
        let data = blob();
        let r = TilesetReader::new(&data).unwrap();
        assert_eq!(r.tile_count(), 2);
        assert_eq!((r.bg_color(), r.mc1_color(), r.mc2_color()), (0, 12, 15));
        let t0 = r.tile(0);
        assert_eq!(t0.chars, [1, 2, 3, 4]);
        assert_eq!(t0.flags, TileFlags::SOLID | TileFlags::FLOOR);
        assert_eq!(t0.quadrant_color(3), 5);
        let t1 = r.tile(1);
        assert_eq!(t1.id, 1);
        assert_eq!(t1.quadrant_color(2), 4);
    }

    #[test]
    fn unknown_id_and_missing_tileset() {
        let data = blob();
        let r = TilesetReader::new(&data).unwrap();
        assert_eq!(r.tile(2), TileRecord::DEFAULT);

        let none = TilesetReader::or_default(None);
        assert!(!none.is_loaded());
        assert_eq!(none.tile(0), TileRecord::DEFAULT);
        assert_eq!(none.bg_color(), 0);
    }

    #[test]
    fn rejects_damaged_blobs() {
        let mut data = blob();
        data[tset::RECORD_SIZE_OFS] = 8;
        assert_eq!(TilesetReader::new(&data).unwrap_err(), BlobError::RecordSize(8));

        let mut data = blob();
        data[tset::TILE_COUNT_OFS] = 3;
        assert!(matches!(
            TilesetReader::new(&data),
            Err(BlobError::OutOfBounds { .. })
        ));
        assert!(!TilesetReader::or_default(Some(&data)).is_loaded());
    }

    #[test]
    fn charset_validation() {
        assert!(Charset::new(&[]).is_none());
        assert!(Charset::new(&[0; 12]).is_none());
        assert!(Charset::new(&[0; 2056]).is_none());
        let bytes: Vec<u8> = (0..16).collect();
        let cs = Charset::new(&bytes).unwrap();
        assert_eq!(cs.glyph_count(), 2);
        assert_eq!(cs.glyph(1), Some(&bytes[8..16]));
        assert_eq!(cs.glyph(2), None);
    }
}
