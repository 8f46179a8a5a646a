//! Expansion of multi-tile stamps in room maps.
//!
//! A map char bound to a `w`x`h` stamp must appear as solid `w`x`h` blocks.
//! Blocks are claimed scanning row-major; each block is replaced by the
//! stamp's tile ids in row-major order.

use std::collections::BTreeMap;

use serde::Serialize;

/// A named rectangular tile arrangement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stamp {
    pub name: String,
    pub w: u8,
    pub h: u8,
    /// Row-major tile ids, `w * h` of them.
    pub tiles: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StampError {
    #[error("stamp `{ch}` at {x},{y} runs past the map edge")]
    OutOfBounds { ch: char, x: usize, y: usize },
    #[error("stamp `{ch}` at {x},{y} is not a solid {w}x{h} block")]
    Incomplete {
        ch: char,
        x: usize,
        y: usize,
        w: u8,
        h: u8,
    },
    #[error("stamp `{ch}` at {x},{y} overlaps another stamp")]
    Overlap { ch: char, x: usize, y: usize },
}

impl StampError {
    /// Map row the error is reported against.
    pub fn row(&self) -> usize {
        match self {
            Self::OutOfBounds { y, .. } | Self::Incomplete { y, .. } | Self::Overlap { y, .. } => *y,
        }
    }
}

/// Resolve stamp cells of `grid` in place of the `None`s in the result.
///
/// Cells whose char is not a stamp char stay `None` for the caller to map.
pub fn expand_stamps(
    grid: &[Vec<char>],
    stamps: &BTreeMap<char, Stamp>,
) -> (Vec<Vec<Option<u8>>>, Vec<StampError>) {
    let height = grid.len();
    let width = grid.first().map_or(0, Vec::len);
    let mut out = vec![vec![None; width]; height];
    let mut claimed = vec![vec![false; width]; height];
    let mut errors = Vec::new();

    for y in 0..height {
        for x in 0..width {
            if claimed[y][x] {
                continue;
            }
            let ch = grid[y][x];
            let Some(stamp) = stamps.get(&ch) else {
                continue;
            };
            let (w, h) = (stamp.w as usize, stamp.h as usize);
            if x + w > width || y + h > height {
                errors.push(StampError::OutOfBounds { ch, x, y });
                claimed[y][x] = true;
                continue;
            }

            let solid = (0..h).all(|dy| (0..w).all(|dx| grid[y + dy][x + dx] == ch));
            if !solid {
                errors.push(StampError::Incomplete {
                    ch,
                    x,
                    y,
                    w: stamp.w,
                    h: stamp.h,
                });
            }
            for dy in 0..h {
                for dx in 0..w {
                    let (tx, ty) = (x + dx, y + dy);
                    if grid[ty][tx] != ch {
                        continue;
                    }
                    if claimed[ty][tx] {
                        errors.push(StampError::Overlap { ch, x: tx, y: ty });
                        continue;
                    }
                    claimed[ty][tx] = true;
                    out[ty][tx] = Some(stamp.tiles[dy * w + dx]);
                }
            }
        }
    }
    (out, errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&str]) -> Vec<Vec<char>> {
        rows.iter().map(|r| r.chars().collect()).collect()
    }

    fn stamps() -> BTreeMap<char, Stamp> {
        let mut m = BTreeMap::new();
        m.insert(
            'O',
            Stamp {
                name: "CONSOLE".into(),
                w: 2,
                h: 2,
                tiles: vec![10, 11, 12, 13],
            },
        );
        m.insert(
            'P',
            Stamp {
                name: "PIPE".into(),
                w: 1,
                h: 2,
                tiles: vec![20, 21],
            },
        );
        m
    }

    #[test]
    fn expands_2x2_row_major() {
        let (out, errors) = expand_stamps(&grid(&["..OO", "..OO", "...."]), &stamps());
        assert!(errors.is_empty());
        assert_eq!(out[0], vec![None, None, Some(10), Some(11)]);
        assert_eq!(out[1], vec![None, None, Some(12), Some(13)]);
        assert_eq!(out[2], vec![None; 4]);
    }

    #[test]
    fn adjacent_blocks() {
        let (out, errors) = expand_stamps(&grid(&["OOOO", "OOOO"]), &stamps());
        assert!(errors.is_empty());
        assert_eq!(out[0], vec![Some(10), Some(11), Some(10), Some(11)]);
        assert_eq!(out[1], vec![Some(12), Some(13), Some(12), Some(13)]);
    }

    #[test]
    fn incomplete_block() {
        let (_, errors) = expand_stamps(&grid(&[".OO.", ".O.."]), &stamps());
        assert_eq!(
            errors,
            vec![StampError::Incomplete {
                ch: 'O',
                x: 1,
                y: 0,
                w: 2,
                h: 2
            }]
        );
    }

    #[test]
    fn out_of_bounds() {
        let (_, errors) = expand_stamps(&grid(&["...P"]), &stamps());
        assert_eq!(errors, vec![StampError::OutOfBounds { ch: 'P', x: 3, y: 0 }]);
        assert_eq!(errors[0].row(), 0);
    }

    #[test]
    fn misaligned_blocks_overlap() {
        // The second row starts a block whose right half was already claimed.
        let (_, errors) = expand_stamps(&grid(&[".OO", "OOO", "OO."]), &stamps());
        assert!(errors.iter().any(|e| matches!(e, StampError::Overlap { .. })));
    }

    #[test]
    fn tall_stamp() {
        let (out, errors) = expand_stamps(&grid(&["P.", "P."]), &stamps());
        assert!(errors.is_empty());
        assert_eq!(out[0][0], Some(20));
        assert_eq!(out[1][0], Some(21));
    }
}
