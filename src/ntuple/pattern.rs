use crate::engine::{Board, MAX_EXPONENT};

use super::NetworkError;

/// Longest supported tuple; a 6-tuple table already holds 16M weights.
pub const MAX_PATTERN_LEN: usize = 6;

/// The four non-overlapping 2x2 corner blocks.
pub const QUADRANTS: [[usize; 4]; 4] = [
    [0, 1, 4, 5],
    [2, 3, 6, 7],
    [8, 9, 12, 13],
    [10, 11, 14, 15],
];

/// An ordered list of board positions forming one feature dimension.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pattern {
    cells: Vec<usize>,
}

impl Pattern {
    pub fn new(cells: &[usize]) -> Result<Self, NetworkError> {
        if cells.is_empty() || cells.len() > MAX_PATTERN_LEN {
            return Err(NetworkError::PatternLength(cells.len()));
        }
        for (i, &pos) in cells.iter().enumerate() {
            if pos >= 16 {
                return Err(NetworkError::PatternPosition(pos));
            }
            if cells[..i].contains(&pos) {
                return Err(NetworkError::PatternDuplicate(pos));
            }
        }
        Ok(Self { cells: cells.to_vec() })
    }

    pub fn quadrants() -> Vec<Pattern> {
        QUADRANTS.iter().map(|cells| Pattern { cells: cells.to_vec() }).collect()
    }

    #[inline]
    pub fn cells(&self) -> &[usize] { &self.cells }

    #[inline]
    pub fn len(&self) -> usize { self.cells.len() }

    #[inline]
    pub fn is_empty(&self) -> bool { self.cells.is_empty() }

    /// Size of the weight table this pattern indexes: `16^len`.
    #[inline]
    pub fn table_size(&self) -> usize { 1 << (4 * self.cells.len()) }

    /// Feature index `sum_i min(e_i, 15) * 16^i` over the pattern's cells.
    ///
    /// The clamp keeps the index below [`Self::table_size`] no matter what
    /// the board holds.
    #[inline]
    pub fn index(&self, board: Board) -> usize {
        self.cells.iter().enumerate().fold(0, |index, (i, &pos)| {
            let e = board.exponent(pos).min(MAX_EXPONENT) as usize;
            index | (e << (4 * i))
        })
    }
}
