use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// A direction to slide tiles.
///
/// Discriminants are the opcodes used on the wire, and the declaration order
/// is the canonical scan order used by every policy in this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Move {
    Up = 0,
    Right = 1,
    Down = 2,
    Left = 3,
}

impl Move {
    /// All directions in canonical scan order.
    pub const ALL: [Move; 4] = [Move::Up, Move::Right, Move::Down, Move::Left];

    #[inline]
    pub fn opcode(self) -> u8 { self as u8 }

    /// Decode an opcode; only the low two bits are significant.
    #[inline]
    pub fn from_opcode(opcode: u8) -> Self {
        match opcode & 0b11 {
            0 => Move::Up,
            1 => Move::Right,
            2 => Move::Down,
            _ => Move::Left,
        }
    }
}

/// Score gained by a legal move. Illegal moves report `None` instead.
pub type Reward = u32;

/// Largest exponent a cell can hold (tile 32768).
pub const MAX_EXPONENT: u8 = 15;

const LINE_TABLE_SIZE: usize = 0x1_0000; // 65,536 possible 16-bit lines

struct Stores {
    slide_left: Box<[Line]>,
    slide_right: Box<[Line]>,
    reward_left: Box<[Reward]>,
    reward_right: Box<[Reward]>,
}

type BoardRaw = u64;
type Line = u16;

/// Packed 4x4 board as 16 4-bit exponents in a `u64`.
///
/// Cells are indexed row-major:
///
/// ```text
///  0  1  2  3
///  4  5  6  7
///  8  9 10 11
/// 12 13 14 15
/// ```
///
/// Cell 0 lives in the most significant nibble. A nibble cannot hold more
/// than 15, so every board satisfies `exponent(i) <= MAX_EXPONENT`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Board(BoardRaw);

impl Board {
    /// A constant empty board (all zeros).
    pub const EMPTY: Board = Board(0);

    /// Construct a `Board` from its raw packed representation.
    #[inline]
    pub const fn from_raw(raw: BoardRaw) -> Self { Board(raw) }

    /// Consume this `Board`, returning the raw packed `u64`.
    #[inline]
    pub fn into_raw(self) -> BoardRaw { self.0 }

    /// Borrow the raw packed `u64` for this `Board`.
    #[inline]
    pub fn raw(&self) -> BoardRaw { self.0 }

    /// Build a board from row-major exponents.
    ///
    /// Returns `None` if any exponent exceeds [`MAX_EXPONENT`].
    ///
    /// ```
    /// use td_2048::engine::Board;
    /// let b = Board::from_exponents([1, 1, 2, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]).unwrap();
    /// assert_eq!(b.exponent(2), 2);
    /// assert!(Board::from_exponents([16; 16]).is_none());
    /// ```
    pub fn from_exponents(cells: [u8; 16]) -> Option<Self> {
        cells
            .iter()
            .enumerate()
            .try_fold(0, |raw: BoardRaw, (idx, &e)| {
                (e <= MAX_EXPONENT).then(|| raw | (BoardRaw::from(e) << cell_shift(idx)))
            })
            .map(Board)
    }

    /// Exponent stored at `idx` (row-major, `0..16`).
    #[inline]
    pub fn exponent(self, idx: usize) -> u8 { ((self.0 >> cell_shift(idx)) & 0xf) as u8 }

    /// All sixteen exponents in row-major order.
    pub fn exponents(self) -> [u8; 16] { std::array::from_fn(|idx| self.exponent(idx)) }

    #[inline]
    fn with_exponent(self, idx: usize, e: u8) -> Self {
        let shift = cell_shift(idx);
        Board((self.0 & !(0xf << shift)) | (BoardRaw::from(e & 0xf) << shift))
    }

    /// Put a tile of exponent `tile` on the empty cell `pos`.
    ///
    /// Returns `Some(0)` on success, or `None` (board untouched) when `pos`
    /// is off the board or occupied, or `tile` is not 1 or 2.
    ///
    /// ```
    /// use td_2048::engine::Board;
    /// let mut b = Board::EMPTY;
    /// assert_eq!(b.place(5, 1), Some(0));
    /// assert_eq!(b.place(5, 2), None);
    /// assert_eq!(b.place(6, 3), None);
    /// ```
    pub fn place(&mut self, pos: usize, tile: u8) -> Option<Reward> {
        if pos >= 16 || self.exponent(pos) != 0 || !matches!(tile, 1 | 2) {
            return None;
        }
        *self = self.with_exponent(pos, tile);
        Some(0)
    }

    /// Slide and merge in `dir`, returning the merge score.
    ///
    /// `None` means the move is illegal: the board would stay bit-for-bit
    /// identical, and it is left untouched.
    ///
    /// ```
    /// use td_2048::engine::{Board, Move};
    /// let mut b = Board::from_raw(0x1120_0000_0000_0000);
    /// assert_eq!(b.slide(Move::Left), Some(4));
    /// assert_eq!(b, Board::from_raw(0x2200_0000_0000_0000));
    /// let mut empty = Board::EMPTY;
    /// assert_eq!(empty.slide(Move::Up), None);
    /// ```
    #[inline]
    pub fn slide(&mut self, dir: Move) -> Option<Reward> {
        match dir {
            Move::Up => self.slide_up(),
            Move::Right => self.slide_right(),
            Move::Down => self.slide_down(),
            Move::Left => self.slide_left(),
        }
    }

    pub fn slide_left(&mut self) -> Option<Reward> {
        let s = stores();
        self.slide_rows(&s.slide_left, &s.reward_left)
    }

    pub fn slide_right(&mut self) -> Option<Reward> {
        let s = stores();
        self.slide_rows(&s.slide_right, &s.reward_right)
    }

    /// Rotate clockwise, slide right, rotate back.
    pub fn slide_up(&mut self) -> Option<Reward> {
        let mut rotated = self.rotate_clockwise();
        let reward = rotated.slide_right()?;
        *self = rotated.rotate_counterclockwise();
        Some(reward)
    }

    /// Rotate clockwise, slide left, rotate back.
    pub fn slide_down(&mut self) -> Option<Reward> {
        let mut rotated = self.rotate_clockwise();
        let reward = rotated.slide_left()?;
        *self = rotated.rotate_counterclockwise();
        Some(reward)
    }

    fn slide_rows(&mut self, rows: &[Line], rewards: &[Reward]) -> Option<Reward> {
        let (raw, reward) = (0..4).fold((0, 0), |(raw, reward), row_idx| {
            let line = extract_line(self.0, row_idx);
            let moved = BoardRaw::from(get_line_entry(rows, line));
            (raw | (moved << line_shift(row_idx)), reward + get_line_entry(rewards, line))
        });
        if raw == self.0 {
            return None;
        }
        self.0 = raw;
        Some(reward)
    }

    /// Mirror across the main diagonal.
    #[inline]
    pub fn transpose(self) -> Self { Board(transpose(self.0)) }

    /// Mirror left-right (reverse every row).
    #[inline]
    pub fn reflect_horizontal(self) -> Self {
        let x = self.0;
        let x = ((x & 0xF0F0_F0F0_F0F0_F0F0) >> 4) | ((x & 0x0F0F_0F0F_0F0F_0F0F) << 4);
        Board(((x & 0xFF00_FF00_FF00_FF00) >> 8) | ((x & 0x00FF_00FF_00FF_00FF) << 8))
    }

    /// Mirror top-bottom (reverse the row order).
    #[inline]
    pub fn reflect_vertical(self) -> Self {
        let x = self.0;
        let x = ((x & 0xFFFF_0000_FFFF_0000) >> 16) | ((x & 0x0000_FFFF_0000_FFFF) << 16);
        Board(x.rotate_left(32))
    }

    #[inline]
    pub fn rotate_clockwise(self) -> Self { self.transpose().reflect_horizontal() }

    #[inline]
    pub fn rotate_counterclockwise(self) -> Self { self.transpose().reflect_vertical() }

    /// Rotate by 180 degrees.
    #[inline]
    pub fn reverse(self) -> Self { self.reflect_horizontal().reflect_vertical() }

    /// Rotate by `clockwise_count` quarter turns; negative counts turn counterclockwise.
    pub fn rotate(self, clockwise_count: i32) -> Self {
        match clockwise_count.rem_euclid(4) {
            1 => self.rotate_clockwise(),
            2 => self.reverse(),
            3 => self.rotate_counterclockwise(),
            _ => self,
        }
    }

    /// Count the number of empty cells on the board.
    #[inline]
    pub fn count_empty(self) -> u32 { 16 - count_non_empty(self) }

    /// Count the cells holding exactly exponent `e`.
    pub fn count_exponent(self, e: u8) -> usize { (0..16).filter(|&idx| self.exponent(idx) == e).count() }

    pub fn max_exponent(self) -> u8 { (0..16).map(|idx| self.exponent(idx)).max().unwrap_or(0) }

    /// Return the highest tile value (e.g., 2048) present on the board, 0 when empty.
    pub fn highest_tile(self) -> u32 {
        match self.max_exponent() {
            0 => 0,
            e => 1 << e,
        }
    }

    /// Directions that change the board, in canonical order.
    pub fn legal_moves(self) -> impl Iterator<Item = Move> {
        Move::ALL.into_iter().filter(move |&dir| {
            let mut board = self;
            board.slide(dir).is_some()
        })
    }

    /// True if no slide changes the board.
    ///
    /// ```
    /// use td_2048::engine::Board;
    /// // Nothing can move on an empty board.
    /// assert!(Board::EMPTY.is_stuck());
    /// ```
    pub fn is_stuck(self) -> bool { self.legal_moves().next().is_none() }

    /// Place a 2 (90%) or 4 (10%) tile on a random empty cell, using the provided RNG.
    ///
    /// A full board is returned unchanged.
    ///
    /// ```
    /// use td_2048::engine::Board;
    /// use rand::{SeedableRng, rngs::StdRng};
    /// let mut rng = StdRng::seed_from_u64(123);
    /// let b = Board::EMPTY.with_random_tile(&mut rng).with_random_tile(&mut rng);
    /// assert_eq!(b.count_empty(), 14);
    /// ```
    pub fn with_random_tile<R: Rng + ?Sized>(self, rng: &mut R) -> Self {
        let empty: Vec<usize> = (0..16).filter(|&idx| self.exponent(idx) == 0).collect();
        let Some(&pos) = empty.choose(rng) else { return self };
        let tile = if rng.gen_range(0..10) < 9 { 1 } else { 2 };
        self.with_exponent(pos, tile)
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Board({:#018x})", self.0)
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "+------------------------+")?;
        for row in self.exponents().chunks(4) {
            write!(f, "|")?;
            for &e in row {
                let value: u32 = if e == 0 { 0 } else { 1 << e };
                write!(f, "{value:>6}")?;
            }
            writeln!(f, "|")?;
        }
        writeln!(f, "+------------------------+")
    }
}

impl From<BoardRaw> for Board { fn from(v: BoardRaw) -> Self { Board::from_raw(v) } }
impl From<Board> for BoardRaw { fn from(b: Board) -> Self { b.into_raw() } }

/// Initialize the slide tables eagerly. Safe to call multiple times; slides
/// build them lazily otherwise.
pub fn warm() {
    let _ = stores();
}

static STORES: OnceLock<Stores> = OnceLock::new();

#[inline(always)]
fn stores() -> &'static Stores { STORES.get_or_init(create_stores) }

fn create_stores() -> Stores {
    // Allocate on the heap to avoid large stack frames
    let mut slide_left = vec![0; LINE_TABLE_SIZE];
    let mut slide_right = vec![0; LINE_TABLE_SIZE];
    let mut reward_left = vec![0; LINE_TABLE_SIZE];
    let mut reward_right = vec![0; LINE_TABLE_SIZE];

    let mut val: usize = 0;
    while val < LINE_TABLE_SIZE {
        let line = val as Line;
        let (left, left_reward) = slide_line_left(line);
        let (right, right_reward) = slide_line_left(reverse_line(line));
        slide_left[val] = left;
        reward_left[val] = left_reward;
        slide_right[val] = reverse_line(right);
        reward_right[val] = right_reward;
        val += 1;
    }

    Stores {
        slide_left: slide_left.into_boxed_slice(),
        slide_right: slide_right.into_boxed_slice(),
        reward_left: reward_left.into_boxed_slice(),
        reward_right: reward_right.into_boxed_slice(),
    }
}

#[inline(always)]
fn get_line_entry<T: Copy>(table: &[T], line: Line) -> T {
    debug_assert!((line as usize) < LINE_TABLE_SIZE);
    table[line as usize]
}

#[inline(always)]
fn cell_shift(idx: usize) -> u32 { (60 - 4 * idx) as u32 }

#[inline(always)]
fn line_shift(line_idx: usize) -> u32 { (48 - 16 * line_idx) as u32 }

// Credit to Nneonneo
pub(crate) fn transpose(x: BoardRaw) -> BoardRaw {
    let a1 = x & 0xF0F00F0FF0F00F0F;
    let a2 = x & 0x0000F0F00000F0F0;
    let a3 = x & 0x0F0F00000F0F0000;
    let a = a1 | (a2 << 12) | (a3 >> 12);
    let b1 = a & 0xFF00FF0000FF00FF;
    let b2 = a & 0x00FF00FF00000000;
    let b3 = a & 0x00000000FF00FF00;
    b1 | (b2 >> 24) | (b3 << 24)
}

pub(crate) fn extract_line(board: BoardRaw, line_idx: usize) -> Line {
    ((board >> line_shift(line_idx)) & 0xffff) as Line
}

fn reverse_line(line: Line) -> Line {
    (line >> 12) | ((line >> 4) & 0x00F0) | ((line << 4) & 0x0F00) | (line << 12)
}

fn line_to_tiles(line: Line) -> [u8; 4] { std::array::from_fn(|idx| ((line >> (12 - 4 * idx)) & 0xf) as u8) }

fn tiles_to_line(tiles: [u8; 4]) -> Line {
    tiles.iter().fold(0, |line, &tile| (line << 4) | Line::from(tile))
}

/// Compress one row leftward. Each tile merges at most once per slide, and
/// two `MAX_EXPONENT` tiles stay apart so the result still fits a nibble.
fn slide_line_left(line: Line) -> (Line, Reward) {
    let mut out = [0u8; 4];
    let mut top = 0;
    let mut hold = 0u8;
    let mut reward = 0;
    for tile in line_to_tiles(line) {
        if tile == 0 {
            continue;
        }
        if hold == 0 {
            hold = tile;
        } else if tile == hold && tile < MAX_EXPONENT {
            out[top] = tile + 1;
            top += 1;
            reward += 1 << (tile + 1);
            hold = 0;
        } else {
            out[top] = hold;
            top += 1;
            hold = tile;
        }
    }
    if hold != 0 {
        out[top] = hold;
    }
    (tiles_to_line(out), reward)
}

fn count_non_empty(board: Board) -> u32 {
    let mut board_copy = board.0;
    board_copy |= board_copy >> 1;
    board_copy |= board_copy >> 2;
    board_copy &= 0x1111111111111111;
    board_copy.count_ones()
}
