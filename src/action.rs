use serde::{Deserialize, Serialize};
use std::fmt;

use crate::engine::{Board, Move, Reward};

/// A move by either side of the game. Carries no board state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// The player slides every tile in a direction.
    Slide(Move),
    /// The environment drops a tile of exponent `tile` (1 or 2) on cell `pos`.
    Place { pos: u8, tile: u8 },
}

impl Action {
    /// Apply to `board`, returning the reward or `None` if illegal there.
    ///
    /// ```
    /// use td_2048::action::Action;
    /// use td_2048::engine::{Board, Move};
    /// let mut b = Board::EMPTY;
    /// assert_eq!(Action::Place { pos: 0, tile: 1 }.apply(&mut b), Some(0));
    /// assert_eq!(Action::Slide(Move::Left).apply(&mut b), None);
    /// assert_eq!(Action::Slide(Move::Right).apply(&mut b), Some(0));
    /// ```
    #[inline]
    pub fn apply(self, board: &mut Board) -> Option<Reward> {
        match self {
            Action::Slide(dir) => board.slide(dir),
            Action::Place { pos, tile } => board.place(pos as usize, tile),
        }
    }

    pub fn is_slide(self) -> bool { matches!(self, Action::Slide(_)) }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Slide(dir) => write!(f, "#{}", ["U", "R", "D", "L"][dir.opcode() as usize]),
            Action::Place { pos, tile } => match 1u64.checked_shl(u32::from(*tile)) {
                Some(value) => write!(f, "{pos:X}{value}"),
                None => write!(f, "{pos:X}2^{tile}"),
            },
        }
    }
}
