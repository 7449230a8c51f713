//! Terminal rules for the inverted game: the slider *wins* (a bad outcome for
//! the learner) once enough high tiles coexist.

use serde::{Deserialize, Serialize};

use crate::engine::{Board, MAX_EXPONENT};

/// How an episode ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// The win condition was met.
    Win,
    /// The board got stuck first.
    Lose,
}

impl Outcome {
    /// The free-form tag handed to `close_episode`.
    pub fn tag(self) -> &'static str {
        match self {
            Outcome::Win => "win",
            Outcome::Lose => "lose",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "win" => Some(Outcome::Win),
            "lose" => Some(Outcome::Lose),
            _ => None,
        }
    }
}

/// Where a finished board stands relative to the win condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Standing {
    /// One target tile short of the win.
    Holding,
    /// No target tile yet, but the tier just below it was reached.
    Approaching,
    Distant,
}

/// A pluggable win predicate plus the heuristics derived from it.
pub trait WinCondition {
    fn is_won(&self, board: &Board) -> bool;

    /// Proximity to the win condition in `[0, 1]`.
    fn danger(&self, _board: &Board) -> f32 { 0.0 }

    fn standing(&self, _board: &Board) -> Standing { Standing::Distant }
}

/// Any plain predicate works as a rule with no danger shaping.
impl<F: Fn(&Board) -> bool> WinCondition for F {
    fn is_won(&self, board: &Board) -> bool { self(board) }
}

/// Won once at least `count` cells hold `exponent`.
///
/// The default is two 8192 tiles.
///
/// ```
/// use td_2048::engine::Board;
/// use td_2048::rules::{TileCount, WinCondition};
/// let rule = TileCount::default();
/// let one = Board::from_raw(0xd000_0000_0000_0000);
/// let two = Board::from_raw(0xd00d_0000_0000_0000);
/// assert!(!rule.is_won(&one));
/// assert!(rule.is_won(&two));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileCount {
    pub exponent: u8,
    pub count: usize,
}

impl Default for TileCount {
    fn default() -> Self { Self { exponent: 13, count: 2 } }
}

impl TileCount {
    pub fn new(exponent: u8, count: usize) -> Self {
        Self { exponent: exponent.min(MAX_EXPONENT), count }
    }

    fn tiers(&self, board: &Board) -> (usize, usize) {
        let target = board.count_exponent(self.exponent);
        let below = match self.exponent {
            0 => 0,
            e => board.count_exponent(e - 1),
        };
        (target, below)
    }
}

impl WinCondition for TileCount {
    fn is_won(&self, board: &Board) -> bool { board.count_exponent(self.exponent) >= self.count }

    /// Staged: 1.0 with a target tile and two next-tier tiles, 0.7 with one
    /// of each, 0.4 with three next-tier tiles, else 0.
    fn danger(&self, board: &Board) -> f32 {
        let (target, below) = self.tiers(board);
        if target >= 1 && below >= 2 {
            1.0
        } else if target >= 1 && below >= 1 {
            0.7
        } else if below >= 3 {
            0.4
        } else {
            0.0
        }
    }

    fn standing(&self, board: &Board) -> Standing {
        let (target, _) = self.tiers(board);
        if target > 0 && target + 1 == self.count {
            Standing::Holding
        } else if target == 0 && self.exponent > 0 && board.max_exponent() >= self.exponent - 1 {
            Standing::Approaching
        } else {
            Standing::Distant
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(cells: &[u8]) -> Board {
        let mut all = [0; 16];
        all[..cells.len()].copy_from_slice(cells);
        Board::from_exponents(all).unwrap()
    }

    #[test]
    fn win_needs_two_target_tiles() {
        let rule = TileCount::default();
        assert!(!rule.is_won(&board(&[])));
        assert!(!rule.is_won(&board(&[13, 12, 12])));
        assert!(rule.is_won(&board(&[13, 13])));
        assert!(rule.is_won(&board(&[13, 1, 13, 13])));
    }

    #[test]
    fn alternate_targets() {
        let rule = TileCount::new(11, 1);
        assert!(rule.is_won(&board(&[11])));
        assert!(!rule.is_won(&board(&[10, 10])));
        let predicate = |b: &Board| b.max_exponent() >= 3;
        assert!(predicate.is_won(&board(&[3])));
        assert_eq!(predicate.danger(&board(&[3])), 0.0);
    }

    #[test]
    fn danger_levels() {
        let rule = TileCount::default();
        assert_eq!(rule.danger(&board(&[13, 12, 12])), 1.0);
        assert_eq!(rule.danger(&board(&[13, 12])), 0.7);
        assert_eq!(rule.danger(&board(&[12, 12, 12])), 0.4);
        assert_eq!(rule.danger(&board(&[12, 12])), 0.0);
        assert_eq!(rule.danger(&board(&[13])), 0.0);
    }

    #[test]
    fn standings() {
        let rule = TileCount::default();
        assert_eq!(rule.standing(&board(&[13, 5])), Standing::Holding);
        assert_eq!(rule.standing(&board(&[12, 5])), Standing::Approaching);
        assert_eq!(rule.standing(&board(&[11, 11])), Standing::Distant);
    }

    #[test]
    fn outcome_tags() {
        assert_eq!(Outcome::from_tag(Outcome::Win.tag()), Some(Outcome::Win));
        assert_eq!(Outcome::from_tag("lose"), Some(Outcome::Lose));
        assert_eq!(Outcome::from_tag("draw"), None);
    }
}
