use std::fmt;
use std::str::FromStr;

use crate::engine::Board;

/// The eight rigid maps of the square: four rotations and their horizontal
/// mirrors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symmetry {
    Identity,
    RotateClockwise,
    Rotate180,
    RotateCounterclockwise,
    MirrorHorizontal,
    /// `MirrorHorizontal` after `RotateClockwise`.
    Transpose,
    /// `MirrorHorizontal` after `Rotate180`.
    MirrorVertical,
    /// `MirrorHorizontal` after `RotateCounterclockwise`.
    AntiTranspose,
}

impl Symmetry {
    pub const ALL: [Symmetry; 8] = [
        Symmetry::Identity,
        Symmetry::RotateClockwise,
        Symmetry::Rotate180,
        Symmetry::RotateCounterclockwise,
        Symmetry::MirrorHorizontal,
        Symmetry::Transpose,
        Symmetry::MirrorVertical,
        Symmetry::AntiTranspose,
    ];

    #[inline]
    pub fn apply(self, board: Board) -> Board {
        match self {
            Symmetry::Identity => board,
            Symmetry::RotateClockwise => board.rotate_clockwise(),
            Symmetry::Rotate180 => board.reverse(),
            Symmetry::RotateCounterclockwise => board.rotate_counterclockwise(),
            Symmetry::MirrorHorizontal => board.reflect_horizontal(),
            Symmetry::Transpose => board.transpose(),
            Symmetry::MirrorVertical => board.reflect_vertical(),
            Symmetry::AntiTranspose => board.reverse().transpose(),
        }
    }

    /// Every image of `board`, in [`Symmetry::ALL`] order.
    #[inline]
    pub fn images(board: Board) -> [Board; 8] { Self::ALL.map(|s| s.apply(board)) }

    pub fn name(self) -> &'static str {
        match self {
            Symmetry::Identity => "identity",
            Symmetry::RotateClockwise => "rotate_cw",
            Symmetry::Rotate180 => "rotate_180",
            Symmetry::RotateCounterclockwise => "rotate_ccw",
            Symmetry::MirrorHorizontal => "mirror_h",
            Symmetry::Transpose => "transpose",
            Symmetry::MirrorVertical => "mirror_v",
            Symmetry::AntiTranspose => "anti_transpose",
        }
    }
}

impl fmt::Display for Symmetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

impl FromStr for Symmetry {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Symmetry::ALL.into_iter().find(|sym| sym.name() == s).ok_or_else(|| s.to_string())
    }
}
