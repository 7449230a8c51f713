use crate::engine::{Board, Move, Reward};
use crate::ntuple::Network;
use crate::rules::WinCondition;

/// Multiplier that puts the danger penalty on the same scale as merge rewards.
pub const DANGER_SCALE: f32 = 10_000.0;

/// Heuristic terms added on top of the learned value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shaping {
    /// Weight of the danger penalty.
    pub penalty: f32,
    /// Bonus per empty cell after the move.
    pub bonus: f32,
}

impl Default for Shaping {
    fn default() -> Self { Self { penalty: 0.7, bonus: 1000.0 } }
}

/// A legal slide and its score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub dir: Move,
    pub after: Board,
    pub reward: Reward,
    pub score: f32,
}

impl Shaping {
    /// `reward + value(after) - danger(after) * penalty * DANGER_SCALE + empty(after) * bonus`
    pub fn score<W: WinCondition + ?Sized>(&self, reward: Reward, after: Board, network: &Network, rule: &W) -> f32 {
        let penalty = rule.danger(&after) * self.penalty * DANGER_SCALE;
        let survival = after.count_empty() as f32 * self.bonus;
        reward as f32 + network.evaluate(after) - penalty + survival
    }
}

/// Score every legal slide from `board`, in canonical order.
pub fn candidates<'a, W: WinCondition + ?Sized>(
    board: Board,
    network: &'a Network,
    rule: &'a W,
    shaping: &'a Shaping,
) -> impl Iterator<Item = Candidate> + 'a {
    Move::ALL.into_iter().filter_map(move |dir| {
        let mut after = board;
        let reward = after.slide(dir)?;
        Some(Candidate { dir, after, reward, score: shaping.score(reward, after, network, rule) })
    })
}

/// The highest-scoring legal slide, `None` when the board is stuck.
///
/// Scores are compared with strict `>` in canonical order, so ties go to the
/// earliest direction.
///
/// ```
/// use td_2048::agent::policy::{select, Shaping};
/// use td_2048::engine::{Board, Move};
/// use td_2048::ntuple::Network;
/// use td_2048::rules::TileCount;
///
/// let net = Network::quadrants();
/// let board = Board::from_raw(0x1100_0000_0000_0000);
/// let best = select(board, &net, &TileCount::default(), &Shaping::default()).unwrap();
/// assert_eq!(best.dir, Move::Right);
/// assert!(select(Board::EMPTY, &net, &TileCount::default(), &Shaping::default()).is_none());
/// ```
pub fn select<W: WinCondition + ?Sized>(board: Board, network: &Network, rule: &W, shaping: &Shaping) -> Option<Candidate> {
    candidates(board, network, rule, shaping).fold(None, |best, candidate| match best {
        Some(best) if !(candidate.score > best.score) => Some(best),
        _ => Some(candidate),
    })
}
