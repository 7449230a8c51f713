use crate::action::Action;
use crate::engine::{Board, Reward};
use crate::rules::WinCondition;

/// One recorded transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameStep {
    /// Board before the slide.
    pub state: Board,
    pub action: Action,
    pub reward: Reward,
    /// Board right after the slide, before any tile is placed.
    pub next_state: Board,
    /// Network value of `state` when the move was chosen.
    pub evaluation: f32,
}

/// Ordered transitions of the current episode.
///
/// Appended to while the episode runs and cleared when the next one opens.
#[derive(Debug, Clone, Default)]
pub struct Trajectory {
    steps: Vec<GameStep>,
}

impl Trajectory {
    pub fn new() -> Self { Self::default() }

    pub fn clear(&mut self) { self.steps.clear(); }

    pub fn push(&mut self, step: GameStep) { self.steps.push(step); }

    pub fn len(&self) -> usize { self.steps.len() }

    pub fn is_empty(&self) -> bool { self.steps.is_empty() }

    pub fn last(&self) -> Option<&GameStep> { self.steps.last() }

    /// The step before the most recent one.
    pub fn previous(&self) -> Option<&GameStep> {
        self.steps.len().checked_sub(2).map(|idx| &self.steps[idx])
    }

    pub fn steps(&self) -> &[GameStep] { &self.steps }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &GameStep> + ExactSizeIterator { self.steps.iter() }

    /// Mean danger of the pre-move boards, `None` for an empty trajectory.
    pub fn mean_danger<W: WinCondition + ?Sized>(&self, rule: &W) -> Option<f32> {
        if self.steps.is_empty() {
            return None;
        }
        let total: f32 = self.steps.iter().map(|step| rule.danger(&step.state)).sum();
        Some(total / self.steps.len() as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Move;
    use crate::rules::TileCount;

    fn step(state: u64) -> GameStep {
        GameStep {
            state: Board::from_raw(state),
            action: Action::Slide(Move::Left),
            reward: 0,
            next_state: Board::from_raw(state),
            evaluation: 0.0,
        }
    }

    #[test]
    fn previous_is_second_to_last() {
        let mut t = Trajectory::new();
        assert!(t.previous().is_none());
        t.push(step(1));
        assert!(t.previous().is_none());
        t.push(step(2));
        assert_eq!(t.previous().map(|s| s.state), Some(Board::from_raw(1)));
        assert_eq!(t.last().map(|s| s.state), Some(Board::from_raw(2)));
        t.clear();
        assert!(t.is_empty());
    }

    #[test]
    fn mean_danger_over_states() {
        let mut t = Trajectory::new();
        assert_eq!(t.mean_danger(&TileCount::default()), None);
        t.push(step(0xdcc0_0000_0000_0000));
        t.push(step(0));
        assert_eq!(t.mean_danger(&TileCount::default()), Some(0.5));
    }
}
