use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::action::Action;
use crate::config::AgentConfig;
use crate::engine::{Board, Move};

fn rng_from(config: &AgentConfig) -> StdRng {
    match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// The environment: drops a 2 (90%) or a 4 (10%) on a uniformly random
/// empty cell.
#[derive(Debug, Clone)]
pub struct RandomPlacer {
    name: String,
    rng: StdRng,
    space: [u8; 16],
}

impl RandomPlacer {
    pub fn new(rng: StdRng) -> Self {
        Self { name: "place".to_string(), rng, space: std::array::from_fn(|i| i as u8) }
    }

    pub fn from_config(config: &AgentConfig) -> Self {
        Self { name: config.name.clone(), ..Self::new(rng_from(config)) }
    }

    pub fn name(&self) -> &str { &self.name }

    /// `None` only when the board is full.
    pub fn take_action(&mut self, after: &Board) -> Option<Action> {
        self.space.shuffle(&mut self.rng);
        let pos = self.space.iter().copied().find(|&pos| after.exponent(pos as usize) == 0)?;
        let tile = if self.rng.gen_range(0..10) != 0 { 1 } else { 2 };
        Some(Action::Place { pos, tile })
    }
}

/// A uniformly random legal slide.
#[derive(Debug, Clone)]
pub struct RandomSlider {
    name: String,
    rng: StdRng,
    opcodes: [Move; 4],
}

impl RandomSlider {
    pub fn new(rng: StdRng) -> Self { Self { name: "slide".to_string(), rng, opcodes: Move::ALL } }

    pub fn from_config(config: &AgentConfig) -> Self {
        Self { name: config.name.clone(), ..Self::new(rng_from(config)) }
    }

    pub fn name(&self) -> &str { &self.name }

    /// `None` when no slide is legal.
    pub fn take_action(&mut self, before: &Board) -> Option<Action> {
        self.opcodes.shuffle(&mut self.rng);
        self.opcodes
            .iter()
            .copied()
            .find(|&dir| {
                let mut b = *before;
                b.slide(dir).is_some()
            })
            .map(Action::Slide)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(seed: u64) -> StdRng { StdRng::seed_from_u64(seed) }

    #[test]
    fn placer_fills_only_empty_cells() {
        let mut placer = RandomPlacer::new(seeded(1));
        let mut board = Board::EMPTY;
        for filled in 1..=16 {
            let action = placer.take_action(&board).unwrap();
            assert_eq!(action.apply(&mut board), Some(0));
            assert_eq!(board.count_empty(), 16 - filled);
        }
        assert_eq!(placer.take_action(&board), None);
    }

    #[test]
    fn placer_mostly_drops_twos() {
        let mut placer = RandomPlacer::new(seeded(2));
        let fours = (0..1000)
            .filter(|_| matches!(placer.take_action(&Board::EMPTY), Some(Action::Place { tile: 2, .. })))
            .count();
        assert!((50..150).contains(&fours), "{fours} fours out of 1000");
    }

    #[test]
    fn slider_picks_legal_moves() {
        let mut slider = RandomSlider::new(seeded(3));
        // Only Down and Left move the top-right tile.
        let corner = Board::from_raw(0x0001_0000_0000_0000);
        for _ in 0..20 {
            let action = slider.take_action(&corner).unwrap();
            assert!(matches!(action, Action::Slide(Move::Down | Move::Left)));
        }
        assert_eq!(slider.take_action(&Board::EMPTY), None);
    }

    #[test]
    fn seeds_reproduce() {
        let cfg = AgentConfig::parse("seed=9").unwrap();
        let (mut a, mut b) = (RandomPlacer::from_config(&cfg), RandomPlacer::from_config(&cfg));
        for _ in 0..10 {
            assert_eq!(a.take_action(&Board::EMPTY), b.take_action(&Board::EMPTY));
        }
    }
}
