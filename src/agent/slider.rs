use std::path::{Path, PathBuf};

use log::{debug, info, trace};

use crate::action::Action;
use crate::config::AgentConfig;
use crate::engine::Board;
use crate::ntuple::Network;
use crate::rules::{TileCount, WinCondition};
use crate::serialization::{read_weights_with_sizes, write_weights_to_path};

use super::learner::{LearnerParams, TdLearner, TdStats, TerminalRewards, UpdateTransform};
use super::policy::{self, Shaping};
use super::trajectory::{GameStep, Trajectory};
use super::AgentError;

/// Boards above this danger are logged as the episode goes.
const DANGER_LOG_THRESHOLD: f32 = 0.3;
/// 256 and up.
const NOTABLE_EXPONENT: u8 = 8;
const PERIODIC_LOG_MOVES: u32 = 50;

/// Greedy slider over an n-tuple value function, trained online with TD(λ)
/// to steer clear of the win condition.
#[derive(Debug, Clone)]
pub struct LearningSlider<W: WinCondition = TileCount> {
    name: String,
    network: Network,
    learner: TdLearner,
    trajectory: Trajectory,
    shaping: Shaping,
    rewards: TerminalRewards,
    rule: W,
    learning: bool,
    save: Option<PathBuf>,
    episodes: u64,
    moves: u32,
}

impl LearningSlider<TileCount> {
    /// Build with the tile-count rule from `target` and `target_count`.
    pub fn from_config(config: &AgentConfig) -> Result<Self, AgentError> {
        let defaults = TileCount::default();
        let rule = TileCount::new(
            config.target.unwrap_or(defaults.exponent),
            config.target_count.unwrap_or(defaults.count),
        );
        Self::with_rule(config, rule)
    }
}

impl<W: WinCondition> LearningSlider<W> {
    /// Tables are allocated from `init`, then replaced by `load` if given.
    pub fn with_rule(config: &AgentConfig, rule: W) -> Result<Self, AgentError> {
        let mut network = Network::quadrants();
        if let Some(sizes) = &config.init {
            network.allocate(sizes)?;
        }
        if let Some(path) = &config.load {
            let tables = read_weights_with_sizes(path, &network.expected_sizes())
                .map_err(|source| AgentError::Load { path: path.clone(), source })?;
            network.set_tables(tables)?;
            info!("{}: loaded {} weight tables from {}", config.name, network.tables().len(), path.display());
        }

        let params = LearnerParams {
            alpha: config.alpha.unwrap_or(0.0),
            lambda: config.lambda.unwrap_or(0.9),
            decay: config.decay.unwrap_or(0.8),
            trace_mode: config.trace.unwrap_or_default(),
            transforms: config.update.clone().unwrap_or_else(UpdateTransform::default_set),
        };
        let defaults = Shaping::default();
        let shaping = Shaping {
            penalty: config.penalty.unwrap_or(defaults.penalty),
            bonus: config.bonus.unwrap_or(defaults.bonus),
        };
        debug!(
            "{}: alpha={} lambda={} decay={} trace={} penalty={} bonus={}",
            config.name, params.alpha, params.lambda, params.decay, params.trace_mode, shaping.penalty, shaping.bonus
        );

        Ok(Self {
            name: config.name.clone(),
            network,
            learner: TdLearner::new(params),
            trajectory: Trajectory::new(),
            shaping,
            rewards: TerminalRewards::default(),
            rule,
            learning: config.learning.unwrap_or(true),
            save: config.save.clone(),
            episodes: 0,
            moves: 0,
        })
    }

    pub fn name(&self) -> &str { &self.name }

    pub fn network(&self) -> &Network { &self.network }

    pub fn network_mut(&mut self) -> &mut Network { &mut self.network }

    pub fn learner(&self) -> &TdLearner { &self.learner }

    pub fn trajectory(&self) -> &Trajectory { &self.trajectory }

    pub fn rule(&self) -> &W { &self.rule }

    pub fn shaping(&self) -> &Shaping { &self.shaping }

    pub fn is_learning(&self) -> bool { self.learning }

    pub fn set_learning(&mut self, learning: bool) { self.learning = learning; }

    pub fn set_alpha(&mut self, alpha: f32) { self.learner.params_mut().alpha = alpha; }

    pub fn save_path(&self) -> Option<&Path> { self.save.as_deref() }

    pub fn mean_danger(&self) -> Option<f32> { self.trajectory.mean_danger(&self.rule) }

    pub fn take_td_stats(&mut self) -> TdStats { self.learner.take_stats() }

    pub fn open_episode(&mut self, _tag: &str) {
        self.episodes += 1;
        self.moves = 0;
        self.trajectory.clear();
        if self.learning {
            self.learner.open_episode(&self.network);
        }
        debug!("{}: episode {} begins", self.name, self.episodes);
    }

    /// Pick the best-scoring slide, record it, and learn from the previous
    /// step. `None` when no slide is legal.
    pub fn take_action(&mut self, before: &Board) -> Option<Action> {
        self.moves += 1;
        self.narrate(before);

        let best = policy::select(*before, &self.network, &self.rule, &self.shaping)?;
        let action = Action::Slide(best.dir);
        let mut next_state = *before;
        let reward = action.apply(&mut next_state)?;
        self.trajectory.push(GameStep {
            state: *before,
            action,
            reward,
            next_state,
            evaluation: self.network.evaluate(*before),
        });

        if self.learning {
            if let Some(error) = self.learner.online_update(&mut self.network, &self.trajectory) {
                if self.moves % PERIODIC_LOG_MOVES == 0 {
                    trace!("{}: move {} TD error {:.2}", self.name, self.moves, error);
                }
            }
        }
        Some(action)
    }

    fn narrate(&self, before: &Board) {
        let danger = self.rule.danger(before);
        let label = if danger > DANGER_LOG_THRESHOLD {
            "dangerous"
        } else if before.max_exponent() >= NOTABLE_EXPONENT {
            "notable"
        } else if self.moves % PERIODIC_LOG_MOVES == 0 {
            "periodic"
        } else {
            return;
        };
        trace!(
            "{}: episode {} move {} {} board (max tile {}, danger {:.2})\n{}",
            self.name,
            self.episodes,
            self.moves,
            label,
            before.highest_tile(),
            danger,
            before
        );
    }

    pub fn check_for_win(&mut self, board: &Board) -> bool {
        let won = self.rule.is_won(board);
        if won {
            debug!("{}: episode {} met the win condition after {} moves\n{}", self.name, self.episodes, self.moves, board);
        }
        won
    }

    /// Run the backward pass for an episode closed with `tag`.
    pub fn close_episode(&mut self, tag: &str) {
        if self.learning {
            if let Some(last) = self.trajectory.last() {
                let terminal = self.rewards.for_tag(tag, last.next_state, &self.rule);
                let error = self.learner.finish_episode(&mut self.network, &self.trajectory, terminal);
                debug!(
                    "{}: final TD update over {} steps, terminal reward {}, error {:.2}",
                    self.name,
                    self.trajectory.len(),
                    terminal,
                    error.unwrap_or(0.0)
                );
            }
        }
        debug!("{}: episode {} ended ({}) after {} moves", self.name, self.episodes, tag, self.moves);
    }

    /// Write the weights to the configured `save` path. Returns whether
    /// anything was written.
    pub fn save_weights(&self) -> Result<bool, AgentError> {
        let Some(path) = &self.save else { return Ok(false) };
        write_weights_to_path(path, self.network.tables())
            .map_err(|source| AgentError::Save { path: path.clone(), source })?;
        info!("{}: saved {} weight tables to {}", self.name, self.network.tables().len(), path.display());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Move;
    use crate::serialization::{encode_bare_weights, encode_legacy_weights};
    use tempfile::tempdir;

    fn slider(args: &str) -> LearningSlider {
        LearningSlider::from_config(&AgentConfig::parse(args).unwrap()).unwrap()
    }

    #[test]
    fn records_one_step_per_slide() {
        let mut s = slider("init=65536,65536,65536,65536 alpha=0.1");
        s.open_episode("");
        let b = Board::from_raw(0x1100_0000_0000_0000);
        let action = s.take_action(&b).unwrap();
        assert_eq!(action, Action::Slide(Move::Right));
        let step = *s.trajectory().last().unwrap();
        assert_eq!((step.state, step.reward), (b, 4));
        assert_eq!(step.next_state, Board::from_raw(0x0002_0000_0000_0000));
        let mut replayed = b;
        assert_eq!(action.apply(&mut replayed), Some(step.reward));
        assert_eq!(replayed, step.next_state);
        assert_eq!(s.take_action(&Board::from_raw(0x1212_2121_1212_2121)), None);
        assert_eq!(s.trajectory().len(), 1);
    }

    #[test]
    fn learns_only_when_enabled() {
        for (learning, changed) in [("1", true), ("0", false)] {
            let mut s = slider(&format!("init=65536,65536,65536,65536 alpha=0.1 learning={learning}"));
            s.open_episode("");
            s.take_action(&Board::from_raw(0x1100_0000_0000_0000));
            s.take_action(&Board::from_raw(0x0002_0000_1000_0000));
            s.close_episode("lose");
            let touched = s.network().tables().iter().any(|t| t.as_slice().iter().any(|&w| w != 0.0));
            assert_eq!(touched, changed);
            assert_eq!(s.trajectory().len(), 2);
        }
    }

    #[test]
    fn win_check_uses_configured_target() {
        let mut s = slider("target=11 target_count=1");
        assert!(s.check_for_win(&Board::from_raw(0xb000_0000_0000_0000)));
        assert!(!s.check_for_win(&Board::from_raw(0xa000_0000_0000_0000)));
    }

    #[test]
    fn saves_and_reloads_weights() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("weights.bin");
        let mut s = slider(&format!("init=65536,65536,65536,65536 alpha=0.5 save={}", path.display()));
        s.open_episode("");
        s.take_action(&Board::from_raw(0x1100_0000_0000_0000));
        s.close_episode("win");
        assert!(s.save_weights().unwrap());

        let reloaded = slider(&format!("load={}", path.display()));
        assert_eq!(reloaded.network(), s.network());
    }

    #[test]
    fn loads_legacy_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("legacy.bin");
        let mut net = Network::quadrants();
        net.allocate(&[65536; 4]).unwrap();
        net.table_mut(2).add(7, 3.5);
        std::fs::write(&path, encode_legacy_weights(net.tables())).unwrap();
        let s = slider(&format!("load={}", path.display()));
        assert_eq!(s.network().tables()[2].get(7), 3.5);
    }

    #[test]
    fn loads_bare_files_by_pattern_sizes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bare.bin");
        let mut net = Network::quadrants();
        net.allocate(&[65536; 4]).unwrap();
        net.table_mut(1).add(0x21, -1.25);
        std::fs::write(&path, encode_bare_weights(net.tables())).unwrap();
        let s = slider(&format!("load={}", path.display()));
        assert_eq!(s.network(), &net);
    }

    #[test]
    fn missing_weights_are_fatal() {
        let dir = tempdir().unwrap();
        let args = format!("load={}", dir.path().join("nope.bin").display());
        let err = LearningSlider::from_config(&AgentConfig::parse(&args).unwrap()).unwrap_err();
        assert!(matches!(err, AgentError::Load { .. }));
    }

    #[test]
    fn nothing_saved_without_path() {
        assert!(!slider("").save_weights().unwrap());
    }
}
