//! The players of an episode.
//!
//! An [`Agent`] is one of a closed set of roles: the random tile placer (the
//! environment), the random slider baseline, or the learning slider. Every
//! role shares the same four hooks so the driver never needs to know which
//! one it holds.

pub mod learner;
pub mod policy;
pub mod random;
pub mod slider;
pub mod trajectory;

use std::path::PathBuf;

use thiserror::Error;

use crate::action::Action;
use crate::config::{AgentConfig, ConfigError};
use crate::engine::Board;
use crate::ntuple::NetworkError;
use crate::serialization::WeightsError;

pub use learner::{TdLearner, TdStats};
pub use random::{RandomPlacer, RandomSlider};
pub use slider::LearningSlider;
pub use trajectory::{GameStep, Trajectory};

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("network error: {0}")]
    Network(#[from] NetworkError),
    #[error("failed to load weights from {}: {source}", .path.display())]
    Load { path: PathBuf, source: WeightsError },
    #[error("failed to save weights to {}: {source}", .path.display())]
    Save { path: PathBuf, source: WeightsError },
    #[error("unknown role {0:?}")]
    Role(String),
}

#[derive(Debug, Clone)]
pub enum Agent {
    Placer(RandomPlacer),
    Slider(RandomSlider),
    Learner(LearningSlider),
}

impl Agent {
    /// Build whichever role `config.role` names: `placer`, `slider` or
    /// `learner`.
    pub fn from_config(config: &AgentConfig) -> Result<Self, AgentError> {
        let agent = match config.role.as_str() {
            "placer" => Agent::Placer(RandomPlacer::from_config(config)),
            "slider" => Agent::Slider(RandomSlider::from_config(config)),
            "learner" => Agent::Learner(LearningSlider::from_config(config)?),
            other => return Err(AgentError::Role(other.to_string())),
        };
        Ok(agent)
    }

    /// A random placer; `args` override `name=place role=placer`.
    ///
    /// ```
    /// use td_2048::agent::Agent;
    /// let placer = Agent::placer("seed=1").unwrap();
    /// assert_eq!((placer.name(), placer.role()), ("place", "placer"));
    /// ```
    pub fn placer(args: &str) -> Result<Self, AgentError> {
        Self::from_config(&AgentConfig::parse(&format!("name=place role=placer {args}"))?)
    }

    /// A random slider; `args` override `name=slide role=slider`.
    pub fn slider(args: &str) -> Result<Self, AgentError> {
        Self::from_config(&AgentConfig::parse(&format!("name=slide role=slider {args}"))?)
    }

    /// The learning slider; `args` override `name=learner role=learner`.
    pub fn learner(args: &str) -> Result<Self, AgentError> {
        Self::from_config(&AgentConfig::parse(&format!("name=learner role=learner {args}"))?)
    }

    pub fn name(&self) -> &str {
        match self {
            Agent::Placer(p) => p.name(),
            Agent::Slider(s) => s.name(),
            Agent::Learner(l) => l.name(),
        }
    }

    pub fn role(&self) -> &'static str {
        match self {
            Agent::Placer(_) => "placer",
            Agent::Slider(_) => "slider",
            Agent::Learner(_) => "learner",
        }
    }

    pub fn open_episode(&mut self, tag: &str) {
        if let Agent::Learner(l) = self {
            l.open_episode(tag);
        }
    }

    pub fn close_episode(&mut self, tag: &str) {
        if let Agent::Learner(l) = self {
            l.close_episode(tag);
        }
    }

    pub fn take_action(&mut self, board: &Board) -> Option<Action> {
        match self {
            Agent::Placer(p) => p.take_action(board),
            Agent::Slider(s) => s.take_action(board),
            Agent::Learner(l) => l.take_action(board),
        }
    }

    /// Only the learner tracks a win condition; the random roles never
    /// declare one.
    pub fn check_for_win(&mut self, board: &Board) -> bool {
        match self {
            Agent::Learner(l) => l.check_for_win(board),
            _ => false,
        }
    }

    pub fn as_learner(&self) -> Option<&LearningSlider> {
        match self {
            Agent::Learner(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_learner_mut(&mut self) -> Option<&mut LearningSlider> {
        match self {
            Agent::Learner(l) => Some(l),
            _ => None,
        }
    }

    pub fn trajectory(&self) -> Option<&Trajectory> { self.as_learner().map(LearningSlider::trajectory) }

    pub fn mean_danger(&self) -> Option<f32> { self.as_learner().and_then(LearningSlider::mean_danger) }

    /// TD totals since the last call; empty for the random roles.
    pub fn take_td_stats(&mut self) -> TdStats {
        self.as_learner_mut().map(LearningSlider::take_td_stats).unwrap_or_default()
    }

    /// Persist learned weights if this agent has any and a `save` path.
    pub fn save_weights(&self) -> Result<bool, AgentError> {
        self.as_learner().map_or(Ok(false), LearningSlider::save_weights)
    }
}
