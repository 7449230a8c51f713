//! TD(λ) updates for an n-tuple [`Network`], with per-weight eligibility
//! traces.
//!
//! Only the weights a board actually indexes are updated: each update sets
//! (or bumps) the trace of those cells and moves them by
//! `alpha * error * scale * trace`. Traces of untouched cells only decay.

use std::fmt;
use std::str::FromStr;

use crate::engine::Board;
use crate::ntuple::{Network, Symmetry};
use crate::rules::{Outcome, Standing, WinCondition};

use super::trajectory::Trajectory;

/// How touching a cell changes its trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TraceMode {
    /// Set to `1.0`.
    #[default]
    Replacing,
    /// Add `1.0`.
    Accumulating,
}

impl FromStr for TraceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "replace" | "replacing" => Ok(TraceMode::Replacing),
            "accumulate" | "accumulating" => Ok(TraceMode::Accumulating),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for TraceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TraceMode::Replacing => "replace",
            TraceMode::Accumulating => "accumulate",
        })
    }
}

/// A board image the update is applied to, and the step size share it gets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdateTransform {
    pub symmetry: Symmetry,
    pub scale: f32,
}

impl UpdateTransform {
    pub const fn new(symmetry: Symmetry, scale: f32) -> Self { Self { symmetry, scale } }

    /// Identity at full weight plus the two mirror axes at an eighth each.
    pub fn default_set() -> Vec<Self> {
        vec![
            Self::new(Symmetry::Identity, 1.0),
            Self::new(Symmetry::MirrorHorizontal, 0.125),
            Self::new(Symmetry::Transpose, 0.125),
        ]
    }

    /// Every symmetric image at an eighth each.
    pub fn all() -> Vec<Self> { Symmetry::ALL.iter().map(|&s| Self::new(s, 0.125)).collect() }
}

impl fmt::Display for UpdateTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}:{}", self.symmetry, self.scale) }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LearnerParams {
    /// Step size. Zero leaves every weight untouched.
    pub alpha: f32,
    /// Discount applied to bootstrapped values and to the backward pass.
    pub lambda: f32,
    /// Per-step trace decay.
    pub decay: f32,
    pub trace_mode: TraceMode,
    pub transforms: Vec<UpdateTransform>,
}

impl Default for LearnerParams {
    fn default() -> Self {
        Self {
            alpha: 0.0,
            lambda: 0.9,
            decay: 0.8,
            trace_mode: TraceMode::default(),
            transforms: UpdateTransform::default_set(),
        }
    }
}

/// Running TD error totals since the last drain.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TdStats {
    pub updates: u64,
    pub total_abs_error: f64,
}

impl TdStats {
    pub fn record(&mut self, error: f32) {
        self.updates += 1;
        self.total_abs_error += f64::from(error.abs());
    }

    pub fn mean_abs_error(&self) -> Option<f64> {
        (self.updates > 0).then(|| self.total_abs_error / self.updates as f64)
    }

    pub fn merge(&mut self, other: TdStats) {
        self.updates += other.updates;
        self.total_abs_error += other.total_abs_error;
    }
}

/// One trace per weight, shaped like the network's tables.
#[derive(Debug, Clone, Default)]
pub struct EligibilityTraces {
    tables: Vec<Vec<f32>>,
}

impl EligibilityTraces {
    /// Zero every trace, reshaping to `network` if its tables changed.
    pub fn reset(&mut self, network: &Network) {
        self.tables.resize_with(network.tables().len(), Vec::new);
        for (traces, weights) in self.tables.iter_mut().zip(network.tables()) {
            traces.clear();
            traces.resize(weights.len(), 0.0);
        }
    }

    pub fn fits(&self, network: &Network) -> bool {
        self.tables.len() == network.tables().len()
            && self.tables.iter().zip(network.tables()).all(|(traces, weights)| traces.len() == weights.len())
    }

    pub fn decay(&mut self, factor: f32) {
        self.tables.iter_mut().flatten().for_each(|trace| *trace *= factor);
    }

    /// Mark a cell as just visited and return its new trace.
    #[inline]
    pub fn touch(&mut self, table: usize, index: usize, mode: TraceMode) -> f32 {
        let trace = &mut self.tables[table][index];
        match mode {
            TraceMode::Replacing => *trace = 1.0,
            TraceMode::Accumulating => *trace += 1.0,
        }
        *trace
    }

    pub fn get(&self, table: usize, index: usize) -> f32 {
        self.tables.get(table).and_then(|t| t.get(index)).copied().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Active,
    Finalizing,
}

#[derive(Debug, Clone, Default)]
pub struct TdLearner {
    params: LearnerParams,
    traces: EligibilityTraces,
    phase: Phase,
    stats: TdStats,
}

impl TdLearner {
    pub fn new(params: LearnerParams) -> Self { Self { params, ..Self::default() } }

    pub fn params(&self) -> &LearnerParams { &self.params }

    pub fn params_mut(&mut self) -> &mut LearnerParams { &mut self.params }

    pub fn phase(&self) -> Phase { self.phase }

    pub fn traces(&self) -> &EligibilityTraces { &self.traces }

    pub fn open_episode(&mut self, network: &Network) {
        self.traces.reset(network);
        self.phase = Phase::Active;
    }

    /// Learn from the transition into the most recent step.
    ///
    /// The value of the newest pre-move board is its recorded evaluation: it
    /// was computed with the current weights a moment ago. Returns the TD
    /// error, or `None` before the second step of an active episode.
    pub fn online_update(&mut self, network: &mut Network, trajectory: &Trajectory) -> Option<f32> {
        if self.phase != Phase::Active {
            return None;
        }
        let (prev, current) = (trajectory.previous()?, trajectory.last()?);
        let target = prev.reward as f32 + self.params.lambda * current.evaluation;
        let error = target - prev.evaluation;

        self.traces.decay(self.params.decay);
        self.apply(network, prev.state, error);
        self.stats.record(error);
        Some(error)
    }

    /// Move every weight `state` indexes, over each update transform.
    pub fn apply(&mut self, network: &mut Network, state: Board, error: f32) {
        if network.is_empty() {
            return;
        }
        if !self.traces.fits(network) {
            self.traces.reset(network);
        }
        let TdLearner { params, traces, .. } = self;
        for transform in &params.transforms {
            let image = transform.symmetry.apply(state);
            for table in 0..network.tables().len() {
                let index = network.patterns()[table].index(image);
                let trace = traces.touch(table, index, params.trace_mode);
                network.table_mut(table).add(index, params.alpha * error * transform.scale * trace);
            }
        }
    }

    /// Backward pass over the finished trajectory.
    ///
    /// Starts from `terminal_reward - last.evaluation` and walks the steps in
    /// reverse: step `i` is updated with the running error discounted by
    /// `lambda^(n-1-i)`, and the running error then becomes
    /// `reward_i + lambda * error`. Replacing traces do not decay during the
    /// pass; accumulating traces decay once per step, so a cell revisited
    /// every step stays below `1 / (1 - decay)`.
    /// Returns the initial error, `None` for an empty trajectory.
    pub fn finish_episode(&mut self, network: &mut Network, trajectory: &Trajectory, terminal_reward: f32) -> Option<f32> {
        self.phase = Phase::Finalizing;
        let initial = trajectory.last().map(|last| terminal_reward - last.evaluation);
        if let Some(initial) = initial {
            let mut error = initial;
            let mut discount = 1.0;
            for (i, step) in trajectory.iter().enumerate().rev() {
                if self.params.trace_mode == TraceMode::Accumulating {
                    self.traces.decay(self.params.decay);
                }
                self.apply(network, step.state, error * discount);
                if i > 0 {
                    error = step.reward as f32 + self.params.lambda * error;
                }
                discount *= self.params.lambda;
            }
            self.stats.record(initial);
        }
        self.phase = Phase::Idle;
        initial
    }

    /// Drain the TD error totals gathered since the last call.
    pub fn take_stats(&mut self) -> TdStats { std::mem::take(&mut self.stats) }
}

/// Terminal rewards by outcome and by how close a lost game came to the win.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerminalRewards {
    pub win: f32,
    pub holding: f32,
    pub approaching: f32,
    pub distant: f32,
}

impl Default for TerminalRewards {
    fn default() -> Self { Self { win: -50_000.0, holding: 10_000.0, approaching: 5_000.0, distant: 1_000.0 } }
}

impl TerminalRewards {
    /// Reward for an episode closed with `tag`, judged on the final board.
    /// Unknown tags are worth nothing.
    pub fn for_tag<W: WinCondition + ?Sized>(&self, tag: &str, last: Board, rule: &W) -> f32 {
        match Outcome::from_tag(tag) {
            Some(Outcome::Win) => self.win,
            Some(Outcome::Lose) => match rule.standing(&last) {
                Standing::Holding => self.holding,
                Standing::Approaching => self.approaching,
                Standing::Distant => self.distant,
            },
            None => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;
    use crate::agent::trajectory::GameStep;
    use crate::engine::Move;
    use crate::rules::TileCount;

    fn network() -> Network {
        let mut net = Network::quadrants();
        net.allocate(&[65536; 4]).unwrap();
        net
    }

    fn step(net: &Network, state: u64, reward: u32) -> GameStep {
        let state = Board::from_raw(state);
        GameStep {
            state,
            action: Action::Slide(Move::Left),
            reward,
            next_state: state,
            evaluation: net.evaluate(state),
        }
    }

    fn identity_only(alpha: f32) -> LearnerParams {
        LearnerParams {
            alpha,
            transforms: vec![UpdateTransform::new(Symmetry::Identity, 1.0)],
            ..LearnerParams::default()
        }
    }

    fn close(a: f32, b: f32) -> bool { (a - b).abs() < 1e-3 }

    #[test]
    fn single_online_step() {
        let mut net = network();
        // Exponent 2 in cell 0 is worth 1.0 per image that puts it there.
        net.table_mut(0).add(2, 1.0);
        let mut trajectory = Trajectory::new();
        trajectory.push(step(&net, 0x1000_0000_0000_0000, 8));
        trajectory.push(step(&net, 0x0000_0000_0000_0002, 0));
        let v = trajectory.last().unwrap().evaluation;
        assert_eq!(v, 2.0);
        assert_eq!(trajectory.previous().unwrap().evaluation, 0.0);

        let mut learner = TdLearner::new(identity_only(0.5));
        learner.open_episode(&net);
        let error = learner.online_update(&mut net, &trajectory).unwrap();
        assert!(close(error, 8.0 + 0.9 * v));
        // Cell 0 holds exponent 1, the other quadrants are empty.
        assert!(close(net.tables()[0].get(1), 0.5 * error));
        for table in 1..4 {
            assert!(close(net.tables()[table].get(0), 0.5 * error));
            assert_eq!(learner.traces().get(table, 0), 1.0);
        }
        assert_eq!(learner.traces().get(0, 1), 1.0);
        assert_eq!(net.tables()[0].get(2), 1.0);
    }

    #[test]
    fn online_update_needs_two_steps() {
        let mut net = network();
        let mut trajectory = Trajectory::new();
        let mut learner = TdLearner::new(identity_only(0.5));
        trajectory.push(step(&net, 0x1000_0000_0000_0000, 8));
        assert_eq!(learner.online_update(&mut net, &trajectory), None);
        learner.open_episode(&net);
        assert_eq!(learner.online_update(&mut net, &trajectory), None);
        assert_eq!(learner.take_stats().updates, 0);
    }

    #[test]
    fn traces_decay_before_touch() {
        let mut net = network();
        let mut trajectory = Trajectory::new();
        let mut learner = TdLearner::new(identity_only(0.1));
        learner.open_episode(&net);
        trajectory.push(step(&net, 0x1000_0000_0000_0000, 4));
        trajectory.push(step(&net, 0x2000_0000_0000_0000, 4));
        learner.online_update(&mut net, &trajectory).unwrap();
        trajectory.push(step(&net, 0x3000_0000_0000_0000, 4));
        learner.online_update(&mut net, &trajectory).unwrap();
        // First update touched index 1, the second index 2.
        assert!(close(learner.traces().get(0, 1), 0.8));
        assert_eq!(learner.traces().get(0, 2), 1.0);
        // Empty quadrants were touched both times.
        assert_eq!(learner.traces().get(1, 0), 1.0);
        assert_eq!(learner.take_stats().updates, 2);
    }

    #[test]
    fn accumulating_traces_grow() {
        let mut net = network();
        let mut params = identity_only(1.0);
        params.trace_mode = TraceMode::Accumulating;
        let mut learner = TdLearner::new(params);
        learner.open_episode(&net);
        learner.apply(&mut net, Board::EMPTY, 1.0);
        learner.apply(&mut net, Board::EMPTY, 1.0);
        assert_eq!(learner.traces().get(0, 0), 2.0);
        assert_eq!(net.tables()[0].get(0), 3.0);
    }

    #[test]
    fn backward_pass_two_steps() {
        let mut net = network();
        let mut trajectory = Trajectory::new();
        trajectory.push(step(&net, 0x1000_0000_0000_0000, 2));
        trajectory.push(step(&net, 0x2000_0000_0000_0000, 4));
        let mut learner = TdLearner::new(identity_only(1.0));
        learner.open_episode(&net);

        let initial = learner.finish_episode(&mut net, &trajectory, 1000.0).unwrap();
        assert_eq!(initial, 1000.0);
        // Last step gets the full error; the first gets (r1 + λ·1000)·λ.
        let first = (4.0 + 0.9 * 1000.0) * 0.9;
        assert!(close(net.tables()[0].get(2), 1000.0));
        assert!(close(net.tables()[0].get(1), first));
        assert!(close(net.tables()[3].get(0), 1000.0 + first));
        assert_eq!(learner.phase(), Phase::Idle);
    }

    #[test]
    fn accumulating_backward_pass_stays_bounded() {
        let steps = 500;
        let mut trajectory = Trajectory::new();
        let run = |mode: TraceMode, trajectory: &Trajectory| {
            let mut net = network();
            let params = LearnerParams { lambda: 1.0, trace_mode: mode, ..identity_only(1.0) };
            let mut learner = TdLearner::new(params);
            learner.open_episode(&net);
            learner.finish_episode(&mut net, trajectory, 1.0);
            (net.tables()[0].get(0), learner.traces().get(0, 0))
        };
        for _ in 0..steps {
            trajectory.push(step(&network(), 0, 0));
        }

        let (replacing, trace) = run(TraceMode::Replacing, &trajectory);
        assert!(close(replacing, steps as f32));
        assert_eq!(trace, 1.0);

        // The k-th touch leaves a trace of 5 * (1 - 0.8^k).
        let (accumulating, trace) = run(TraceMode::Accumulating, &trajectory);
        assert!(trace <= 5.0 && trace > 4.99, "{trace}");
        let expected = 5.0 * steps as f32 - 20.0 * (1.0 - 0.8f32.powi(steps));
        assert!((accumulating - expected).abs() < 1.0, "{accumulating} vs {expected}");
    }

    #[test]
    fn empty_trajectory_finishes_quietly() {
        let mut net = network();
        let mut learner = TdLearner::new(identity_only(1.0));
        learner.open_episode(&net);
        assert_eq!(learner.finish_episode(&mut net, &Trajectory::new(), -50_000.0), None);
        assert!(net.tables().iter().all(|t| t.as_slice().iter().all(|&w| w == 0.0)));
    }

    #[test]
    fn zero_alpha_changes_nothing() {
        let mut net = network();
        let mut learner = TdLearner::new(LearnerParams::default());
        learner.open_episode(&net);
        learner.apply(&mut net, Board::from_raw(0x1234_0000_0000_0000), 100.0);
        assert!(net.tables().iter().all(|t| t.as_slice().iter().all(|&w| w == 0.0)));
    }

    #[test]
    fn default_transforms_split_the_step() {
        let mut net = network();
        let mut learner = TdLearner::new(LearnerParams { alpha: 1.0, ..LearnerParams::default() });
        learner.open_episode(&net);
        // Cell 0 is fixed by transpose and moves to cell 3 under the mirror.
        learner.apply(&mut net, Board::from_raw(0x1000_0000_0000_0000), 8.0);
        assert!(close(net.tables()[0].get(1), 8.0 + 1.0));
        assert!(close(net.tables()[1].get(1 << 4), 1.0));
    }

    #[test]
    fn terminal_rewards() {
        let rewards = TerminalRewards::default();
        let rule = TileCount::default();
        let holding = Board::from_raw(0xd000_0000_0000_0001);
        let approaching = Board::from_raw(0xc000_0000_0000_0001);
        let distant = Board::from_raw(0xb000_0000_0000_0001);
        assert_eq!(rewards.for_tag("win", holding, &rule), -50_000.0);
        assert_eq!(rewards.for_tag("lose", holding, &rule), 10_000.0);
        assert_eq!(rewards.for_tag("lose", approaching, &rule), 5_000.0);
        assert_eq!(rewards.for_tag("lose", distant, &rule), 1_000.0);
        assert_eq!(rewards.for_tag("abort", holding, &rule), 0.0);
    }

    #[test]
    fn parses_trace_modes() {
        assert_eq!("replace".parse::<TraceMode>(), Ok(TraceMode::Replacing));
        assert_eq!("accumulate".parse::<TraceMode>(), Ok(TraceMode::Accumulating));
        assert!("sticky".parse::<TraceMode>().is_err());
        assert_eq!(UpdateTransform::all().len(), 8);
    }
}
