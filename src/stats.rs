//! Episode bookkeeping owned by the driver, with periodic reports through
//! the `log` facade.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::agent::learner::TdStats;
use crate::rules::Outcome;

/// Summary of one finished episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeRecord {
    pub score: u64,
    pub slides: u32,
    pub places: u32,
    pub slide_time: Duration,
    pub place_time: Duration,
    pub max_exponent: u8,
    /// `None` when the episode was closed with some other tag.
    pub outcome: Option<Outcome>,
    /// Mean danger over the slider's trajectory, if it kept one.
    pub mean_danger: Option<f32>,
    pub final_board: u64,
}

impl EpisodeRecord {
    pub fn ops(&self) -> u32 { self.slides + self.places }

    pub fn duration(&self) -> Duration { self.slide_time + self.place_time }
}

fn per_second(ops: u64, time: Duration) -> f64 {
    let secs = time.as_secs_f64();
    if secs > 0.0 { ops as f64 / secs } else { 0.0 }
}

/// Share of a block that reached a tile, and share that ended on it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileRate {
    pub tile: u32,
    pub reach: f64,
    pub ending: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    /// Episodes started so far.
    pub index: usize,
    pub episodes: usize,
    pub mean_score: f64,
    pub max_score: u64,
    pub ops: f64,
    pub slide_ops: f64,
    pub place_ops: f64,
    /// Ascending by tile, only tiles some episode ended on.
    pub tiles: Vec<TileRate>,
}

/// ```text
/// 1000    avg = 273901, max = 382324, ops = 241563 (170543|896715)
///         512     100.0%  (0.3%)
///         1024    99.7%   (0.2%)
/// ```
impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\tavg = {:.0}, max = {}, ops = {:.0} ({:.0}|{:.0})",
            self.index, self.mean_score, self.max_score, self.ops, self.slide_ops, self.place_ops
        )?;
        for t in &self.tiles {
            write!(f, "\n\t{}\t{:.1}%\t({:.1}%)", t.tile, t.reach * 100.0, t.ending * 100.0)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LearningSummary {
    /// One-based index of the first episode in the window.
    pub first: usize,
    pub last: usize,
    pub mean_steps: f64,
    /// Share of episodes that did not meet the win condition.
    pub avoidance: f64,
    pub mean_danger: f64,
}

impl fmt::Display for LearningSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "episodes {}-{}: mean steps = {:.0}, win avoided = {:.1}%, mean danger = {:.3}",
            self.first,
            self.last,
            self.mean_steps,
            self.avoidance * 100.0,
            self.mean_danger
        )
    }
}

/// Rolling window of episode records.
///
/// `total` episodes are run, a summary is logged every `block`, and at most
/// `limit` records are retained. Zero for `block` or `limit` means `total`.
#[derive(Debug, Clone)]
pub struct Statistics {
    total: usize,
    block: usize,
    limit: usize,
    count: usize,
    data: VecDeque<EpisodeRecord>,
}

impl Statistics {
    pub fn new(total: usize, block: usize, limit: usize) -> Self {
        let or_total = |n: usize| if n == 0 { total.max(1) } else { n };
        Self { total, block: or_total(block), limit: or_total(limit), count: 0, data: VecDeque::new() }
    }

    pub fn total(&self) -> usize { self.total }

    /// Episodes opened so far.
    pub fn count(&self) -> usize { self.count }

    pub fn is_finished(&self) -> bool { self.count >= self.total }

    pub fn records(&self) -> impl DoubleEndedIterator<Item = &EpisodeRecord> + ExactSizeIterator { self.data.iter() }

    pub fn open_episode(&mut self) {
        self.count += 1;
        while self.data.len() >= self.limit {
            self.data.pop_front();
        }
    }

    pub fn close_episode(&mut self, record: EpisodeRecord) {
        self.data.push_back(record);
        if self.count % 100 == 0 {
            if let Some(recent) = self.summary(100) {
                debug!(
                    "progress {}/{} ({:.1}%) avg = {:.0} max = {}",
                    self.count,
                    self.total,
                    self.count as f64 * 100.0 / self.total.max(1) as f64,
                    recent.mean_score,
                    recent.max_score
                );
            }
        }
        if self.count % self.block == 0 {
            if let Some(summary) = self.summary(self.block) {
                info!("{summary}");
            }
            if let Some(learning) = self.learning(self.block) {
                info!("{learning}");
            }
        }
    }

    fn window(&self, n: usize) -> impl Iterator<Item = &EpisodeRecord> {
        let n = n.min(self.data.len());
        self.data.iter().skip(self.data.len() - n)
    }

    /// Score and tile report over the last `n` episodes.
    pub fn summary(&self, n: usize) -> Option<Summary> {
        let num = n.min(self.data.len());
        if num == 0 {
            return None;
        }
        let mut endings = [0usize; 16];
        let (mut sum, mut max) = (0u64, 0u64);
        let (mut slides, mut places) = (0u64, 0u64);
        let (mut slide_time, mut place_time) = (Duration::ZERO, Duration::ZERO);
        for ep in self.window(n) {
            sum += ep.score;
            max = max.max(ep.score);
            endings[usize::from(ep.max_exponent.min(15))] += 1;
            slides += u64::from(ep.slides);
            places += u64::from(ep.places);
            slide_time += ep.slide_time;
            place_time += ep.place_time;
        }

        let mut tiles = Vec::new();
        let mut reached = num;
        for (e, &ended) in endings.iter().enumerate() {
            if ended > 0 {
                tiles.push(TileRate {
                    tile: if e == 0 { 0 } else { 1 << e },
                    reach: reached as f64 / num as f64,
                    ending: ended as f64 / num as f64,
                });
            }
            reached -= ended;
        }

        Some(Summary {
            index: self.count,
            episodes: num,
            mean_score: sum as f64 / num as f64,
            max_score: max,
            ops: per_second(slides + places, slide_time + place_time),
            slide_ops: per_second(slides, slide_time),
            place_ops: per_second(places, place_time),
            tiles,
        })
    }

    /// Win-avoidance report over the last `n` episodes.
    pub fn learning(&self, n: usize) -> Option<LearningSummary> {
        let num = n.min(self.data.len());
        if num == 0 {
            return None;
        }
        let (mut steps, mut avoided, mut danger) = (0u64, 0usize, 0f64);
        for ep in self.window(n) {
            steps += u64::from(ep.slides);
            if ep.outcome != Some(Outcome::Win) {
                avoided += 1;
            }
            danger += f64::from(ep.mean_danger.unwrap_or(0.0));
        }
        Some(LearningSummary {
            first: self.count + 1 - num,
            last: self.count,
            mean_steps: steps as f64 / num as f64,
            avoidance: avoided as f64 / num as f64,
            mean_danger: danger / num as f64,
        })
    }

    /// Forget every record and restart the episode count.
    pub fn reset(&mut self) {
        self.count = 0;
        self.data.clear();
    }
}

/// Accumulates drained TD totals and reports the mean every `every` updates.
#[derive(Debug, Clone)]
pub struct TdMonitor {
    every: u64,
    pending: TdStats,
}

impl Default for TdMonitor {
    fn default() -> Self { Self::new(100) }
}

impl TdMonitor {
    pub fn new(every: u64) -> Self { Self { every: every.max(1), pending: TdStats::default() } }

    /// Fold in `stats`; returns the mean |error| when a report was logged.
    pub fn absorb(&mut self, stats: TdStats) -> Option<f64> {
        self.pending.merge(stats);
        if self.pending.updates < self.every {
            return None;
        }
        let mean = self.pending.mean_abs_error();
        if let Some(mean) = mean {
            debug!("TD: mean |error| = {mean:.2} over {} updates", self.pending.updates);
        }
        self.pending = TdStats::default();
        mean
    }
}
