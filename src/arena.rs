//! The episode loop: a slider and a placer take turns on one board until the
//! slider is stuck or meets its win condition.

use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::agent::Agent;
use crate::engine::Board;
use crate::rules::Outcome;
use crate::stats::{EpisodeRecord, Statistics};

/// Tiles the placer drops before the first slide.
pub const OPENING_TILES: u32 = 2;

/// Play one episode from an empty board.
///
/// ```
/// use td_2048::agent::Agent;
/// use td_2048::arena::play_episode;
/// use td_2048::stats::Statistics;
///
/// let mut slider = Agent::slider("seed=1").unwrap();
/// let mut placer = Agent::placer("seed=2").unwrap();
/// let mut stats = Statistics::new(1, 0, 0);
/// let record = play_episode(&mut slider, &mut placer, &mut stats);
/// assert!(record.slides > 0);
/// assert!(stats.is_finished());
/// ```
pub fn play_episode(slider: &mut Agent, placer: &mut Agent, stats: &mut Statistics) -> EpisodeRecord {
    play_from(Board::EMPTY, slider, placer, stats)
}

/// Play one episode from `start`, topping it up to the opening tile count
/// first.
pub fn play_from(start: Board, slider: &mut Agent, placer: &mut Agent, stats: &mut Statistics) -> EpisodeRecord {
    stats.open_episode();
    slider.open_episode("");
    placer.open_episode("");

    let mut board = start;
    let mut score = 0u64;
    let (mut slides, mut places) = (0u32, 0u32);
    let (mut slide_time, mut place_time) = (Duration::ZERO, Duration::ZERO);

    while 16 - board.count_empty() < OPENING_TILES {
        let t = Instant::now();
        let Some(action) = placer.take_action(&board) else { break };
        if action.apply(&mut board).is_none() {
            warn!("{}: illegal opening action {}", placer.name(), action);
            break;
        }
        place_time += t.elapsed();
        places += 1;
    }

    let outcome = loop {
        let t = Instant::now();
        let Some(action) = slider.take_action(&board) else { break Outcome::Lose };
        let Some(reward) = action.apply(&mut board) else {
            warn!("{}: illegal action {} ends the episode", slider.name(), action);
            break Outcome::Lose;
        };
        slide_time += t.elapsed();
        slides += 1;
        score += u64::from(reward);
        if slider.check_for_win(&board) {
            break Outcome::Win;
        }

        let t = Instant::now();
        let Some(action) = placer.take_action(&board) else { break Outcome::Lose };
        if action.apply(&mut board).is_none() {
            warn!("{}: illegal action {} ends the episode", placer.name(), action);
            break Outcome::Lose;
        }
        place_time += t.elapsed();
        places += 1;
    };

    let tag = outcome.tag();
    let mean_danger = slider.mean_danger();
    slider.close_episode(tag);
    placer.close_episode(tag);
    debug!("episode {} {} with score {} after {} slides", stats.count(), tag, score, slides);

    let record = EpisodeRecord {
        score,
        slides,
        places,
        slide_time,
        place_time,
        max_exponent: board.max_exponent(),
        outcome: Some(outcome),
        mean_danger,
        final_board: board.into_raw(),
    };
    stats.close_episode(record.clone());
    record
}
