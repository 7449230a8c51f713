use td_2048::agent::Agent;
use td_2048::arena::play_episode;
use td_2048::engine::{self as GameEngine, Board};
use td_2048::stats::Statistics;

/// Play a single game with the learning slider and print how it ended.
/// Arguments are slider `key=value` options.
fn main() -> anyhow::Result<()> {
    env_logger::init();
    GameEngine::warm();
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut slider = Agent::learner(&args.join(" "))?;
    let mut placer = Agent::placer("")?;
    let mut stats = Statistics::new(1, 0, 0);

    let record = play_episode(&mut slider, &mut placer, &mut stats);
    let board = Board::from_raw(record.final_board);
    println!("{}", board);
    println!(
        "Outcome: {}, slides: {}, score: {}, highest tile: {}",
        record.outcome.map_or("none", |o| o.tag()),
        record.slides,
        record.score,
        board.highest_tile()
    );
    slider.save_weights()?;
    Ok(())
}
