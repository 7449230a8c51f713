use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;

use td_2048::agent::Agent;
use td_2048::arena::play_episode;
use td_2048::engine as GameEngine;
use td_2048::serialization::write_records_to_path;
use td_2048::stats::{Statistics, TdMonitor};

#[derive(Debug, Parser)]
#[command(name = "train", about = "Train the TD(lambda) slider against the random placer")]
struct Args {
    /// Episodes to play
    #[arg(short = 'n', long, default_value_t = 1000)]
    total: usize,

    /// Episodes per logged summary (0 = total)
    #[arg(long, default_value_t = 1000)]
    block: usize,

    /// Episode records to keep in memory (0 = total)
    #[arg(long, default_value_t = 0)]
    limit: usize,

    /// Slider options, e.g. "init=65536,65536,65536,65536 alpha=0.0025 save=weights.bin".
    /// Pass role=slider for the random baseline.
    #[arg(long, default_value = "", allow_hyphen_values = true)]
    slide: String,

    /// Placer options, e.g. "seed=7"
    #[arg(long, default_value = "")]
    place: String,

    /// Write the kept episode records here (postcard)
    #[arg(long)]
    records: Option<PathBuf>,

    /// Hide the progress bar
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    GameEngine::warm();

    let mut slider = Agent::learner(&args.slide).context("failed to build the slider")?;
    let mut placer = Agent::placer(&args.place).context("failed to build the placer")?;
    info!("{} ({}) vs {} ({}), {} episodes", slider.name(), slider.role(), placer.name(), placer.role(), args.total);

    let mut stats = Statistics::new(args.total, args.block, args.limit);
    let mut monitor = TdMonitor::default();

    let pb = (!args.quiet).then(|| {
        let pb = ProgressBar::new(args.total as u64);
        pb.set_style(
            ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {elapsed_precise} eta {eta} | {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        pb
    });

    while !stats.is_finished() {
        let record = play_episode(&mut slider, &mut placer, &mut stats);
        monitor.absorb(slider.take_td_stats());
        if let Some(pb) = &pb {
            pb.inc(1);
            pb.set_message(format!(
                "score: {} | max tile: {} | {}",
                record.score,
                1u32 << record.max_exponent,
                record.outcome.map_or("-", |o| o.tag())
            ));
        }
    }
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    if let Some(summary) = stats.summary(stats.total()) {
        info!("overall\n{summary}");
    }
    if let Some(learning) = stats.learning(stats.total()) {
        info!("{learning}");
    }
    slider.save_weights().context("failed to save weights")?;
    if let Some(path) = &args.records {
        let records: Vec<_> = stats.records().cloned().collect();
        write_records_to_path(path, &records)
            .with_context(|| format!("failed to write records to {}", path.display()))?;
        info!("wrote {} episode records to {}", records.len(), path.display());
    }
    Ok(())
}
