use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::hint::black_box;
use td_2048::agent::learner::{LearnerParams, TdLearner};
use td_2048::agent::policy::{self, Shaping};
use td_2048::engine::{self as GameEngine, Board, Move};
use td_2048::ntuple::{Network, WeightTable};
use td_2048::rules::TileCount;

fn corpus() -> Vec<Board> {
    let mut rng = StdRng::seed_from_u64(1337);
    let mut boards = Vec::new();
    let mut b = Board::EMPTY.with_random_tile(&mut rng).with_random_tile(&mut rng);
    while boards.len() < 64 {
        let mut next = b;
        if next.slide(Move::ALL[rng.gen_range(0..4)]).is_some() {
            b = next.with_random_tile(&mut rng);
            boards.push(b);
        } else if b.is_stuck() {
            b = Board::EMPTY.with_random_tile(&mut rng).with_random_tile(&mut rng);
        }
    }
    boards
}

fn trained_network() -> Network {
    let mut rng = StdRng::seed_from_u64(42);
    let mut net = Network::quadrants();
    let sizes = net.expected_sizes();
    let tables = sizes
        .iter()
        .map(|&len| WeightTable::from_vec((0..len).map(|_| rng.gen_range(-1.0..1.0)).collect()))
        .collect();
    net.set_tables(tables).expect("sizes come from the network itself");
    net
}

fn bench_evaluate(c: &mut Criterion) {
    GameEngine::warm();
    let boards = corpus();
    let net = trained_network();
    c.bench_function("network/evaluate", |bch| {
        bch.iter(|| boards.iter().map(|&b| net.evaluate(b)).sum::<f32>())
    });
}

fn bench_select(c: &mut Criterion) {
    GameEngine::warm();
    let boards = corpus();
    let net = trained_network();
    let rule = TileCount::default();
    let shaping = Shaping::default();
    c.bench_function("policy/select", |bch| {
        bch.iter(|| {
            let mut acc = 0u32;
            for &b in &boards {
                if let Some(best) = policy::select(b, &net, &rule, &shaping) {
                    acc = acc.wrapping_add(best.reward ^ u32::from(best.dir.opcode()));
                }
            }
            black_box(acc)
        })
    });
}

fn bench_td_apply(c: &mut Criterion) {
    GameEngine::warm();
    let boards = corpus();
    let params = LearnerParams { alpha: 0.01, ..LearnerParams::default() };
    c.bench_function("learner/apply", |bch| {
        bch.iter_batched(
            || {
                let net = trained_network();
                let mut learner = TdLearner::new(params.clone());
                learner.open_episode(&net);
                (net, learner)
            },
            |(mut net, mut learner)| {
                for (i, &b) in boards.iter().enumerate() {
                    learner.apply(&mut net, b, if i % 2 == 0 { 1.0 } else { -1.0 });
                }
                black_box(net.evaluate(boards[0]))
            },
            BatchSize::LargeInput,
        )
    });
}

criterion_group!(benches, bench_evaluate, bench_select, bench_td_apply);
criterion_main!(benches);
