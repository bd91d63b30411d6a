use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use duosweep_core::*;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::hint::black_box;

fn tiers() -> [(&'static str, BoardConfig); 4] {
    [
        ("easy", BoardConfig::easy()),
        ("medium", BoardConfig::medium()),
        ("hard", BoardConfig::hard()),
        ("sparse-50x50", BoardConfig::new_unchecked(50, 50, 10)),
    ]
}

fn bench_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate");
    for (name, config) in tiers() {
        group.bench_with_input(BenchmarkId::from_parameter(name), &config, |b, &config| {
            let mut seed = 0;
            b.iter(|| {
                seed += 1;
                black_box(Board::generate(config, RandomMineGenerator::new(seed)))
            });
        });
    }
    group.finish();
}

fn bench_first_reveal(c: &mut Criterion) {
    let mut group = c.benchmark_group("first_reveal");
    for (name, config) in tiers() {
        let center = (config.rows / 2, config.cols / 2);
        let board = Board::generate(config, RandomMineGenerator::new(42));
        group.bench_with_input(BenchmarkId::from_parameter(name), &board, |b, board| {
            let mut rng = SmallRng::seed_from_u64(42);
            b.iter(|| {
                let mut board = board.clone();
                board
                    .ensure_first_move_safe(center, &mut rng)
                    .expect("presets leave room for the safe zone");
                black_box(board.reveal(center))
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_generate, bench_first_reveal);
criterion_main!(benches);
