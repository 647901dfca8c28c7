//! Compare sequential vs parallel Monte Carlo sweeps over generated candidates.
//!
//! Run with: `cargo bench --bench monte_carlo_parallel`
//! Or quick comparison: `cargo run --bin benchmark_parallel_speedup` (see src/bin)

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pitwall::optimizer::monte_carlo::{run_monte_carlo, run_monte_carlo_parallel};
use pitwall::optimizer::strategy_generator::StrategyGenerator;
use pitwall::race::model::StrategyInput;

fn bench_monte_carlo_sequential_vs_parallel(c: &mut Criterion) {
    let input = StrategyInput::default();
    let seed = 42u64;
    let samples = 200;
    let candidates =
        StrategyGenerator::new().generate_candidates(input.race.laps, &input.race.compounds, seed);

    let mut group = c.benchmark_group("monte_carlo");
    group.sample_size(20);
    group.measurement_time(std::time::Duration::from_secs(10));

    group.bench_function("sequential", |b| {
        b.iter(|| black_box(run_monte_carlo(&input, &candidates, samples, seed)));
    });

    group.bench_function("parallel", |b| {
        b.iter(|| black_box(run_monte_carlo_parallel(&input, &candidates, samples, seed)));
    });

    group.finish();
}

criterion_group!(benches, bench_monte_carlo_sequential_vs_parallel);
criterion_main!(benches);
