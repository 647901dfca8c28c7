//! Run one Monte Carlo sweep sequentially and once in parallel, then print timings and speedup.
//!
//! Usage: cargo run --release --bin benchmark_parallel_speedup [samples]

use std::time::Instant;

use pitwall::optimizer::monte_carlo::{run_monte_carlo, run_monte_carlo_parallel};
use pitwall::optimizer::strategy_generator::StrategyGenerator;
use pitwall::race::model::StrategyInput;

fn main() {
    let seed = 12345u64;
    let samples = std::env::args()
        .nth(1)
        .and_then(|raw| raw.parse::<usize>().ok())
        .unwrap_or(1000)
        .max(1);

    let input = StrategyInput::default();
    let candidates =
        StrategyGenerator::new().generate_candidates(input.race.laps, &input.race.compounds, seed);

    let n = candidates.len();
    println!(
        "Monte Carlo: {} candidates x {} samples ({} laps)",
        n, samples, input.race.laps
    );
    println!();

    let t0 = Instant::now();
    let results_seq = run_monte_carlo(&input, &candidates, samples, seed);
    let elapsed_seq = t0.elapsed();
    let seq_ms = elapsed_seq.as_secs_f64() * 1000.0;
    println!(
        "Sequential:  {:.2} ms  ({:.1} races/s)",
        seq_ms,
        (n * samples) as f64 / elapsed_seq.as_secs_f64()
    );

    let t0 = Instant::now();
    let results_par = run_monte_carlo_parallel(&input, &candidates, samples, seed);
    let elapsed_par = t0.elapsed();
    let par_ms = elapsed_par.as_secs_f64() * 1000.0;
    println!(
        "Parallel:    {:.2} ms  ({:.1} races/s)",
        par_ms,
        (n * samples) as f64 / elapsed_par.as_secs_f64()
    );

    println!();
    println!("Speedup:     {:.2}x (parallel vs sequential)", seq_ms / par_ms);

    assert_eq!(results_seq.len(), results_par.len());
    for (i, (a, b)) in results_seq.iter().zip(results_par.iter()).enumerate() {
        assert_eq!(a.plan, b.plan, "result {i} plan order mismatch");
        assert_eq!(a.mean.to_bits(), b.mean.to_bits(), "result {i} mean mismatch");
        assert_eq!(a.p95.to_bits(), b.p95.to_bits(), "result {i} p95 mismatch");
    }
    println!("(Results match sequential vs parallel)");
}
