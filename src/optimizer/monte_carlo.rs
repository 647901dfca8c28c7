use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::race::model::{EvaluatedPlan, StrategyInput, StrategyPlan};
use crate::race::rng::{hash_identifier, mix_seed, sample_stream, RandomStream};
use crate::race::simulator::LapSimulator;

pub const DEFAULT_SAMPLES: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SampleSummary {
    pub mean: f64,
    pub p95: f64,
}

/// Nearest-rank 95th percentile index: `floor(0.95 * n)` clamped to the last sample.
pub fn p95_index(sample_count: usize) -> usize {
    assert!(sample_count >= 1, "precondition failed: need at least one sample");
    (sample_count * 95 / 100).min(sample_count - 1)
}

/// Mean and nearest-rank p95 of raw race times. No interpolation, so p95 is always
/// one of the inputs.
pub fn summarize_samples(mut durations: Vec<f64>) -> SampleSummary {
    assert!(!durations.is_empty(), "precondition failed: need at least one sample");
    durations.sort_by(f64::total_cmp);
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;
    let p95 = durations[p95_index(durations.len())];
    SampleSummary { mean, p95 }
}

/// Seed for a plan's sample streams. Depends on the plan itself, not on its position in
/// a candidate list, so results are identical however the sweep is scheduled.
pub fn plan_seed(run_seed: u64, plan: &StrategyPlan) -> u64 {
    mix_seed(run_seed, hash_identifier(&plan.key()))
}

/// Run `samples` races, asking `make_stream` for a fresh stream per sample index.
pub fn evaluate_with<F, R>(
    simulator: &LapSimulator,
    input: &StrategyInput,
    plan: &StrategyPlan,
    samples: usize,
    mut make_stream: F,
) -> SampleSummary
where
    F: FnMut(usize) -> R,
    R: RandomStream,
{
    assert!(samples >= 1, "precondition failed: samples must be at least 1");
    let durations = (0..samples)
        .map(|index| simulator.simulate_once(input, plan, &mut make_stream(index)))
        .collect();
    summarize_samples(durations)
}

pub fn evaluate(
    input: &StrategyInput,
    plan: &StrategyPlan,
    samples: usize,
    seed: u64,
) -> SampleSummary {
    let base = plan_seed(seed, plan);
    evaluate_with(&LapSimulator::default(), input, plan, samples, |index| {
        sample_stream(base, index)
    })
}

pub fn evaluate_plan(
    input: &StrategyInput,
    plan: &StrategyPlan,
    samples: usize,
    seed: u64,
) -> EvaluatedPlan {
    let summary = evaluate(input, plan, samples, seed);
    EvaluatedPlan {
        plan: plan.clone(),
        mean: summary.mean,
        p95: summary.p95,
    }
}

pub fn run_monte_carlo(
    input: &StrategyInput,
    candidates: &[StrategyPlan],
    samples: usize,
    seed: u64,
) -> Vec<EvaluatedPlan> {
    run_monte_carlo_with_parallelism(input, candidates, samples, seed, false)
}

/// Like [run_monte_carlo] but distributes candidates across all CPU cores via Rayon.
/// Results order matches input order.
pub fn run_monte_carlo_parallel(
    input: &StrategyInput,
    candidates: &[StrategyPlan],
    samples: usize,
    seed: u64,
) -> Vec<EvaluatedPlan> {
    run_monte_carlo_with_parallelism(input, candidates, samples, seed, true)
}

fn run_monte_carlo_with_parallelism(
    input: &StrategyInput,
    candidates: &[StrategyPlan],
    samples: usize,
    seed: u64,
    parallel: bool,
) -> Vec<EvaluatedPlan> {
    debug!(
        candidates = candidates.len(),
        samples,
        parallel,
        "running monte carlo sweep"
    );
    let run_one = |plan: &StrategyPlan| evaluate_plan(input, plan, samples, seed);

    if parallel {
        candidates.par_iter().map(run_one).collect()
    } else {
        candidates.iter().map(run_one).collect()
    }
}
