pub mod monte_carlo;
pub mod ranking;
pub mod report;
pub mod strategy_generator;

use std::time::Instant;

use tracing::info;

use crate::optimizer::monte_carlo::DEFAULT_SAMPLES;
use crate::optimizer::ranking::{rank_results, DEFAULT_TOP_K};
use crate::optimizer::strategy_generator::{GenerationStrategy, StrategyGenerator};
use crate::parallel::{run_simulation_batches, WorkerPool};
use crate::race::model::{EvaluatedPlan, StrategyInput, StrategyPlan};

/// Number of progress-reporting batches for ranking with progress (live/UI callers).
const RANK_PROGRESS_BATCH_COUNT: usize = 8;

/// One evaluation pass: which input, how many samples per plan, how many results to keep.
#[derive(Debug, Clone)]
pub struct RankingScenario<'a> {
    pub input: &'a StrategyInput,
    pub samples: usize,
    pub top_k: usize,
    pub seed: u64,
    pub generation: GenerationStrategy,
    pub pool: WorkerPool,
}

impl<'a> RankingScenario<'a> {
    pub fn new(input: &'a StrategyInput) -> Self {
        Self {
            input,
            samples: DEFAULT_SAMPLES,
            top_k: DEFAULT_TOP_K,
            seed: 0,
            generation: GenerationStrategy::default(),
            pool: WorkerPool::default(),
        }
    }

    pub fn candidates(&self) -> Vec<StrategyPlan> {
        StrategyGenerator::with_strategy(self.generation).generate_candidates(
            self.input.race.laps,
            &self.input.race.compounds,
            self.seed,
        )
    }
}

/// Generator → Monte Carlo → rank.
pub fn optimize_scenario(scenario: &RankingScenario<'_>) -> Vec<EvaluatedPlan> {
    optimize_scenario_with_progress(scenario, |_, _| {})
}

/// Like [optimize_scenario] but evaluates in batches and invokes `on_progress(done, total)`
/// after each, counting candidate plans.
pub fn optimize_scenario_with_progress<F>(
    scenario: &RankingScenario<'_>,
    mut on_progress: F,
) -> Vec<EvaluatedPlan>
where
    F: FnMut(usize, usize) + Send,
{
    let started = Instant::now();
    let candidates = scenario.candidates();
    let total = candidates.len();
    if total == 0 {
        return Vec::new();
    }
    on_progress(0, total);

    let samples = scenario.samples.max(1);
    let evaluated = run_simulation_batches(
        scenario.input,
        &candidates,
        samples,
        scenario.seed,
        &scenario.pool,
        RANK_PROGRESS_BATCH_COUNT,
        &mut on_progress,
    );

    let ranked = rank_results(evaluated, scenario.top_k.max(1));
    info!(
        candidates = total,
        samples,
        kept = ranked.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "ranked strategies"
    );
    ranked
}

pub fn optimize_input(
    input: &StrategyInput,
    samples: usize,
    top_k: usize,
    seed: u64,
) -> Vec<EvaluatedPlan> {
    optimize_scenario(&RankingScenario {
        samples,
        top_k,
        seed,
        ..RankingScenario::new(input)
    })
}
