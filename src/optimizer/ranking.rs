use crate::optimizer::monte_carlo::run_monte_carlo_parallel;
use crate::race::model::{EvaluatedPlan, StrategyInput, StrategyPlan};

pub const DEFAULT_TOP_K: usize = 5;

/// Sort ascending by mean race time and keep the first `top_k`.
///
/// Equal means keep their incoming order (stable sort), which for the optimizer
/// pipeline is candidate generation order.
pub fn rank_results(mut evaluated: Vec<EvaluatedPlan>, top_k: usize) -> Vec<EvaluatedPlan> {
    evaluated.sort_by(|left, right| left.mean.total_cmp(&right.mean));
    evaluated.truncate(top_k);
    evaluated
}

/// Evaluate every candidate in parallel, then rank. An empty candidate list ranks to an
/// empty result.
pub fn rank(
    input: &StrategyInput,
    candidates: &[StrategyPlan],
    samples: usize,
    top_k: usize,
    seed: u64,
) -> Vec<EvaluatedPlan> {
    if candidates.is_empty() || top_k == 0 {
        return Vec::new();
    }
    rank_results(run_monte_carlo_parallel(input, candidates, samples, seed), top_k)
}
