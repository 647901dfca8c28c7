//! Batch distribution for parallel simulation.
//!
//! Splits candidate sweeps into batches for progress reporting. Each batch still
//! evaluates one candidate per parallel task.

use crate::optimizer::monte_carlo::run_monte_carlo_parallel;
use crate::parallel::pool::WorkerPool;
use crate::race::model::{EvaluatedPlan, StrategyInput, StrategyPlan};

/// Split `total` items into up to `num_batches` ranges `[start, end)`.
/// Batches are as equal in size as possible; later batches may be smaller.
///
/// # Example
/// ```
/// # use pitwall::parallel::batch_ranges;
/// let ranges = batch_ranges(100, 4);
/// assert_eq!(ranges, vec![(0, 25), (25, 50), (50, 75), (75, 100)]);
/// ```
pub fn batch_ranges(total: usize, num_batches: usize) -> Vec<(usize, usize)> {
    if total == 0 || num_batches == 0 {
        return Vec::new();
    }
    let num_batches = num_batches.min(total);
    let base = total / num_batches;
    let remainder = total % num_batches;
    let mut ranges = Vec::with_capacity(num_batches);
    let mut start = 0;
    for i in 0..num_batches {
        let size = base + usize::from(i < remainder);
        let end = start + size;
        ranges.push((start, end));
        start = end;
    }
    ranges
}

/// Evaluate `candidates` on `pool` in up to `num_batches` slices, calling
/// `on_progress(done, total)` after each slice. Results keep input order.
///
/// The pool is entered once for the whole sweep, so a sized pool is built once per call.
pub fn run_simulation_batches<F>(
    input: &StrategyInput,
    candidates: &[StrategyPlan],
    samples: usize,
    seed: u64,
    pool: &WorkerPool,
    num_batches: usize,
    mut on_progress: F,
) -> Vec<EvaluatedPlan>
where
    F: FnMut(usize, usize) + Send,
{
    let total = candidates.len();
    pool.install(move || {
        let mut evaluated = Vec::with_capacity(total);
        for (start, end) in batch_ranges(total, num_batches) {
            evaluated.extend(run_monte_carlo_parallel(
                input,
                &candidates[start..end],
                samples,
                seed,
            ));
            on_progress(end, total);
        }
        evaluated
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_ranges_even_split() {
        let r = batch_ranges(100, 4);
        assert_eq!(r, vec![(0, 25), (25, 50), (50, 75), (75, 100)]);
    }

    #[test]
    fn batch_ranges_with_remainder() {
        let r = batch_ranges(10, 3);
        assert_eq!(r, vec![(0, 4), (4, 7), (7, 10)]);
    }

    #[test]
    fn batch_ranges_more_batches_than_items() {
        let r = batch_ranges(3, 10);
        assert_eq!(r, vec![(0, 1), (1, 2), (2, 3)]);
    }

    #[test]
    fn batch_ranges_empty() {
        assert!(batch_ranges(0, 5).is_empty());
        assert!(batch_ranges(10, 0).is_empty());
    }

    #[test]
    fn pooled_sweep_matches_global_sweep() {
        let input = StrategyInput::default();
        let candidates: Vec<StrategyPlan> = vec![
            "SOFT:20,HARD:38".parse().unwrap(),
            "MEDIUM:58".parse().unwrap(),
        ];
        let pooled = run_simulation_batches(
            &input,
            &candidates,
            20,
            4,
            &WorkerPool::with_workers(2),
            2,
            |_, _| {},
        );
        let global = run_monte_carlo_parallel(&input, &candidates, 20, 4);
        assert_eq!(pooled, global);
    }

    #[test]
    fn every_batch_runs_inside_the_one_sized_pool() {
        let input = StrategyInput::default();
        let candidates: Vec<StrategyPlan> = [
            "SOFT:20,HARD:38",
            "MEDIUM:58",
            "HARD:58",
            "SOFT:29,MEDIUM:29",
            "MEDIUM:20,HARD:38",
        ]
        .iter()
        .map(|key| key.parse().unwrap())
        .collect();

        let mut seen = Vec::new();
        let evaluated = run_simulation_batches(
            &input,
            &candidates,
            5,
            9,
            &WorkerPool::with_workers(3),
            4,
            |done, total| seen.push((done, total, rayon::current_num_threads())),
        );

        assert_eq!(evaluated.len(), candidates.len());
        let done: Vec<usize> = seen.iter().map(|(done, _, _)| *done).collect();
        assert_eq!(done, vec![2, 3, 4, 5]);
        assert!(seen.iter().all(|(_, total, threads)| *total == 5 && *threads == 3));
    }
}
