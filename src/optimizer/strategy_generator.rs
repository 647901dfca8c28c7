use std::collections::{BTreeSet, HashSet};

use crate::race::compound::Compound;
use crate::race::model::{Stint, StrategyPlan};
use crate::race::rng::{unit_to_index, RandomStream, SplitMix64};

pub const DEFAULT_MAX_STOPS: u32 = 3;
/// Raw draws per generation pass. Duplicates are dropped, so fewer plans may come back.
pub const DEFAULT_RAW_DRAWS: usize = 40;
pub const DEFAULT_MAX_PLANS: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationStrategy {
    pub max_stops: u32,
    pub raw_draws: usize,
    pub max_plans: usize,
}

impl Default for GenerationStrategy {
    fn default() -> Self {
        Self {
            max_stops: DEFAULT_MAX_STOPS,
            raw_draws: DEFAULT_RAW_DRAWS,
            max_plans: DEFAULT_MAX_PLANS,
        }
    }
}

/// Samples plausible plan shapes rather than enumerating them; the full space of
/// lap splits times compound assignments is far too large past a couple of stops.
#[derive(Debug, Clone, Default)]
pub struct StrategyGenerator {
    strategy: GenerationStrategy,
}

impl StrategyGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_strategy(strategy: GenerationStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> &GenerationStrategy {
        &self.strategy
    }

    pub fn generate_candidates(
        &self,
        laps: u32,
        compounds: &BTreeSet<Compound>,
        seed: u64,
    ) -> Vec<StrategyPlan> {
        self.generate_with(laps, compounds, &mut SplitMix64::new(seed))
    }

    /// Distinct plans in first-drawn order. Every plan covers exactly `laps` laps with
    /// between 1 and `max_stops + 1` stints, each at least one lap long.
    pub fn generate_with<R>(
        &self,
        laps: u32,
        compounds: &BTreeSet<Compound>,
        rng: &mut R,
    ) -> Vec<StrategyPlan>
    where
        R: RandomStream + ?Sized,
    {
        assert!(laps >= 1, "precondition failed: race must have at least one lap");
        assert!(
            !compounds.is_empty(),
            "precondition failed: at least one compound must be allowed"
        );

        let palette: Vec<Compound> = compounds.iter().copied().collect();
        let mut seen: HashSet<String> = HashSet::new();
        let mut plans = Vec::new();

        for _ in 0..self.strategy.raw_draws {
            if plans.len() >= self.strategy.max_plans {
                break;
            }
            let drawn = unit_to_index(rng.next_unit(), self.strategy.max_stops as usize + 1);
            // A race of n laps fits at most n stints.
            let stops = (drawn as u32).min(laps - 1);

            let plan = StrategyPlan::new(
                partition_laps(laps, stops, rng)
                    .into_iter()
                    .map(|stint_laps| {
                        let compound = palette[unit_to_index(rng.next_unit(), palette.len())];
                        Stint::new(compound, stint_laps)
                    })
                    .collect(),
            );

            if seen.insert(plan.key()) {
                plans.push(plan);
            }
        }

        plans
    }
}

/// [StrategyGenerator] with the default draw count and plan cap.
pub fn generate(
    laps: u32,
    compounds: &BTreeSet<Compound>,
    max_stops: u32,
    seed: u64,
) -> Vec<StrategyPlan> {
    StrategyGenerator::with_strategy(GenerationStrategy {
        max_stops,
        ..GenerationStrategy::default()
    })
    .generate_candidates(laps, compounds, seed)
}

/// Split `laps` into `stops + 1` positive parts using `stops` distinct cut points in
/// `[1, laps - 1]`. Requires `stops < laps`.
fn partition_laps<R>(laps: u32, stops: u32, rng: &mut R) -> Vec<u32>
where
    R: RandomStream + ?Sized,
{
    debug_assert!(stops < laps);
    let cuts = distinct_cut_points(laps - 1, stops, rng);
    let mut parts = Vec::with_capacity(stops as usize + 1);
    let mut previous = 0;
    for cut in cuts.into_iter().chain(std::iter::once(laps)) {
        parts.push(cut - previous);
        previous = cut;
    }
    parts
}

/// Floyd's sampling: `count` distinct values from `1..=span` in exactly `count` draws.
fn distinct_cut_points<R>(span: u32, count: u32, rng: &mut R) -> BTreeSet<u32>
where
    R: RandomStream + ?Sized,
{
    let mut chosen = BTreeSet::new();
    for upper in (span - count)..span {
        let candidate = unit_to_index(rng.next_unit(), upper as usize + 1) as u32;
        if !chosen.insert(candidate + 1) {
            chosen.insert(upper + 1);
        }
    }
    chosen
}
