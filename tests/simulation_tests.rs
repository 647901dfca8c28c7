use std::collections::BTreeSet;

use pitwall::optimizer::monte_carlo::{evaluate, evaluate_plan, plan_seed, run_monte_carlo, run_monte_carlo_parallel};
use pitwall::optimizer::ranking::rank;
use pitwall::optimizer::strategy_generator::generate;
use pitwall::race::rng::sample_stream;
use pitwall::race::{
    simulate_once, simulate_traced, Compound, LapSimulator, ScriptedStream, SplitMix64, Stint,
    StrategyInput, StrategyPlan,
};

fn approx_eq(a: f64, b: f64, tol: f64) {
    assert!((a - b).abs() <= tol, "expected {b}, got {a}");
}

fn all_compounds() -> BTreeSet<Compound> {
    Compound::ALL.into_iter().collect()
}

/// 58 laps, every compound, no safety car.
fn green_flag_input() -> StrategyInput {
    let mut input = StrategyInput::default();
    input.race.laps = 58;
    input.race.compounds = all_compounds();
    input.track.sc_probability_per_10_min = 0.0;
    input.track.degradation_factor = 1.0;
    input.car.base_lap_time_ms = 82_000.0;
    input.car.pit_stop_loss_ms = 21_000.0;
    input.car.fuel_per_lap_kg = 1.6;
    input.car.fuel_weight_penalty_ms_per_kg = 1.6;
    input
}

#[test]
fn generated_plans_cover_every_lap_with_positive_stints() {
    for seed in 0..25 {
        for plan in generate(58, &all_compounds(), 3, seed) {
            assert_eq!(plan.total_laps(), 58, "plan {plan} has wrong lap total");
            assert!(plan.stints.iter().all(|stint| stint.laps >= 1));
            assert!((1..=4).contains(&plan.stints.len()));
        }
    }
}

#[test]
fn generated_plans_only_use_allowed_compounds() {
    let allowed: BTreeSet<Compound> = [Compound::Medium, Compound::Hard].into_iter().collect();
    for plan in generate(40, &allowed, 2, 3) {
        assert!(plan.stints.iter().all(|stint| allowed.contains(&stint.compound)));
    }
}

#[test]
fn simulated_pit_stops_match_stint_boundaries() {
    let input = StrategyInput::default();
    for plan in generate(input.race.laps, &input.race.compounds, 3, 17) {
        let trace = simulate_traced(&input, &plan, &mut SplitMix64::new(5));
        assert_eq!(trace.pit_stops.len(), plan.stints.len() - 1);
        assert_eq!(trace.laps.len(), input.race.laps as usize);
        let stop_laps: Vec<u32> = trace.pit_stops.iter().map(|stop| stop.after_lap).collect();
        assert_eq!(stop_laps, plan.pit_laps());
    }
}

#[test]
fn same_stream_gives_identical_duration() {
    let input = StrategyInput::default();
    let plan: StrategyPlan = "SOFT:20,HARD:38".parse().expect("valid plan key");

    let first = simulate_once(&input, &plan, &mut SplitMix64::new(99));
    let second = simulate_once(&input, &plan, &mut SplitMix64::new(99));
    assert_eq!(first.to_bits(), second.to_bits());

    let traced = simulate_traced(&input, &plan, &mut SplitMix64::new(99));
    assert_eq!(traced.total_ms.to_bits(), first.to_bits());
}

#[test]
fn single_sample_mean_and_p95_equal_the_one_race() {
    let input = StrategyInput::default();
    let plan: StrategyPlan = "MEDIUM:29,HARD:29".parse().expect("valid plan key");
    let seed = 1234;

    let summary = evaluate(&input, &plan, 1, seed);
    let expected = simulate_once(&input, &plan, &mut sample_stream(plan_seed(seed, &plan), 0));
    assert_eq!(summary.mean, expected);
    assert_eq!(summary.p95, expected);
}

#[test]
fn p95_is_one_of_the_sampled_durations() {
    let input = StrategyInput::default();
    let plan: StrategyPlan = "SOFT:15,MEDIUM:20,HARD:23".parse().expect("valid plan key");
    let seed = 77;
    let samples = 64;

    let summary = evaluate(&input, &plan, samples, seed);
    let base = plan_seed(seed, &plan);
    let simulator = LapSimulator::default();
    let durations: Vec<f64> = (0..samples)
        .map(|index| simulator.simulate_once(&input, &plan, &mut sample_stream(base, index)))
        .collect();

    assert!(durations.iter().any(|value| value.to_bits() == summary.p95.to_bits()));
    approx_eq(summary.mean, durations.iter().sum::<f64>() / samples as f64, 1e-6);
}

#[test]
fn rank_is_bounded_and_sorted() {
    let input = StrategyInput::default();
    let candidates = generate(input.race.laps, &input.race.compounds, 3, 8);
    assert!(!candidates.is_empty());

    let ranked = rank(&input, &candidates, 40, 5, 8);
    assert!(ranked.len() <= 5);
    assert!(ranked.len() <= candidates.len());
    assert!(ranked.windows(2).all(|pair| pair[0].mean <= pair[1].mean));

    let few = &candidates[..2];
    assert_eq!(rank(&input, few, 20, 10, 8).len(), 2);
    assert!(rank(&input, &[], 20, 5, 8).is_empty());
}

#[test]
fn parallel_sweep_matches_sequential_sweep() {
    let input = StrategyInput::default();
    let candidates = generate(input.race.laps, &input.race.compounds, 3, 21);
    let sequential = run_monte_carlo(&input, &candidates, 30, 21);
    let parallel = run_monte_carlo_parallel(&input, &candidates, 30, 21);
    assert_eq!(sequential, parallel);
}

#[test]
fn plan_results_do_not_depend_on_candidate_order() {
    let input = StrategyInput::default();
    let mut candidates = generate(input.race.laps, &input.race.compounds, 3, 4);
    let forward = run_monte_carlo(&input, &candidates, 25, 4);
    candidates.reverse();
    let mut backward = run_monte_carlo(&input, &candidates, 25, 4);
    backward.reverse();
    assert_eq!(forward, backward);
}

#[test]
fn single_hard_stint_never_enters_caution_without_safety_car_risk() {
    let input = green_flag_input();
    let plan = StrategyPlan::single(Compound::Hard, 58);

    for seed in 0..20 {
        let trace = simulate_traced(&input, &plan, &mut SplitMix64::new(seed));
        assert_eq!(trace.caution_laps(), 0);
        assert!(trace.pit_stops.is_empty());
    }
}

#[test]
fn one_stop_adds_exactly_the_undiscounted_pit_loss() {
    let input = green_flag_input();
    let plan = StrategyPlan::new(vec![
        Stint::new(Compound::Soft, 29),
        Stint::new(Compound::Hard, 29),
    ]);

    // 0.5 zeroes the jitter; with no safety-car risk the transition draw never fires.
    let trace = simulate_traced(&input, &plan, &mut ScriptedStream::constant(0.5));
    assert_eq!(trace.pit_stops.len(), 1);
    assert_eq!(trace.pit_stops[0].loss_ms, 21_000.0);
    assert!(!trace.pit_stops[0].under_caution);

    let lap_sum: f64 = trace.laps.iter().map(|lap| lap.lap_time_ms).sum();
    approx_eq(trace.total_ms - lap_sum, 21_000.0, 1e-6);
}

#[test]
fn evaluated_plan_round_trips_its_plan() {
    let input = StrategyInput::default();
    let plan: StrategyPlan = "HARD:30,MEDIUM:28".parse().expect("valid plan key");
    let evaluated = evaluate_plan(&input, &plan, 10, 3);
    assert_eq!(evaluated.plan, plan);
    assert!(evaluated.mean > 0.0);
}

#[test]
#[should_panic(expected = "precondition failed")]
fn zero_samples_is_a_contract_violation() {
    let input = StrategyInput::default();
    let plan = StrategyPlan::single(Compound::Hard, input.race.laps);
    let _ = evaluate(&input, &plan, 0, 1);
}

#[test]
#[should_panic(expected = "precondition failed")]
fn plan_with_wrong_lap_total_is_a_contract_violation() {
    let input = StrategyInput::default();
    let plan = StrategyPlan::single(Compound::Hard, input.race.laps - 1);
    let _ = simulate_once(&input, &plan, &mut SplitMix64::new(1));
}
